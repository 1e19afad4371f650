use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// The one storage layout this build reads and writes.
pub const LAYOUT_VERSION: i64 = 1;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables if missing and stamp the layout version.
///
/// Idempotent. Fails if the database was written by a newer layout.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    if version > LAYOUT_VERSION {
        bail!(
            "database layout version {} is newer than supported version {}",
            version,
            LAYOUT_VERSION
        );
    }

    // One row per "select repository" action
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL,
            root TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcripts (
            chat_id TEXT PRIMARY KEY,
            messages_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // key = "<session_id>::<original_path>"
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_summaries (
            key TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            original_path TEXT NOT NULL,
            summary TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ok',
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_file_summaries_session ON file_summaries(session_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at DESC)")
        .execute(pool)
        .await?;

    // PRAGMA does not accept bound parameters
    sqlx::query(&format!("PRAGMA user_version = {}", LAYOUT_VERSION))
        .execute(pool)
        .await?;

    Ok(())
}
