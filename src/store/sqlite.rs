//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the `sessions`, `transcripts`, and
//! `file_summaries` tables created by [`crate::migrate`]. Timestamps are
//! stored as Unix milliseconds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{ChatTranscript, FileArtifact, Message, RepositorySession, SummaryStatus};

use super::{summary_key, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config)
            .await
            .with_context(|| format!("Failed to open database {}", config.db.path.display()))?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn artifact_from_row(row: &SqliteRow) -> FileArtifact {
    let status: String = row.get("status");
    FileArtifact {
        session_id: row.get("session_id"),
        original_path: row.get("original_path"),
        summary: row.get("summary"),
        status: SummaryStatus::parse(&status),
        updated_at: from_millis(row.get("updated_at")),
    }
}

fn session_from_row(row: &SqliteRow) -> RepositorySession {
    RepositorySession {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        root: row.get("root"),
        created_at: from_millis(row.get("created_at")),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put_summary(&self, artifact: &FileArtifact) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO file_summaries (key, session_id, original_path, summary, status, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                summary = excluded.summary,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(summary_key(&artifact.session_id, &artifact.original_path))
        .bind(&artifact.session_id)
        .bind(&artifact.original_path)
        .bind(&artifact.summary)
        .bind(artifact.status.as_str())
        .bind(artifact.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_summary(
        &self,
        session_id: &str,
        original_path: &str,
    ) -> Result<Option<FileArtifact>> {
        let row = sqlx::query(
            "SELECT session_id, original_path, summary, status, updated_at FROM file_summaries WHERE key = ?",
        )
        .bind(summary_key(session_id, original_path))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(artifact_from_row))
    }

    async fn get_all_summaries(&self, session_id: &str) -> Result<Vec<FileArtifact>> {
        let rows = sqlx::query(
            "SELECT session_id, original_path, summary, status, updated_at FROM file_summaries \
             WHERE session_id = ? ORDER BY original_path",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(artifact_from_row).collect())
    }

    async fn put_transcript(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        sqlx::query(
            r#"
            INSERT INTO transcripts (chat_id, messages_json, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                messages_json = excluded.messages_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(chat_id)
        .bind(json)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_transcript(&self, chat_id: &str) -> Result<Option<ChatTranscript>> {
        let row = sqlx::query("SELECT messages_json, updated_at FROM transcripts WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json: String = row.get("messages_json");
        let messages: Vec<Message> = serde_json::from_str(&json)
            .with_context(|| format!("corrupt transcript {}", chat_id))?;

        Ok(Some(ChatTranscript {
            chat_id: chat_id.to_string(),
            messages,
            updated_at: from_millis(row.get("updated_at")),
        }))
    }

    async fn put_session(&self, session: &RepositorySession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, chat_id, root, created_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&session.id)
        .bind(&session.chat_id)
        .bind(&session.root)
        .bind(session.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<RepositorySession>> {
        let row = sqlx::query("SELECT id, chat_id, root, created_at FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(session_from_row))
    }

    async fn latest_session(&self) -> Result<Option<RepositorySession>> {
        let row = sqlx::query(
            "SELECT id, chat_id, root, created_at FROM sessions ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(session_from_row))
    }

    async fn list_sessions(&self) -> Result<Vec<RepositorySession>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, root, created_at FROM sessions ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(session_from_row).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
