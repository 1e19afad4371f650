//! Session overview.
//!
//! Lists every stored session with its summary counts so users can pick a
//! session id for `ask`, `summaries`, or `transcript`. Used by
//! `repochat stats`.

use anyhow::Result;

use crate::config::Config;
use crate::store;

/// Run the stats command: list sessions newest first.
///
/// With `ephemeral` the in-memory store is listed and the database file is
/// never touched.
pub async fn run_stats(config: &Config, ephemeral: bool) -> Result<()> {
    let store = store::open(config, ephemeral).await;
    let sessions = store.list_sessions().await;

    println!("repochat: Database Stats");
    println!("=========================");
    println!();
    if ephemeral {
        println!("  Database:    (in memory)");
    } else {
        let db_size = std::fs::metadata(&config.db.path)
            .map(|m| m.len())
            .unwrap_or(0);
        println!("  Database:    {}", config.db.path.display());
        println!("  Size:        {}", format_bytes(db_size));
    }
    println!("  Sessions:    {}", sessions.len());

    if sessions.is_empty() {
        println!();
        store.close().await;
        return Ok(());
    }

    println!();
    println!(
        "  {:<42} {:<20} {:>9} {:>7}   {}",
        "SESSION", "ROOT", "SUMMARIES", "FAILED", "CREATED"
    );
    println!("  {}", "-".repeat(96));

    for (i, s) in sessions.iter().enumerate() {
        let summaries = store.get_all_summaries(&s.id).await;
        let failed = summaries.iter().filter(|a| a.is_failed()).count();
        let active = if i == 0 { " *" } else { "" };
        println!(
            "  {:<42} {:<20} {:>9} {:>7}   {}{}",
            s.id,
            truncate_label(&s.root, 20),
            summaries.len(),
            failed,
            format_ts_relative(s.created_at.timestamp()),
            active
        );
    }

    println!();
    println!("  * active session (most recent)");
    println!();

    store.close().await;
    Ok(())
}

fn truncate_label(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        label.to_string()
    } else {
        let kept: String = label.chars().take(width - 1).collect();
        format!("{}…", kept)
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
