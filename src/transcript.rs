//! Transcript retrieval and rendering.
//!
//! Used by `repochat transcript` and by the interactive commands, which
//! print each message as it is appended.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::{Message, Sender};
use crate::store;

/// One message as a terminal line block: `[AI] text`.
pub fn render_message(message: &Message) -> String {
    let tag = match message.sender {
        Sender::User => "[You]",
        Sender::Ai => "[AI]",
        Sender::System => "[System]",
    };
    format!("{} {}", tag, message.text)
}

/// CLI entry point. Loads a session's transcript and prints it to stdout.
pub async fn run_transcript(
    config: &Config,
    session_id: Option<&str>,
    ephemeral: bool,
) -> Result<()> {
    store::require_persistent("transcript", ephemeral)?;
    let store = store::open(config, ephemeral).await;

    let session = match session_id {
        Some(id) => store.get_session(id).await,
        None => store.latest_session().await,
    };
    let Some(session) = session else {
        bail!("session not found; run `repochat ingest <dir>` first");
    };

    let messages = store.get_transcript(&session.chat_id).await.unwrap_or_default();

    println!("--- Session ---");
    println!("id:         {}", session.id);
    println!("chat_id:    {}", session.chat_id);
    println!("root:       {}", session.root);
    println!(
        "created_at: {}",
        session.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!();

    println!("--- Transcript ({}) ---", messages.len());
    for message in &messages {
        println!("{}", render_message(message));
        println!();
    }

    store.close().await;
    Ok(())
}
