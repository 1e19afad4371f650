//! Core data models used throughout repochat.
//!
//! These types represent the sessions, per-file summaries, and chat
//! transcripts that flow through the ingestion and query pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One ingestion run over one selected directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySession {
    pub id: String,
    pub chat_id: String,
    /// Display label of the selected directory.
    pub root: String,
    pub created_at: DateTime<Utc>,
}

/// Whether a stored summary came from a successful completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Ok,
    /// The summary text is the display text of a completion failure.
    Failed,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Ok => "ok",
            SummaryStatus::Failed => "failed",
        }
    }

    /// Anything but `"ok"` reads as [`SummaryStatus::Failed`], so an
    /// unrecognized row never reaches a query context.
    pub fn parse(s: &str) -> Self {
        match s {
            "ok" => SummaryStatus::Ok,
            _ => SummaryStatus::Failed,
        }
    }
}

/// A persisted per-file summary, keyed by `(session_id, original_path)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub session_id: String,
    pub original_path: String,
    pub summary: String,
    pub status: SummaryStatus,
    pub updated_at: DateTime<Utc>,
}

impl FileArtifact {
    pub fn new(session_id: &str, original_path: &str, summary: String, status: SummaryStatus) -> Self {
        Self {
            session_id: session_id.to_string(),
            original_path: original_path.to_string(),
            summary,
            status,
            updated_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SummaryStatus::Failed
    }
}

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    #[serde(rename = "AI")]
    Ai,
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sender::User => "User",
            Sender::Ai => "AI",
            Sender::System => "System",
        };
        f.write_str(label)
    }
}

/// A single chat message. Position in the transcript is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::System,
            text: text.into(),
        }
    }
}

/// A stored transcript, keyed by chat id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTranscript {
    pub chat_id: String,
    pub messages: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

/// Ephemeral per-file progress, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionProgress {
    /// 1-based index of the file being processed.
    pub current: usize,
    pub total: usize,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_serializes_with_original_labels() {
        let json = serde_json::to_string(&Message::ai("hi")).unwrap();
        assert_eq!(json, r#"{"sender":"AI","text":"hi"}"#);
        let back: Message = serde_json::from_str(r#"{"sender":"System","text":"x"}"#).unwrap();
        assert_eq!(back.sender, Sender::System);
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let parsed: Result<Message, _> = serde_json::from_str(r#"{"sender":"Bot","text":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn summary_status_round_trips_through_str() {
        assert_eq!(SummaryStatus::parse(SummaryStatus::Failed.as_str()), SummaryStatus::Failed);
        assert_eq!(SummaryStatus::parse("ok"), SummaryStatus::Ok);
    }

    #[test]
    fn unknown_summary_status_reads_as_failed() {
        assert_eq!(SummaryStatus::parse(""), SummaryStatus::Failed);
        assert_eq!(SummaryStatus::parse("OK "), SummaryStatus::Failed);
        assert_eq!(SummaryStatus::parse("pending"), SummaryStatus::Failed);
    }
}
