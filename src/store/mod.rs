//! Storage for sessions, per-file summaries, and chat transcripts.
//!
//! The [`Store`] trait defines the raw backend operations, every one of
//! which can fail. [`ArtifactStore`] wraps a backend and fixes the error
//! contract the rest of the crate relies on:
//!
//! | Operation | On backend failure |
//! |-----------|--------------------|
//! | [`put_summary`](ArtifactStore::put_summary) | returns [`PersistenceError`] |
//! | [`put_transcript`](ArtifactStore::put_transcript) | returns [`PersistenceError`] |
//! | [`put_session`](ArtifactStore::put_session) | returns [`PersistenceError`] |
//! | [`get_summary`](ArtifactStore::get_summary) | logs, returns `None` |
//! | [`get_all_summaries`](ArtifactStore::get_all_summaries) | logs, returns empty |
//! | [`get_transcript`](ArtifactStore::get_transcript) | logs, returns `None` |
//! | session lookups | log, return `None` / empty |
//!
//! Summaries are keyed by `"<session_id>::<original_path>"`, so a later
//! session never sees artifacts of a superseded one even though they stay
//! on disk.

pub mod memory;
pub mod sqlite;
pub mod unavailable;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::PersistenceError;
use crate::models::{ChatTranscript, FileArtifact, Message, RepositorySession, SummaryStatus};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use unavailable::UnavailableStore;

/// Separator between session id and path in summary keys.
pub const KEY_SEPARATOR: &str = "::";

/// Synthetic primary key of a summary.
pub fn summary_key(session_id: &str, original_path: &str) -> String {
    format!("{}{}{}", session_id, KEY_SEPARATOR, original_path)
}

/// Abstract storage backend.
///
/// Implementations must be `Send + Sync`. Writing a summary or transcript
/// under an existing key replaces the previous record.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put_summary(&self, artifact: &FileArtifact) -> Result<()>;

    async fn get_summary(&self, session_id: &str, original_path: &str)
        -> Result<Option<FileArtifact>>;

    /// All summaries of one session, ordered by path.
    async fn get_all_summaries(&self, session_id: &str) -> Result<Vec<FileArtifact>>;

    async fn put_transcript(&self, chat_id: &str, messages: &[Message]) -> Result<()>;

    async fn get_transcript(&self, chat_id: &str) -> Result<Option<ChatTranscript>>;

    async fn put_session(&self, session: &RepositorySession) -> Result<()>;

    async fn get_session(&self, id: &str) -> Result<Option<RepositorySession>>;

    /// The most recently created session.
    async fn latest_session(&self) -> Result<Option<RepositorySession>>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<RepositorySession>>;

    /// Release connections. Further calls may fail.
    async fn close(&self) {}
}

/// Open the store for a CLI run.
///
/// `ephemeral` selects the in-memory backend. When the SQLite database
/// cannot be opened the run degrades to [`UnavailableStore`]: processing
/// still happens, nothing persists.
pub async fn open(config: &Config, ephemeral: bool) -> ArtifactStore {
    if ephemeral {
        return ArtifactStore::in_memory();
    }
    match SqliteStore::open(config).await {
        Ok(store) => ArtifactStore::new(Arc::new(store)),
        Err(e) => {
            tracing::warn!("{:#}; results will not be persisted", e);
            ArtifactStore::new(Arc::new(UnavailableStore))
        }
    }
}

/// Fail for commands that only read earlier sessions when `ephemeral` is
/// set: an in-memory store starts empty, so there is nothing to read.
pub fn require_persistent(command: &str, ephemeral: bool) -> Result<()> {
    if ephemeral {
        anyhow::bail!(
            "`repochat {}` reads stored sessions and cannot be combined with --ephemeral",
            command
        );
    }
    Ok(())
}

/// Store handle passed to the pipeline and router.
///
/// Construct once at startup and clone freely; clones share the backend.
#[derive(Clone)]
pub struct ArtifactStore {
    backend: Arc<dyn Store>,
}

impl ArtifactStore {
    pub fn new(backend: Arc<dyn Store>) -> Self {
        Self { backend }
    }

    /// An in-memory store, for tests and `--ephemeral` runs.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub async fn put_summary(
        &self,
        session_id: &str,
        original_path: &str,
        summary: &str,
        status: SummaryStatus,
    ) -> Result<(), PersistenceError> {
        let artifact = FileArtifact::new(session_id, original_path, summary.to_string(), status);
        self.backend
            .put_summary(&artifact)
            .await
            .map_err(|e| PersistenceError::new(format!("summary for {}", original_path), e))?;
        tracing::debug!("stored summary {}", summary_key(session_id, original_path));
        Ok(())
    }

    pub async fn get_summary(&self, session_id: &str, original_path: &str) -> Option<FileArtifact> {
        match self.backend.get_summary(session_id, original_path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    "reading summary {} failed: {:#}",
                    summary_key(session_id, original_path),
                    e
                );
                None
            }
        }
    }

    pub async fn get_all_summaries(&self, session_id: &str) -> Vec<FileArtifact> {
        match self.backend.get_all_summaries(session_id).await {
            Ok(all) => {
                tracing::debug!("loaded {} summaries for {}", all.len(), session_id);
                all
            }
            Err(e) => {
                tracing::warn!("reading summaries for {} failed: {:#}", session_id, e);
                Vec::new()
            }
        }
    }

    pub async fn put_transcript(
        &self,
        chat_id: &str,
        messages: &[Message],
    ) -> Result<(), PersistenceError> {
        self.backend
            .put_transcript(chat_id, messages)
            .await
            .map_err(|e| PersistenceError::new(format!("transcript {}", chat_id), e))
    }

    pub async fn get_transcript(&self, chat_id: &str) -> Option<Vec<Message>> {
        match self.backend.get_transcript(chat_id).await {
            Ok(t) => t.map(|t| t.messages),
            Err(e) => {
                tracing::warn!("reading transcript {} failed: {:#}", chat_id, e);
                None
            }
        }
    }

    pub async fn put_session(&self, session: &RepositorySession) -> Result<(), PersistenceError> {
        self.backend
            .put_session(session)
            .await
            .map_err(|e| PersistenceError::new(format!("session {}", session.id), e))
    }

    pub async fn get_session(&self, id: &str) -> Option<RepositorySession> {
        self.backend.get_session(id).await.unwrap_or_else(|e| {
            tracing::warn!("reading session {} failed: {:#}", id, e);
            None
        })
    }

    pub async fn latest_session(&self) -> Option<RepositorySession> {
        self.backend.latest_session().await.unwrap_or_else(|e| {
            tracing::warn!("reading latest session failed: {:#}", e);
            None
        })
    }

    pub async fn list_sessions(&self) -> Vec<RepositorySession> {
        self.backend.list_sessions().await.unwrap_or_else(|e| {
            tracing::warn!("listing sessions failed: {:#}", e);
            Vec::new()
        })
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_reads_are_rejected() {
        assert!(require_persistent("ask", false).is_ok());
        let err = require_persistent("ask", true).unwrap_err();
        assert!(err.to_string().contains("--ephemeral"));
    }

    #[test]
    fn key_joins_session_and_path() {
        assert_eq!(summary_key("repo-1", "src/a.rs"), "repo-1::src/a.rs");
    }

    #[tokio::test]
    async fn facade_reads_fail_closed_and_writes_propagate() {
        let store = ArtifactStore::new(Arc::new(UnavailableStore));

        let err = store
            .put_summary("s", "a.rs", "x", SummaryStatus::Ok)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("summary for a.rs"));
        assert!(store.put_transcript("c", &[]).await.is_err());

        assert!(store.get_summary("s", "a.rs").await.is_none());
        assert!(store.get_all_summaries("s").await.is_empty());
        assert!(store.get_transcript("c").await.is_none());
        assert!(store.latest_session().await.is_none());
        assert!(store.list_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn put_then_get_round_trips_summary_text() {
        let store = ArtifactStore::in_memory();
        store
            .put_summary("s", "p", "X", SummaryStatus::Ok)
            .await
            .unwrap();
        let got = store.get_summary("s", "p").await.unwrap();
        assert_eq!(got.summary, "X");
        assert_eq!(got.original_path, "p");
    }
}
