//! In-memory [`Store`] implementation for tests and `--ephemeral` runs.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Nothing survives the process.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{ChatTranscript, FileArtifact, Message, RepositorySession};

use super::{summary_key, Store};

/// In-memory store.
pub struct InMemoryStore {
    summaries: RwLock<HashMap<String, FileArtifact>>,
    transcripts: RwLock<HashMap<String, ChatTranscript>>,
    /// Creation order.
    sessions: RwLock<Vec<RepositorySession>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            summaries: RwLock::new(HashMap::new()),
            transcripts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put_summary(&self, artifact: &FileArtifact) -> Result<()> {
        let key = summary_key(&artifact.session_id, &artifact.original_path);
        write(&self.summaries)?.insert(key, artifact.clone());
        Ok(())
    }

    async fn get_summary(
        &self,
        session_id: &str,
        original_path: &str,
    ) -> Result<Option<FileArtifact>> {
        let key = summary_key(session_id, original_path);
        Ok(read(&self.summaries)?.get(&key).cloned())
    }

    async fn get_all_summaries(&self, session_id: &str) -> Result<Vec<FileArtifact>> {
        let mut all: Vec<FileArtifact> = read(&self.summaries)?
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.original_path.cmp(&b.original_path));
        Ok(all)
    }

    async fn put_transcript(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        write(&self.transcripts)?.insert(
            chat_id.to_string(),
            ChatTranscript {
                chat_id: chat_id.to_string(),
                messages: messages.to_vec(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_transcript(&self, chat_id: &str) -> Result<Option<ChatTranscript>> {
        Ok(read(&self.transcripts)?.get(chat_id).cloned())
    }

    async fn put_session(&self, session: &RepositorySession) -> Result<()> {
        let mut sessions = write(&self.sessions)?;
        sessions.retain(|s| s.id != session.id);
        sessions.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<RepositorySession>> {
        Ok(read(&self.sessions)?.iter().find(|s| s.id == id).cloned())
    }

    async fn latest_session(&self) -> Result<Option<RepositorySession>> {
        Ok(read(&self.sessions)?.last().cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<RepositorySession>> {
        Ok(read(&self.sessions)?.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryStatus;

    fn session(id: &str) -> RepositorySession {
        RepositorySession {
            id: id.to_string(),
            chat_id: format!("chat-{}", id),
            root: "demo".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn summaries_are_scoped_by_session() {
        let store = InMemoryStore::new();
        for (s, p) in [("s1", "a.rs"), ("s1", "b.rs"), ("s2", "a.rs")] {
            store
                .put_summary(&FileArtifact::new(s, p, format!("{s}:{p}"), SummaryStatus::Ok))
                .await
                .unwrap();
        }

        let s1 = store.get_all_summaries("s1").await.unwrap();
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].original_path, "a.rs");
        assert_eq!(s1[0].summary, "s1:a.rs");

        let s2 = store.get_summary("s2", "a.rs").await.unwrap().unwrap();
        assert_eq!(s2.summary, "s2:a.rs");
        assert!(store.get_summary("s2", "b.rs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rewriting_a_key_replaces_it() {
        let store = InMemoryStore::new();
        store
            .put_summary(&FileArtifact::new("s", "a", "old".into(), SummaryStatus::Failed))
            .await
            .unwrap();
        store
            .put_summary(&FileArtifact::new("s", "a", "new".into(), SummaryStatus::Ok))
            .await
            .unwrap();
        let all = store.get_all_summaries("s").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].summary, "new");
    }

    #[tokio::test]
    async fn latest_session_is_last_created() {
        let store = InMemoryStore::new();
        store.put_session(&session("one")).await.unwrap();
        store.put_session(&session("two")).await.unwrap();
        assert_eq!(store.latest_session().await.unwrap().unwrap().id, "two");
        let ids: Vec<String> = store
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn transcript_round_trip() {
        let store = InMemoryStore::new();
        let msgs = vec![Message::user("q"), Message::ai("a")];
        store.put_transcript("c1", &msgs).await.unwrap();
        let t = store.get_transcript("c1").await.unwrap().unwrap();
        assert_eq!(t.messages, msgs);
        assert!(store.get_transcript("c2").await.unwrap().is_none());
    }
}
