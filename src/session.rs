//! Session and transcript bookkeeping.
//!
//! A [`SessionManager`] exists per selected repository. It mints the
//! session and chat identifiers, owns the in-memory transcript, and writes
//! the transcript through to the store after each completed step.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{Message, RepositorySession};
use crate::store::ArtifactStore;

/// First message of every transcript.
pub const GREETING: &str = "Hello! Select a repository to begin analysis.";

pub fn mint_session_id() -> String {
    format!("repo-{}", Uuid::new_v4())
}

pub fn mint_chat_id() -> String {
    format!("chat-{}", Uuid::new_v4())
}

pub struct SessionManager {
    session: RepositorySession,
    transcript: Vec<Message>,
    listener: Option<UnboundedSender<Message>>,
    /// Set after a failed checkpoint has been reported in the transcript.
    save_failed: bool,
}

impl SessionManager {
    /// Start a fresh session for a newly selected repository.
    pub fn start(root: &str) -> Self {
        let session = RepositorySession {
            id: mint_session_id(),
            chat_id: mint_chat_id(),
            root: root.to_string(),
            created_at: Utc::now(),
        };
        let transcript = vec![
            Message::ai(GREETING),
            Message::system(format!(
                "Starting analysis for new repository. Chat ID: {}",
                session.chat_id
            )),
        ];
        tracing::info!("started session {} for {}", session.id, root);
        Self {
            session,
            transcript,
            listener: None,
            save_failed: false,
        }
    }

    /// Continue a stored session. A missing transcript starts from the greeting.
    pub fn resume(session: RepositorySession, transcript: Option<Vec<Message>>) -> Self {
        let transcript = transcript.unwrap_or_else(|| vec![Message::ai(GREETING)]);
        Self {
            session,
            transcript,
            listener: None,
            save_failed: false,
        }
    }

    /// Forward every message appended from now on to `listener`.
    pub fn with_listener(mut self, listener: UnboundedSender<Message>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn session(&self) -> &RepositorySession {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    pub fn chat_id(&self) -> &str {
        &self.session.chat_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.transcript
    }

    pub fn push(&mut self, message: Message) {
        if let Some(tx) = &self.listener {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(message.clone());
        }
        self.transcript.push(message);
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(Message::system(text));
    }

    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.push(Message::ai(text));
    }

    /// Record the session itself in the store.
    pub async fn register(&self, store: &ArtifactStore) -> Result<(), PersistenceError> {
        store.put_session(&self.session).await
    }

    /// Write the full transcript to the store.
    pub async fn persist(&self, store: &ArtifactStore) -> Result<(), PersistenceError> {
        store.put_transcript(&self.session.chat_id, &self.transcript).await
    }

    /// [`persist`](Self::persist), logging instead of returning the error.
    ///
    /// The first failure of a run of failures is also appended to the
    /// transcript as a System message.
    pub async fn checkpoint(&mut self, store: &ArtifactStore) {
        match self.persist(store).await {
            Ok(()) => self.save_failed = false,
            Err(e) => {
                tracing::warn!("{}", e);
                if !self.save_failed {
                    self.save_failed = true;
                    self.push_system(format!("Error saving chat: {}", e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = mint_session_id();
        let b = mint_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("repo-"));
        assert!(mint_chat_id().starts_with("chat-"));
    }

    #[test]
    fn start_seeds_greeting_and_chat_id() {
        let s = SessionManager::start("demo");
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[0], Message::ai(GREETING));
        assert_eq!(s.messages()[1].sender, Sender::System);
        assert!(s.messages()[1].text.ends_with(s.chat_id()));
        assert_eq!(s.session().root, "demo");
    }

    #[tokio::test]
    async fn push_forwards_to_listener_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut s = SessionManager::start("demo").with_listener(tx);
        s.push_system("one");
        s.push(Message::user("two"));
        assert_eq!(rx.recv().await.unwrap().text, "one");
        assert_eq!(rx.recv().await.unwrap().text, "two");
        assert_eq!(s.messages().len(), 4);
    }

    #[tokio::test]
    async fn persist_and_resume() {
        let store = ArtifactStore::in_memory();
        let mut s = SessionManager::start("demo");
        s.register(&store).await.unwrap();
        s.push_ai("done");
        s.persist(&store).await.unwrap();

        let session = store.latest_session().await.unwrap();
        let transcript = store.get_transcript(&session.chat_id).await;
        let resumed = SessionManager::resume(session, transcript);
        assert_eq!(resumed.messages(), s.messages());
        assert_eq!(resumed.session_id(), s.session_id());
    }

    #[tokio::test]
    async fn failed_checkpoint_is_reported_once() {
        let store = ArtifactStore::new(std::sync::Arc::new(crate::store::UnavailableStore));
        let mut s = SessionManager::start("demo");

        s.checkpoint(&store).await;
        s.checkpoint(&store).await;

        let errors: Vec<_> = s
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::System && m.text.starts_with("Error saving chat:"))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("store unavailable"));
    }
}
