//! The repository assistant: one store, one completion service, one
//! active session at a time.
//!
//! [`Assistant`] ties the pieces together the way a front end drives them:
//! select a repository (filter, then ingest), then ask questions against
//! it. A processing flag keeps a new run or a query from starting while
//! another is in flight, and a status channel carries the one-line status
//! shown to the user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc::UnboundedSender, watch, Mutex};

use crate::completion::CompletionService;
use crate::config::{IngestConfig, QueryConfig};
use crate::error::AssistantError;
use crate::filter::FileSetFilter;
use crate::ingest::{run_ingestion, IngestReport};
use crate::models::{Message, RepositorySession};
use crate::progress::IngestProgressReporter;
use crate::query::{self, QueryResponse};
use crate::session::SessionManager;
use crate::source::SourceFile;
use crate::store::ArtifactStore;

pub const INITIAL_STATUS: &str = "Please select a repository to begin.";
pub const READY_STATUS: &str = "Ready to query!";
pub const THINKING_STATUS: &str = "AI is thinking...";

/// Clears the processing flag when dropped.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AssistantError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AssistantError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Assistant {
    store: ArtifactStore,
    service: Arc<dyn CompletionService>,
    ingest: IngestConfig,
    query: QueryConfig,
    filter: FileSetFilter,
    session: Mutex<Option<SessionManager>>,
    processing: AtomicBool,
    status: watch::Sender<String>,
    listener: Option<UnboundedSender<Message>>,
}

impl Assistant {
    pub fn new(
        store: ArtifactStore,
        service: Arc<dyn CompletionService>,
        ingest: IngestConfig,
        query: QueryConfig,
    ) -> Result<Self> {
        let filter = FileSetFilter::with_excludes(&ingest.exclude_globs)?;
        let (status, _) = watch::channel(INITIAL_STATUS.to_string());
        Ok(Self {
            store,
            service,
            ingest,
            query,
            filter,
            session: Mutex::new(None),
            processing: AtomicBool::new(false),
            status,
            listener: None,
        })
    }

    /// Forward every transcript message to `listener` as it is appended.
    pub fn with_listener(mut self, listener: UnboundedSender<Message>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status.subscribe()
    }

    pub fn status(&self) -> String {
        self.status.borrow().clone()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn manager(&self, manager: SessionManager) -> SessionManager {
        match &self.listener {
            Some(tx) => manager.with_listener(tx.clone()),
            None => manager,
        }
    }

    /// Make a stored session the active one. `None` picks the latest.
    ///
    /// Returns `None` when no such session exists.
    pub async fn resume(&self, session_id: Option<&str>) -> Option<RepositorySession> {
        let session = match session_id {
            Some(id) => self.store.get_session(id).await,
            None => self.store.latest_session().await,
        }?;
        let transcript = self.store.get_transcript(&session.chat_id).await;
        let manager = self.manager(SessionManager::resume(session.clone(), transcript));
        *self.session.lock().await = Some(manager);
        self.status.send_replace(READY_STATUS.to_string());
        Some(session)
    }

    pub async fn current_session(&self) -> Option<RepositorySession> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|m| m.session().clone())
    }

    pub async fn transcript(&self) -> Vec<Message> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|m| m.messages().to_vec())
            .unwrap_or_default()
    }

    /// Start a new session for `files` and summarize them.
    ///
    /// The previous session stays in storage but is no longer active.
    pub async fn select_repository(
        &self,
        root: &str,
        files: Vec<Box<dyn SourceFile>>,
        reporter: &dyn IngestProgressReporter,
    ) -> Result<IngestReport, AssistantError> {
        if files.is_empty() {
            self.status
                .send_replace("No files selected or selection cancelled.".to_string());
            return Err(AssistantError::NoFilesSelected);
        }

        let _guard = ProcessingGuard::acquire(&self.processing)?;

        let mut manager = self.manager(SessionManager::start(root));
        if let Err(e) = manager.register(&self.store).await {
            tracing::warn!("{}; continuing without a stored session record", e);
            manager.push_system(format!("Error saving session: {}", e));
        }

        let selected = files.len();
        let filtered = self.filter.apply(files);
        tracing::info!(
            "{} of {} files kept after filtering",
            filtered.len(),
            selected
        );

        let report = run_ingestion(
            &self.store,
            self.service.as_ref(),
            &mut manager,
            &filtered,
            &self.ingest,
            reporter,
            &self.status,
        )
        .await;

        *self.session.lock().await = Some(manager);
        Ok(report)
    }

    /// Answer a question about the active repository.
    pub async fn ask(&self, query_text: &str) -> Result<QueryResponse, AssistantError> {
        let _guard = ProcessingGuard::acquire(&self.processing)?;

        let mut slot = self.session.lock().await;
        let manager = slot.as_mut().ok_or(AssistantError::NoActiveSession)?;

        manager.push(Message::user(query_text));
        self.status.send_replace(THINKING_STATUS.to_string());

        let response = query::answer(
            &self.store,
            self.service.as_ref(),
            manager.session_id(),
            query_text,
            &self.query,
        )
        .await;

        if response == QueryResponse::NoRepositoryData {
            manager.push_system("No summaries found in storage. Please reprocess the repository.");
        }
        manager.push_ai(response.text());
        manager.checkpoint(&self.store).await;

        self.status.send_replace(READY_STATUS.to_string());
        Ok(response)
    }

    /// List the stored summaries of the active session, and record the
    /// listing in the transcript.
    pub async fn stored_summaries(&self) -> Result<String, AssistantError> {
        let mut slot = self.session.lock().await;
        let manager = slot.as_mut().ok_or(AssistantError::NoActiveSession)?;

        let all = self.store.get_all_summaries(manager.session_id()).await;
        let text = if all.is_empty() {
            "No summaries found in storage for the current repository.".to_string()
        } else {
            let listing = all
                .iter()
                .map(|a| {
                    let marker = if a.is_failed() { " (failed)" } else { "" };
                    format!("File: {}{}\nSummary: {}\n", a.original_path, marker, a.summary)
                })
                .collect::<Vec<_>>()
                .join(query::CONTEXT_DELIMITER);
            format!("Stored Summaries ({}):\n{}", all.len(), listing)
        };

        manager.push_system(text.clone());
        manager.checkpoint(&self.store).await;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::DisabledService;

    fn assistant() -> Assistant {
        Assistant::new(
            ArtifactStore::in_memory(),
            Arc::new(DisabledService),
            IngestConfig {
                inter_file_delay_ms: 0,
                ..IngestConfig::default()
            },
            QueryConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn guard_rejects_reentry_and_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _g = ProcessingGuard::acquire(&flag).unwrap();
            assert!(matches!(
                ProcessingGuard::acquire(&flag),
                Err(AssistantError::Busy)
            ));
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(ProcessingGuard::acquire(&flag).is_ok());
    }

    #[tokio::test]
    async fn ask_without_session_is_an_error() {
        let a = assistant();
        assert!(matches!(
            a.ask("anything").await,
            Err(AssistantError::NoActiveSession)
        ));
        assert_eq!(a.status(), INITIAL_STATUS);
    }

    #[tokio::test]
    async fn ask_while_processing_is_busy() {
        let a = assistant();
        a.processing.store(true, Ordering::Release);
        assert!(matches!(a.ask("q").await, Err(AssistantError::Busy)));
        let err = a
            .select_repository(
                "demo",
                vec![Box::new(crate::source::MemoryFile::new("a.js", "x"))],
                &crate::progress::NoProgress,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Busy));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let a = assistant();
        let err = a
            .select_repository("demo", Vec::new(), &crate::progress::NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::NoFilesSelected));
        assert_eq!(a.status(), "No files selected or selection cancelled.");
    }
}
