//! Backend used when the real store could not be opened.
//!
//! Every operation fails. Through [`ArtifactStore`](super::ArtifactStore)
//! that means writes surface as errors and reads come back empty, so an
//! ingestion run still completes but nothing persists.

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{ChatTranscript, FileArtifact, Message, RepositorySession};

use super::Store;

pub struct UnavailableStore;

#[async_trait]
impl Store for UnavailableStore {
    async fn put_summary(&self, _artifact: &FileArtifact) -> Result<()> {
        bail!("store unavailable")
    }

    async fn get_summary(&self, _session_id: &str, _path: &str) -> Result<Option<FileArtifact>> {
        bail!("store unavailable")
    }

    async fn get_all_summaries(&self, _session_id: &str) -> Result<Vec<FileArtifact>> {
        bail!("store unavailable")
    }

    async fn put_transcript(&self, _chat_id: &str, _messages: &[Message]) -> Result<()> {
        bail!("store unavailable")
    }

    async fn get_transcript(&self, _chat_id: &str) -> Result<Option<ChatTranscript>> {
        bail!("store unavailable")
    }

    async fn put_session(&self, _session: &RepositorySession) -> Result<()> {
        bail!("store unavailable")
    }

    async fn get_session(&self, _id: &str) -> Result<Option<RepositorySession>> {
        bail!("store unavailable")
    }

    async fn latest_session(&self) -> Result<Option<RepositorySession>> {
        bail!("store unavailable")
    }

    async fn list_sessions(&self) -> Result<Vec<RepositorySession>> {
        bail!("store unavailable")
    }
}
