//! Error types shared across the ingestion and query flows.
//!
//! Completion failures have their own type in [`crate::completion`]; they
//! are turned into text before they leave that seam and never show up here.

use thiserror::Error;

/// A store write that did not land.
///
/// Writes propagate this to the caller. Reads never produce it: the
/// [`ArtifactStore`](crate::store::ArtifactStore) facade logs read
/// failures and returns an empty result instead.
#[derive(Error, Debug)]
#[error("failed to persist {what}: {source}")]
pub struct PersistenceError {
    pub what: String,
    #[source]
    pub source: anyhow::Error,
}

impl PersistenceError {
    pub fn new(what: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            what: what.into(),
            source,
        }
    }
}

/// A source file whose content could not be read.
#[derive(Error, Debug)]
#[error("could not read {path}: {source}")]
pub struct FileReadError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Misuse of the [`Assistant`](crate::assistant::Assistant) entry points.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// An ingestion run is in flight.
    #[error("a repository is still being processed")]
    Busy,

    /// No repository has been selected yet.
    #[error("Please select and process a repository first.")]
    NoActiveSession,

    /// The selection contained no files at all.
    #[error("no files selected")]
    NoFilesSelected,
}
