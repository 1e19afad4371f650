//! Query routing over stored summaries.
//!
//! Loads a session's summaries, renders them into one size-bounded context
//! block, picks a prompt template by query intent, and dispatches to the
//! completion service.

use crate::completion::CompletionService;
use crate::config::QueryConfig;
use crate::models::FileArtifact;
use crate::prompt::{classify_intent, query_prompt, Intent};
use crate::store::ArtifactStore;

/// Returned when a session has no usable summaries.
pub const NO_REPOSITORY_DATA: &str =
    "No repository data available. Please upload and process a repository first.";

/// Separator between rendered summaries in the context block.
pub const CONTEXT_DELIMITER: &str = "\n---\n";

/// Appended to a context block cut at the budget.
pub const CONTEXT_ELLIPSIS: &str = "...";

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    Answer { intent: Intent, text: String },
    /// The provider refused the prompt; `text` names the reason.
    Blocked { intent: Intent, text: String },
    /// Any other completion failure, as display text.
    Failed { intent: Intent, text: String },
    /// No summaries were available; the service was not called.
    NoRepositoryData,
}

impl QueryResponse {
    pub fn text(&self) -> &str {
        match self {
            QueryResponse::Answer { text, .. }
            | QueryResponse::Blocked { text, .. }
            | QueryResponse::Failed { text, .. } => text,
            QueryResponse::NoRepositoryData => NO_REPOSITORY_DATA,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, QueryResponse::Blocked { .. })
    }
}

/// Render artifacts as `File: <path>\nSummary: <text>\n` joined by
/// [`CONTEXT_DELIMITER`], cut to `max_chars` characters plus
/// [`CONTEXT_ELLIPSIS`] when over budget.
pub fn build_context(artifacts: &[FileArtifact], max_chars: usize) -> String {
    let rendered = artifacts
        .iter()
        .map(|a| format!("File: {}\nSummary: {}\n", a.original_path, a.summary))
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    match rendered.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            tracing::debug!("context block over {} chars, truncating", max_chars);
            format!("{}{}", &rendered[..cut], CONTEXT_ELLIPSIS)
        }
        None => rendered,
    }
}

/// Answer `query` from the summaries stored for `session_id`.
pub async fn answer(
    store: &ArtifactStore,
    service: &dyn CompletionService,
    session_id: &str,
    query: &str,
    settings: &QueryConfig,
) -> QueryResponse {
    let stored = store.get_all_summaries(session_id).await;
    // The file count covers every stored artifact, failed ones included
    let stored_count = stored.len();
    let artifacts: Vec<FileArtifact> = stored
        .into_iter()
        .filter(|a| settings.include_failed_summaries || !a.is_failed())
        .collect();

    if artifacts.is_empty() {
        tracing::info!("no usable summaries for {}", session_id);
        return QueryResponse::NoRepositoryData;
    }

    let context = build_context(&artifacts, settings.max_context_chars);
    let intent = classify_intent(query);
    let prompt = query_prompt(intent, &context, stored_count, query);
    tracing::debug!(
        "routing {:?} query over {} summaries ({} chars)",
        intent,
        artifacts.len(),
        prompt.chars().count()
    );

    match service.complete(&prompt).await {
        Ok(text) => QueryResponse::Answer { intent, text },
        Err(e) if e.is_blocked() => QueryResponse::Blocked {
            intent,
            text: e.to_string(),
        },
        Err(e) => {
            tracing::warn!("query failed: {}", e);
            QueryResponse::Failed {
                intent,
                text: e.to_string(),
            }
        }
    }
}
