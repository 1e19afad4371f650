//! Ingestion pipeline orchestration.
//!
//! Summarizes an already filtered file list one file at a time:
//! read → truncate → summarize → persist → verify → progress. A failing
//! file never stops the run; every failure becomes a transcript message.
//! After the loop, all stored summaries for the session are read back and
//! counted against the number of files attempted.

use std::time::Duration;

use tokio::sync::watch;

use crate::completion::CompletionService;
use crate::config::IngestConfig;
use crate::models::{IngestionProgress, SummaryStatus};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};
use crate::prompt::summarize_file_prompt;
use crate::session::SessionManager;
use crate::source::SourceFile;
use crate::store::ArtifactStore;

/// Appended to content cut at the size limit.
pub const TRUNCATION_MARKER: &str = "\n... (file truncated due to size)";

/// Outcome counters of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub session_id: String,
    pub files_attempted: usize,
    pub summaries_written: usize,
    /// Summaries written whose text is a completion failure.
    pub summaries_failed: usize,
    pub truncated: usize,
    pub read_errors: usize,
    pub write_errors: usize,
    pub verification_misses: usize,
    /// Summaries found in storage by the final read-back.
    pub artifacts_found: usize,
}

/// Cut `content` to `max_chars` characters plus [`TRUNCATION_MARKER`].
///
/// Returns `None` when the content is within the limit and is sent as is.
pub fn truncate_content(content: &str, max_chars: usize) -> Option<String> {
    let (cut, _) = content.char_indices().nth(max_chars)?;
    let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
    out.push_str(&content[..cut]);
    out.push_str(TRUNCATION_MARKER);
    Some(out)
}

/// Summarize every file of `files` into the session's store namespace.
pub async fn run_ingestion(
    store: &ArtifactStore,
    service: &dyn CompletionService,
    session: &mut SessionManager,
    files: &[Box<dyn SourceFile>],
    settings: &IngestConfig,
    reporter: &dyn IngestProgressReporter,
    status: &watch::Sender<String>,
) -> IngestReport {
    let total = files.len();
    let mut report = IngestReport {
        session_id: session.session_id().to_string(),
        ..IngestReport::default()
    };

    if files.is_empty() {
        status.send_replace(
            "No processable files found after filtering (e.g., node_modules, .git excluded)."
                .to_string(),
        );
        session.push_system("No processable files found after filtering.");
        session.checkpoint(store).await;
        return report;
    }

    reporter.report(IngestProgressEvent::Started {
        session: session.session_id().to_string(),
        total: total as u64,
    });
    status.send_replace(format!(
        "Processing {} files (excluding common ignored directories)...",
        total
    ));

    let delay = Duration::from_millis(settings.inter_file_delay_ms);

    for (i, file) in files.iter().enumerate() {
        let progress = IngestionProgress {
            current: i + 1,
            total,
            status: format!("Processing file {}/{}: {}", i + 1, total, file.path()),
        };
        status.send_replace(progress.status.clone());
        reporter.report(IngestProgressEvent::File {
            n: progress.current as u64,
            total: total as u64,
            path: file.path().to_string(),
        });

        ingest_file(store, service, session, file.as_ref(), settings, &mut report).await;
        session.checkpoint(store).await;

        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let found = store.get_all_summaries(session.session_id()).await.len();
    report.artifacts_found = found;
    if found < report.summaries_written {
        tracing::warn!(
            "{} summaries written but only {} found in storage",
            report.summaries_written,
            found
        );
    }

    session.push_system(format!(
        "Processed {} files. Found {} summaries in storage.",
        total, found
    ));
    session.push_ai(format!(
        "All {} files processed. You can now ask questions about the codebase.",
        total
    ));
    status.send_replace(format!("Processed {} files. Ready to query!", total));
    reporter.report(IngestProgressEvent::Finished {
        files: total as u64,
        artifacts: found as u64,
    });
    session.checkpoint(store).await;

    tracing::info!(
        "ingested {} files into {} ({} summaries stored)",
        total,
        report.session_id,
        found
    );
    report
}

async fn ingest_file(
    store: &ArtifactStore,
    service: &dyn CompletionService,
    session: &mut SessionManager,
    file: &dyn SourceFile,
    settings: &IngestConfig,
    report: &mut IngestReport,
) {
    let path = file.path().to_string();
    report.files_attempted += 1;
    session.push_system(format!("Analyzing: {}", path));

    let content = match file.read_content().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("{}", e);
            report.read_errors += 1;
            session.push_system(format!("Error processing {}: {}", path, e.source));
            return;
        }
    };

    let prompt = match truncate_content(&content, settings.max_file_chars) {
        Some(truncated) => {
            report.truncated += 1;
            session.push_system(format!(
                "File {} was truncated for API analysis due to its size.",
                path
            ));
            summarize_file_prompt(&path, &truncated)
        }
        None => summarize_file_prompt(&path, &content),
    };

    let (summary, summary_status) = match service.complete(&prompt).await {
        Ok(text) => (text, SummaryStatus::Ok),
        Err(e) => {
            tracing::warn!("summarizing {} failed: {}", path, e);
            (e.to_string(), SummaryStatus::Failed)
        }
    };

    session.push_ai(format!("Summary for {}:\n{}", path, summary));

    if let Err(e) = store
        .put_summary(session.session_id(), &path, &summary, summary_status)
        .await
    {
        tracing::warn!("{}", e);
        report.write_errors += 1;
        session.push_system(format!("Error processing {}: {}", path, e));
        return;
    }

    report.summaries_written += 1;
    if summary_status == SummaryStatus::Failed {
        report.summaries_failed += 1;
    }

    if store.get_summary(session.session_id(), &path).await.is_none() {
        tracing::warn!("summary not found after saving for {}", path);
        report.verification_misses += 1;
        session.push_system(format!(
            "Warning: Summary for {} could not be verified in storage.",
            path
        ));
    }
}
