//! Command-line flows over the [`Assistant`].
//!
//! Each `run_*` function backs one `repochat` subcommand. Transcript
//! messages are printed to stdout as they are appended; progress and logs
//! go to stderr.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::assistant::Assistant;
use crate::completion::{self, CompletionService};
use crate::config::Config;
use crate::ingest::IngestReport;
use crate::models::Message;
use crate::progress::ProgressMode;
use crate::source;
use crate::store;
use crate::transcript::render_message;

/// Typed at the chat prompt to list stored summaries.
const SUMMARIES_COMMAND: &str = "/summaries";

fn build_assistant(
    config: &Config,
    store: store::ArtifactStore,
    listener: Option<UnboundedSender<Message>>,
) -> Result<Assistant> {
    let service: Arc<dyn CompletionService> =
        Arc::from(completion::create_service(&config.completion)?);
    tracing::debug!("completion model: {}", service.model_name());

    let assistant = Assistant::new(
        store,
        service,
        config.ingest.clone(),
        config.query.clone(),
    )?;
    Ok(match listener {
        Some(tx) => assistant.with_listener(tx),
        None => assistant,
    })
}

/// Print every message sent on the returned channel until all senders drop.
fn spawn_printer() -> (UnboundedSender<Message>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            println!("{}", render_message(&message));
            println!();
        }
    });
    (tx, handle)
}

fn print_report(report: &IngestReport) {
    println!("--- Ingest ---");
    println!("session:            {}", report.session_id);
    println!("files attempted:    {}", report.files_attempted);
    println!("summaries written:  {}", report.summaries_written);
    println!("  failed:           {}", report.summaries_failed);
    println!("truncated:          {}", report.truncated);
    println!("read errors:        {}", report.read_errors);
    println!("write errors:       {}", report.write_errors);
    println!("verification misses: {}", report.verification_misses);
    println!("stored summaries:   {}", report.artifacts_found);
}

async fn ingest_into(
    assistant: &Assistant,
    dir: &Path,
    progress: ProgressMode,
) -> Result<IngestReport> {
    let files = source::scan_directory(dir, false)?;
    let root = source::root_label(dir);
    tracing::info!("selected {} ({} files)", root, files.len());

    let reporter = progress.reporter();
    let report = assistant
        .select_repository(&root, files, reporter.as_ref())
        .await?;
    Ok(report)
}

/// `repochat ingest <dir>`: start a session for `dir` and summarize it.
pub async fn run_ingest(
    config: &Config,
    dir: &Path,
    progress: ProgressMode,
    ephemeral: bool,
) -> Result<()> {
    let store = store::open(config, ephemeral).await;
    let (tx, printer) = spawn_printer();
    let assistant = build_assistant(config, store, Some(tx))?;

    let result = ingest_into(&assistant, dir, progress).await;
    assistant.store().close().await;
    drop(assistant);
    let _ = printer.await;

    let report = result?;
    print_report(&report);
    Ok(())
}

/// `repochat ask <query>`: answer against a stored session.
///
/// Prints only the answer text so the output can be piped.
pub async fn run_ask(
    config: &Config,
    query: &str,
    session_id: Option<&str>,
    ephemeral: bool,
) -> Result<()> {
    store::require_persistent("ask", ephemeral)?;
    let store = store::open(config, ephemeral).await;
    let assistant = build_assistant(config, store, None)?;

    if assistant.resume(session_id).await.is_none() {
        match session_id {
            Some(id) => bail!("session not found: {}", id),
            None => bail!("No repository has been processed yet. Run `repochat ingest <dir>` first."),
        }
    }

    let response = assistant.ask(query).await?;
    println!("{}", response.text());
    assistant.store().close().await;
    Ok(())
}

/// `repochat summaries`: list the stored summaries of a session.
pub async fn run_summaries(
    config: &Config,
    session_id: Option<&str>,
    ephemeral: bool,
) -> Result<()> {
    store::require_persistent("summaries", ephemeral)?;
    let store = store::open(config, ephemeral).await;
    let assistant = build_assistant(config, store, None)?;

    if assistant.resume(session_id).await.is_none() {
        bail!("session not found; run `repochat ingest <dir>` first");
    }

    println!("{}", assistant.stored_summaries().await?);
    assistant.store().close().await;
    Ok(())
}

/// `repochat chat <dir>`: ingest `dir`, then answer questions read from
/// stdin, one per line, until EOF or `/quit`.
pub async fn run_chat(
    config: &Config,
    dir: &Path,
    progress: ProgressMode,
    ephemeral: bool,
) -> Result<()> {
    let store = store::open(config, ephemeral).await;
    let (tx, printer) = spawn_printer();
    let assistant = build_assistant(config, store, Some(tx))?;

    let report = ingest_into(&assistant, dir, progress).await?;
    eprintln!(
        "{} summaries ready. Ask a question, {} to list them, /quit to leave.",
        report.artifacts_found, SUMMARIES_COMMAND
    );

    let interactive = atty::is(atty::Stream::Stdin);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            eprint!("> ");
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            SUMMARIES_COMMAND => {
                assistant.stored_summaries().await?;
            }
            query => {
                assistant.ask(query).await?;
            }
        }
        // Let the printer catch up before the next prompt.
        tokio::task::yield_now().await;
    }

    assistant.store().close().await;
    drop(assistant);
    let _ = printer.await;
    Ok(())
}
