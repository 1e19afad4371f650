//! Ingestion progress reporting.
//!
//! Reports observable progress during `repochat ingest` so users see which
//! file is being summarized and how many are left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an ingestion run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestProgressEvent {
    /// Filtering finished; `total` files will be summarized.
    Started { session: String, total: u64 },
    /// File `n` of `total` is being summarized.
    File { n: u64, total: u64, path: String },
    /// All files were attempted; `artifacts` summaries were found in storage.
    Finished { files: u64, artifacts: u64 },
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest pipeline.
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  12 / 1,234  src/main.rs".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started { session, total } => {
                format!("ingest {}  {} files\n", session, format_number(*total))
            }
            IngestProgressEvent::File { n, total, path } => {
                format!(
                    "ingest  {} / {}  {}\n",
                    format_number(*n),
                    format_number(*total),
                    path
                )
            }
            IngestProgressEvent::Finished { files, artifacts } => {
                format!(
                    "ingest  done  {} files, {} summaries stored\n",
                    format_number(*files),
                    format_number(*artifacts)
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Started { session, total } => serde_json::json!({
                "event": "started",
                "session": session,
                "total": total
            }),
            IngestProgressEvent::File { n, total, path } => serde_json::json!({
                "event": "progress",
                "n": n,
                "total": total,
                "path": path
            }),
            IngestProgressEvent::Finished { files, artifacts } => serde_json::json!({
                "event": "finished",
                "files": files,
                "artifacts": artifacts
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse `--progress` values; `None` means "pick from the TTY".
    pub fn parse(value: Option<&str>) -> anyhow::Result<Self> {
        match value {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be off, human, or json.",
                other
            ),
        }
    }

    /// Build a reporter for this mode. Caller can pass it to ingest.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
