use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn repochat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("repochat");
    path
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Repository under test
    let repo = root.join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::create_dir_all(repo.join("node_modules/dep")).unwrap();
    fs::write(
        repo.join("src/app.js"),
        "import express from 'express';\nconst app = express();\napp.listen(3000);\n",
    )
    .unwrap();
    fs::write(repo.join("README.md"), "# Demo\n\nA tiny web server.\n").unwrap();
    fs::write(repo.join("node_modules/dep/index.js"), "module.exports = 1;\n").unwrap();
    fs::write(repo.join("debug.log"), "noise\n").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/repochat.sqlite"

[completion]
provider = "disabled"

[ingest]
inter_file_delay_ms = 0
"#,
        root.display()
    );

    let config_path = config_dir.join("repochat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, repo)
}

fn run_repochat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = repochat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run repochat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ingest(config_path: &Path, repo: &Path) -> String {
    let (stdout, stderr, success) = run_repochat(
        config_path,
        &["ingest", repo.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

fn session_id_from(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("session:"))
        .map(|s| s.trim().to_string())
        .expect("ingest output names the session")
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_repochat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/repochat.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path, _) = setup_test_env();

    let (_, _, success1) = run_repochat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_repochat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_skips_excluded_files() {
    let (_tmp, config_path, repo) = setup_test_env();

    let stdout = ingest(&config_path, &repo);
    assert!(stdout.contains("[System] Analyzing: README.md"));
    assert!(stdout.contains("[System] Analyzing: src/app.js"));
    assert!(!stdout.contains("node_modules"));
    assert!(!stdout.contains("debug.log"));
    assert!(stdout.contains("files attempted:    2"));
    assert!(stdout.contains("stored summaries:   2"));
    assert!(stdout.contains("Processed 2 files. Found 2 summaries in storage."));
    assert!(session_id_from(&stdout).starts_with("repo-"));
}

#[test]
fn test_ask_without_usable_summaries() {
    let (_tmp, config_path, repo) = setup_test_env();
    ingest(&config_path, &repo);

    // The disabled provider only produces failed summaries.
    let (stdout, stderr, success) =
        run_repochat(&config_path, &["ask", "What is this repo about?"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(
        stdout.trim(),
        "No repository data available. Please upload and process a repository first."
    );
}

#[test]
fn test_ask_before_ingest_fails() {
    let (_tmp, config_path, _) = setup_test_env();

    let (_, stderr, success) = run_repochat(&config_path, &["ask", "anything"]);
    assert!(!success);
    assert!(stderr.contains("repochat ingest"));
}

#[test]
fn test_summaries_lists_failed_entries() {
    let (_tmp, config_path, repo) = setup_test_env();
    ingest(&config_path, &repo);

    let (stdout, stderr, success) = run_repochat(&config_path, &["summaries"]);
    assert!(success, "summaries failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Stored Summaries (2):"));
    assert!(stdout.contains("File: README.md (failed)"));
    assert!(stdout.contains("completion provider is disabled"));
}

#[test]
fn test_transcript_survives_restart() {
    let (_tmp, config_path, repo) = setup_test_env();
    ingest(&config_path, &repo);
    run_repochat(&config_path, &["ask", "How many files are there?"]);

    let (stdout, stderr, success) = run_repochat(&config_path, &["transcript"]);
    assert!(success, "transcript failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("[AI] Hello! Select a repository to begin analysis."));
    assert!(stdout.contains("[You] How many files are there?"));
    assert!(stdout.contains("[System] No summaries found in storage. Please reprocess the repository."));
}

#[test]
fn test_sessions_lists_each_ingest() {
    let (_tmp, config_path, repo) = setup_test_env();
    let first = session_id_from(&ingest(&config_path, &repo));
    let second = session_id_from(&ingest(&config_path, &repo));
    assert_ne!(first, second);

    let (stdout, stderr, success) = run_repochat(&config_path, &["sessions"]);
    assert!(success, "sessions failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Sessions:    2"));
    assert!(stdout.contains(&first));
    assert!(stdout.contains(&second));

    // Older sessions stay addressable.
    let (stdout, _, success) =
        run_repochat(&config_path, &["summaries", "--session", &first]);
    assert!(success);
    assert!(stdout.contains("Stored Summaries (2):"));
}

#[test]
fn test_ephemeral_ingest_writes_nothing() {
    let (tmp, config_path, repo) = setup_test_env();

    let (stdout, stderr, success) = run_repochat(
        &config_path,
        &["--ephemeral", "ingest", repo.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("stored summaries:   2"));
    assert!(!tmp.path().join("data/repochat.sqlite").exists());
}

#[test]
fn test_ephemeral_sessions_leaves_no_database() {
    let (tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_repochat(&config_path, &["--ephemeral", "sessions"]);
    assert!(success, "sessions failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("(in memory)"));
    assert!(stdout.contains("Sessions:    0"));
    assert!(!tmp.path().join("data/repochat.sqlite").exists());
}

#[test]
fn test_ephemeral_rejected_for_stored_session_reads() {
    let (tmp, config_path, _) = setup_test_env();

    for args in [
        vec!["--ephemeral", "ask", "anything"],
        vec!["--ephemeral", "summaries"],
        vec!["--ephemeral", "transcript"],
    ] {
        let (_, stderr, success) = run_repochat(&config_path, &args);
        assert!(!success, "{:?} should fail", args);
        assert!(stderr.contains("cannot be combined with --ephemeral"), "{}", stderr);
    }
    assert!(!tmp.path().join("data/repochat.sqlite").exists());
}

#[test]
fn test_json_progress_on_stderr() {
    let (_tmp, config_path, repo) = setup_test_env();

    let (stdout, stderr, success) = run_repochat(
        &config_path,
        &["ingest", repo.to_str().unwrap(), "--progress", "json"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stderr.contains(r#""event":"started""#));
    assert!(stderr.contains(r#""event":"finished""#));
    assert!(!stdout.contains(r#""event""#));
}

#[test]
fn test_unknown_progress_mode_fails() {
    let (_tmp, config_path, repo) = setup_test_env();

    let (_, stderr, success) = run_repochat(
        &config_path,
        &["ingest", repo.to_str().unwrap(), "--progress", "loud"],
    );
    assert!(!success);
    assert!(stderr.contains("Unknown progress mode"));
}

#[test]
fn test_ingest_missing_directory_fails() {
    let (tmp, config_path, _) = setup_test_env();
    let missing = tmp.path().join("nope");

    let (_, stderr, success) =
        run_repochat(&config_path, &["ingest", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("not a directory"));
}
