//! End-to-end tests for the `qarag` binary.
//!
//! Commands that talk to a backend run against the in-process mock; the
//! binary itself is spawned on a blocking thread so the mock keeps serving.

mod mock_backend;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

use mock_backend::MockBackend;

fn qarag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("qarag");
    path
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[backend]
base_url = "{}"
timeout_secs = 5

[ingestion]
parsing_after_ms = 20
embedding_after_ms = 40
complete_hold_ms = 20
"#,
        base_url
    );
    let config_path = config_dir.join("qarag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_qarag(config_path: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let binary = qarag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("QARAG_BACKEND_URL")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qarag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

async fn run_qarag_async(config_path: PathBuf, args: Vec<String>) -> (String, String, Option<i32>) {
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_qarag(&config_path, &args)
    })
    .await
    .unwrap()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ─── No backend needed ──────────────────────────────────────────────

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let (stdout, stderr, code) = run_qarag(&config_path, &["completions", "bash"]);
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("qarag"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env("ftp://nowhere");
    let (_, stderr, code) = run_qarag(&config_path, &["files"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("base_url"), "stderr={}", stderr);
}

#[test]
fn test_clear_without_confirmation_is_cancelled() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let (stdout, _, code) = run_qarag(&config_path, &["clear"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Cancelled."));
}

#[test]
fn test_upload_needs_pdf() {
    let (tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, "plain text").unwrap();

    let (_, stderr, code) = run_qarag(&config_path, &["upload", notes.to_str().unwrap()]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("Skipping"));
    assert!(stderr.contains("No PDF files to upload."));
}

#[test]
fn test_files_offline_fails() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let (stdout, stderr, code) = run_qarag(&config_path, &["files"]);
    assert_ne!(code, Some(0));
    assert!(!stdout.contains("No active repositories found"));
    assert!(
        stderr.contains("Backend unreachable: could not list documents at http://127.0.0.1:9"),
        "stderr={}",
        stderr
    );
}

#[test]
fn test_ask_offline_prints_diagnostic() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let (stdout, _, code) = run_qarag(&config_path, &["ask", "What is the termination clause?"]);
    assert_eq!(code, Some(1));
    assert!(stdout.contains("Critical error in RAG pipeline. Verify backend status."));
}

#[test]
fn test_upload_offline_fails() {
    let (tmp, config_path) = setup_test_env("http://127.0.0.1:9");
    let pdf = tmp.path().join("contract.pdf");
    fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();

    let (_, stderr, code) = run_qarag(
        &config_path,
        &["--progress", "off", "upload", pdf.to_str().unwrap()],
    );
    assert_ne!(code, Some(0));
    assert!(stderr.contains("System Offline: Backend must be running at http://127.0.0.1:9"));
}

// ─── Against the mock backend ───────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_files_lists_backend_documents() {
    let mock = MockBackend::start().await;
    mock.state.files.lock().unwrap().push("contract.pdf".to_string());
    let (_tmp, config_path) = setup_test_env(&mock.url());

    let (stdout, stderr, code) = run_qarag_async(config_path, args(&["files"])).await;
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("Doc Repositories"));
    assert!(stdout.contains("- contract.pdf"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_files_empty_backend_succeeds() {
    let mock = MockBackend::start().await;
    let (_tmp, config_path) = setup_test_env(&mock.url());

    let (stdout, stderr, code) = run_qarag_async(config_path, args(&["files"])).await;
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("No active repositories found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upload_reports_json_progress() {
    let mock = MockBackend::start().await;
    let (tmp, config_path) = setup_test_env(&mock.url());
    let pdf = tmp.path().join("contract.pdf");
    fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();

    let (stdout, stderr, code) = run_qarag_async(
        config_path,
        args(&["--progress", "json", "upload", pdf.to_str().unwrap()]),
    )
    .await;
    assert_eq!(code, Some(0), "stderr={}", stderr);
    assert!(stdout.contains("Uploaded 1 file(s)."));
    assert!(stdout.contains("- contract.pdf"));

    let events: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    assert_eq!(events.first().unwrap()["phase"], "uploading");
    assert!(events
        .iter()
        .filter(|e| e["event"] == "progress")
        .all(|e| e["fill_percent"].is_number()));
    assert!(events.iter().any(|e| e["phase"] == "complete"));
    assert_eq!(events.last().unwrap()["phase"], "idle");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_json() {
    let mock = MockBackend::start().await;
    let (_tmp, config_path) = setup_test_env(&mock.url());

    let (stdout, stderr, code) = run_qarag_async(
        config_path,
        args(&["ask", "What is the termination clause?", "--json"]),
    )
    .await;
    assert_eq!(code, Some(0), "stderr={}", stderr);

    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(v["query"], "What is the termination clause?");
    assert_eq!(v["answer"], "Either party may terminate with 30 days notice.");
    assert_eq!(v["evidence"].as_array().unwrap().len(), 2);
    assert_eq!(v["evidence"][0]["page"], 9);
    assert_eq!(v["verification"], "Answer is supported by page 9.");
    assert_eq!(v["error"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_human_shows_badges() {
    let mock = MockBackend::start().await;
    let (_tmp, config_path) = setup_test_env(&mock.url());

    let (stdout, _, code) =
        run_qarag_async(config_path, args(&["ask", "termination?"])).await;
    assert_eq!(code, Some(0));
    assert!(stdout.contains("-- Generation Process --"));
    assert!(stdout.contains("PASSAGE 1 \u{2022} P9  [Precise]"));
    assert!(stdout.contains("PASSAGE 2 \u{2022} P10  [Relevant]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_with_yes() {
    let mock = MockBackend::start().await;
    mock.state.files.lock().unwrap().push("contract.pdf".to_string());
    let (_tmp, config_path) = setup_test_env(&mock.url());

    let (stdout, _, code) = run_qarag_async(config_path, args(&["clear", "--yes"])).await;
    assert_eq!(code, Some(0));
    assert!(stdout.contains("Cleared"));
    assert_eq!(
        mock.state
            .clears
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}
