//! Integration tests for the `analyze-candidate` binary.
//!
//! Each case runs the real executable against a fake Mistral API served from
//! a background tokio runtime.

use assert_cmd::Command;
use axum::{routing::post, Json, Router};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::runtime::Runtime;

const VALID_REPLY: &str = r#"{
    "candidate_summary": "Python developer with four years of Django",
    "overall_score": 78,
    "metrics": {
        "skills_match": 85,
        "relevant_experience": 80,
        "education": 60,
        "soft_skills": 70
    },
    "analysis": "Strong backend match."
}"#;

/// Fake provider answering chat completions with `reply` and OCR with one
/// fixed page. Dropping the runtime stops the server.
struct FakeProvider {
    base_url: String,
    _runtime: Runtime,
}

impl FakeProvider {
    fn start(reply: &'static str) -> Self {
        let runtime = Runtime::new().unwrap();
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(move || async move {
                    Json(json!({
                        "id": "cmpl-test",
                        "object": "chat.completion",
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": reply}}]
                    }))
                }),
            )
            .route(
                "/v1/ocr",
                post(|| async {
                    Json(json!({
                        "pages": [{"index": 0, "markdown": "Skills: Python, Django\nExperience: 4 years"}]
                    }))
                }),
            );
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        runtime.spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            _runtime: runtime,
        }
    }
}

/// Job description and CV files in a scratch directory that also serves as
/// the working directory, so no `.env` is picked up.
struct Inputs {
    dir: TempDir,
    jd: PathBuf,
    cv: PathBuf,
}

fn inputs() -> Inputs {
    let dir = TempDir::new().unwrap();
    let jd = dir.path().join("jd.txt");
    let cv = dir.path().join("cv.pdf");
    fs::write(&jd, "Looking for a Python backend engineer, 3+ years").unwrap();
    fs::write(&cv, b"%PDF-1.4 scanned").unwrap();
    Inputs { dir, jd, cv }
}

fn cli(inputs: &Inputs) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_analyze-candidate"));
    cmd.env_clear()
        .env("RUST_LOG", "warn")
        .current_dir(inputs.dir.path());
    cmd
}

#[test]
fn test_missing_api_key_fails_before_reading_files() {
    let inputs = inputs();

    cli(&inputs)
        .arg("missing-jd.txt")
        .arg("missing-cv.pdf")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Error: MISTRAL_API_KEY not found. Please add it to your environment variables.",
        ));
}

#[test]
fn test_unreadable_cv_reports_document_error() {
    let inputs = inputs();

    cli(&inputs)
        .env("MISTRAL_API_KEY", "test-key")
        .arg(&inputs.jd)
        .arg(inputs.dir.path().join("does-not-exist.pdf"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error: Could not read document"));
}

#[test]
fn test_success_prints_one_json_line() {
    let provider = FakeProvider::start(VALID_REPLY);
    let inputs = inputs();

    let output = cli(&inputs)
        .env("MISTRAL_API_KEY", "test-key")
        .env("MISTRAL_API_BASE", &provider.base_url)
        .arg(&inputs.jd)
        .arg(&inputs.cv)
        .args(["--extraction", "remote"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);

    let result: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(result["overall_score"], 78);
    assert_eq!(result["metrics"]["skills_match"], 85);
}

#[test]
fn test_unwritable_raw_out_still_reports_parse_error() {
    let provider = FakeProvider::start("I cannot help with that.");
    let inputs = inputs();
    let raw_out = inputs.dir.path().join("missing-dir").join("raw.txt");

    cli(&inputs)
        .env("MISTRAL_API_KEY", "test-key")
        .env("MISTRAL_API_BASE", &provider.base_url)
        .arg(&inputs.jd)
        .arg(&inputs.cv)
        .args(["--extraction", "remote"])
        .arg("--raw-out")
        .arg(&raw_out)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Could not write raw reply"))
        .stderr(predicate::str::contains(
            "Error: Could not parse LLM response as JSON",
        ))
        .stderr(predicate::str::contains("I cannot help with that."));

    assert!(!raw_out.exists());
}
