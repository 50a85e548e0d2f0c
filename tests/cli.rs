//! Command-line behaviour of the `scholar-lens` binary.
//!
//! Only offline commands run to completion here; the hash embedder stands in
//! for remote embedding backends.

#![allow(clippy::panic)]

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const DOC: &str = "--- Page 1 ---\nThe sky is blue.\n--- Page 2 ---\nWater boils at 100C.";

fn lens() -> Command {
    let mut cmd = Command::cargo_bin("scholar-lens").unwrap_or_else(|e| panic!("binary: {e}"));
    for var in [
        "LENS_PROVIDER",
        "LENS_API_KEY",
        "GEMINI_API_KEY",
        "OPENAI_API_KEY",
        "LENS_CHUNK_SIZE",
        "LENS_CHUNK_OVERLAP",
        "LENS_CONTEXT_TOP_K",
        "LENS_MAX_TOOL_ROUNDS",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("LENS_EMBEDDER", "hash").env("LENS_MIN_CHUNK_CHARS", "10");
    cmd
}

fn doc() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap_or_else(|e| panic!("tempfile: {e}"));
    file.write_all(DOC.as_bytes())
        .unwrap_or_else(|e| panic!("write: {e}"));
    file
}

#[test]
fn calc_prints_result() {
    lens()
        .args(["calc", "2+2"])
        .assert()
        .success()
        .stdout("4\n");
}

#[test]
fn calc_rejects_non_arithmetic() {
    lens()
        .args(["calc", "2+2; DROP TABLE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only basic math allowed"));
}

#[test]
fn pages_lists_both_pages() {
    let file = doc();
    lens()
        .arg("pages")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 page(s)"))
        .stdout(predicate::str::contains("Page    2"));
}

#[test]
fn chunk_json_never_crosses_pages() {
    let file = doc();
    let output = lens()
        .args(["--format", "json", "chunk"])
        .arg(file.path())
        .output()
        .unwrap_or_else(|e| panic!("run: {e}"));
    assert!(output.status.success());

    let chunks: serde_json::Value =
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| panic!("json: {e}"));
    let pages: Vec<u64> = chunks
        .as_array()
        .map(|a| a.iter().filter_map(|c| c["page"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(pages, vec![1, 2]);
}

#[test]
fn index_with_hash_embedder() {
    let file = doc();
    lens()
        .arg("index")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexed 2 chunk(s) from 2 page(s)"))
        .stdout(predicate::str::contains("'hash'"));
}

#[test]
fn search_ranks_sky_page_first() {
    let file = doc();
    lens()
        .arg("search")
        .arg(file.path())
        .arg("What color is the sky?")
        .args(["-k", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1. [Page 1]"));
}

#[test]
fn ask_without_api_key_fails() {
    let file = doc();
    lens()
        .arg("ask")
        .arg(file.path())
        .arg("What color is the sky?")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn missing_document_fails() {
    lens()
        .args(["pages", "/nonexistent/paper.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn init_prompts_writes_templates() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    lens()
        .arg("init-prompts")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 2 prompt template(s)"));
    assert!(dir.path().join("agent.md").exists());
    assert!(dir.path().join("insights.md").exists());
}
