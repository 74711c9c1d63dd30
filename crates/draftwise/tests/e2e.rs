// SPDX-FileCopyrightText: 2026 Draftwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `draftwise` binary.
//!
//! Each test writes its own config into a temp directory and runs the built
//! binary against it. Tests are independent and order-insensitive.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("draftwise.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn draftwise(config: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_draftwise"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---- check ----

#[test]
fn check_accepts_default_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let output = draftwise(&config, &["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("config ok"));
}

#[test]
fn check_reports_every_validation_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[cascade]
global_threshold = 1.5

[budget]
warn_at = 0.95
degrade_at = 0.9
"#,
    );
    let output = draftwise(&config, &["check"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("global_threshold"), "stderr: {err}");
    assert!(err.contains("warn_at"), "stderr: {err}");
    assert!(err.contains("configuration error(s)"));
}

#[test]
fn check_suggests_fix_for_misspelled_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[cascade]\nglobal_treshold = 0.7\n");
    let output = draftwise(&config, &["check"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("global_threshold"));
}

#[test]
fn check_summarizes_pipelines() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[[pipelines.medical.steps]]
name = "draft"
model = "gpt-4o-mini"

[[pipelines.medical.steps]]
name = "expert"
model = "claude-sonnet-4-5"
"#,
    );
    let output = draftwise(&config, &["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("medical (2 steps)"));
}

// ---- classify / select ----

#[test]
fn classify_emits_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let output = draftwise(
        &config,
        &["classify", "What are the early symptoms of diabetes?", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["domain"], "medical");
    assert!(value["complexity"].is_string());
}

#[test]
fn select_respects_plan_allow_list() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[budget.plans.starter]
daily_usd = 1.0
allowed_models = ["gpt-4o-mini", "claude-haiku-4-5"]
"#,
    );
    let output = draftwise(
        &config,
        &["select", "Explain how a hash map works", "--plan", "starter", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let models: Vec<&str> = value["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["model"].as_str().unwrap())
        .collect();
    assert!(!models.is_empty());
    assert!(models.iter().all(|m| *m == "gpt-4o-mini" || *m == "claude-haiku-4-5"));
}

#[test]
fn select_with_no_budget_has_no_candidates() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");
    let output = draftwise(&config, &["select", "What is 2+2?", "--budget", "0"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("no affordable candidate"));
}
