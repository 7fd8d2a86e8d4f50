// crates/rawmat-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests driving the rawmat binary end to end.
// Purpose: Ensure config loading, sqlite persistence, and exit codes line up.
// Dependencies: rawmat-cli binary, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Each test writes a `rawmat.toml` pointing at a temporary `SQLite` file and
//! runs the binary several times, so state must survive across processes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn rawmat_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rawmat"))
}

fn workspace(extra: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = dir.path().join("ledger.db");
    let events = dir.path().join("events.jsonl");
    let config = format!(
        "[store]\ntype = \"sqlite\"\npath = \"{}\"\n\n[logging]\nlevel = \"warn\"\nevent_log = \"{}\"\n{extra}",
        db.display(),
        events.display()
    );
    let config_path = dir.path().join("rawmat.toml");
    fs::write(&config_path, config).expect("write config");
    (dir, config_path)
}

fn rawmat(config: &Path, args: &[&str]) -> Output {
    Command::new(rawmat_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .args(["--actor-id", "user-1", "--actor-name", "Olivia Operator"])
        .output()
        .expect("run rawmat")
}

fn json_ok(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

fn create(config: &Path, grn: &str) -> i64 {
    let output = rawmat(
        config,
        &[
            "material",
            "create",
            "--item-code",
            "RM-001",
            "--item-name",
            "Lactose",
            "--batch-lot",
            "LOT-7",
            "--grn",
            grn,
            "--received-qty",
            "25",
            "--container-qty",
            "25",
            "--supplier",
            "Acme",
            "--manufacturer",
            "Acme Labs",
            "--receipt-date",
            "2024-05-20",
        ],
    );
    json_ok(&output)["material"]["id"].as_i64().expect("material id")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn state_persists_across_invocations() {
    let (dir, config) = workspace("");
    let id = create(&config, "GRN-B1").to_string();

    json_ok(&rawmat(&config, &["material", "sample", "--id", &id]));
    json_ok(&rawmat(&config, &["material", "approve", "--id", &id]));
    let dispensed =
        json_ok(&rawmat(&config, &["material", "dispense", "--id", &id, "--qty", "25", "--batch", "PB-1"]));
    assert_eq!(dispensed["material"]["status"], "DISPENSED");

    let history = json_ok(&rawmat(&config, &["material", "history", "--id", &id]));
    let entries = history.as_array().expect("history array");
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["action"], "DISPENSING");

    let events = fs::read_to_string(dir.path().join("events.jsonl")).expect("read event log");
    assert_eq!(events.lines().count(), 4);
}

#[test]
fn duplicate_receipt_fails_with_nonzero_exit() {
    let (_dir, config) = workspace("");
    create(&config, "GRN-B2");
    let output = rawmat(
        &config,
        &[
            "material",
            "create",
            "--item-code",
            "RM-001",
            "--item-name",
            "Lactose",
            "--batch-lot",
            "LOT-7",
            "--grn",
            "GRN-B2",
            "--received-qty",
            "25",
            "--container-qty",
            "25",
            "--supplier",
            "Acme",
            "--manufacturer",
            "Acme Labs",
            "--receipt-date",
            "2024-05-20",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate_material: duplicate material"), "unexpected stderr: {stderr}");
}

#[test]
fn config_validate_prints_effective_settings() {
    let (_dir, config) = workspace("\n[lifecycle]\ndefault_dispensing_method = \"fefo\"\n");
    let output = rawmat(&config, &["config", "validate"]);
    let value = json_ok(&output);
    assert_eq!(value["lifecycle"]["default_dispensing_method"], "FEFO");
    assert_eq!(value["store"]["type"], "sqlite");
}

#[test]
fn invalid_config_fails_before_opening_the_store() {
    let (dir, config) = workspace("\n[lifecycle]\nexpiry_alert_days = 0\n");
    let output = rawmat(&config, &["inventory", "expiry-alerts"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("lifecycle.expiry_alert_days"), "unexpected stderr: {stderr}");
    assert!(!dir.path().join("ledger.db").exists());
}
