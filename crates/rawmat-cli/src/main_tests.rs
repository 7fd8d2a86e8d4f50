// crates/rawmat-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and ledger dispatch.
// Purpose: Ensure flags map onto ledger requests and failures surface cleanly.
// Dependencies: rawmat-cli main helpers, rawmat-core
// ============================================================================

//! ## Overview
//! Drives `run_ledger` against an in-memory engine with a pinned clock, and
//! checks flag parsing through `Cli::try_parse_from`.

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

use clap::Parser;
use rawmat_core::InMemoryMaterialStore;
use rawmat_core::LifecycleConfig;
use rawmat_core::LifecycleEngine;
use rawmat_core::ManualClock;
use rawmat_core::Quantity;
use serde_json::Value;
use time::macros::date;

use super::ActorArgs;
use super::Cli;
use super::Commands;
use super::LedgerCommand;
use super::RoleArg;
use super::parse_date_arg;
use super::parse_quantity_arg;
use super::resolve_actor;
use super::run_ledger;

// ============================================================================
// SECTION: Helpers
// ============================================================================

type MemoryEngine = LifecycleEngine<InMemoryMaterialStore, ManualClock>;

fn engine() -> MemoryEngine {
    LifecycleEngine::new(
        InMemoryMaterialStore::new(),
        ManualClock::at_date(date!(2024 - 06 - 01)),
        LifecycleConfig::default(),
    )
}

/// Parses `args` (without the binary name) and runs the ledger command.
fn run(engine: &MemoryEngine, args: &[&str]) -> Result<Value, String> {
    let cli = Cli::try_parse_from(std::iter::once("rawmat").chain(args.iter().copied()))
        .map_err(|err| err.to_string())?;
    let command = match cli.command {
        Commands::Material { command } => LedgerCommand::Material(command),
        Commands::Inventory { command } => LedgerCommand::Inventory(command),
        Commands::Actor { command } => LedgerCommand::Actor(command),
        Commands::Config { .. } => return Err("config commands do not reach the ledger".into()),
    };
    let actor = resolve_actor(&cli.actor);
    run_ledger(engine, command, actor.as_ref()).map_err(|err| err.to_string())
}

fn quantity_json(text: &str) -> Value {
    serde_json::to_value(Quantity::parse(text).unwrap()).unwrap()
}

const OPERATOR: [&str; 4] = ["--actor-id", "user-1", "--actor-name", "Olivia Operator"];

fn with_operator<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut full: Vec<&str> = args.to_vec();
    full.extend_from_slice(&OPERATOR);
    full
}

fn create(engine: &MemoryEngine, grn: &str) -> i64 {
    let output = run(
        engine,
        &with_operator(&[
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
            "100",
            "--container-qty",
            "100",
            "--supplier",
            "Acme",
            "--manufacturer",
            "Acme Labs",
            "--receipt-date",
            "2024-05-20",
            "--exp-date",
            "2026-01-10",
        ]),
    )
    .unwrap();
    output["material"]["id"].as_i64().unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn quantity_and_date_flags_are_validated() {
    assert_eq!(parse_quantity_arg("12.50").unwrap(), Quantity::parse("12.5").unwrap());
    assert!(parse_quantity_arg("-1").is_err());
    assert!(parse_quantity_arg("ten").is_err());
    assert_eq!(parse_date_arg("2024-02-29").unwrap(), date!(2024 - 02 - 29));
    assert!(parse_date_arg("2023-02-29").is_err());
}

#[test]
fn actor_requires_a_non_blank_id() {
    let blank = ActorArgs { actor_id: Some("  ".to_string()), actor_name: None, role: RoleArg::Admin };
    assert!(resolve_actor(&blank).is_none());

    let named = ActorArgs { actor_id: Some("qa-2".to_string()), actor_name: None, role: RoleArg::Viewer };
    let actor = resolve_actor(&named).unwrap();
    assert_eq!(actor.id.as_str(), "qa-2");
    assert_eq!(actor.display_name, "qa-2");
    assert_eq!(actor.role, rawmat_core::Role::Viewer);
}

#[test]
fn full_lifecycle_through_commands() {
    let engine = engine();
    let id = create(&engine, "GRN-C1");
    let id_text = id.to_string();

    let sampled = run(&engine, &with_operator(&["material", "sample", "--id", &id_text])).unwrap();
    assert_eq!(sampled["material"]["status"], "UNDER_TEST");

    let approved = run(
        &engine,
        &with_operator(&["material", "approve", "--id", &id_text, "--retest-date", "2025-06-01"]),
    )
    .unwrap();
    assert_eq!(approved["material"]["status"], "APPROVED");

    run(&engine, &with_operator(&["material", "rack", "--id", &id_text, "--rack", "R-7"])).unwrap();

    let outward = run(
        &engine,
        &with_operator(&[
            "inventory", "outward", "--id", &id_text, "--qty", "10", "--date", "2024-06-01",
        ]),
    )
    .unwrap();
    assert_eq!(outward["material"]["remaining_quantity"], quantity_json("90"));

    let dispensed = run(
        &engine,
        &with_operator(&[
            "material", "dispense", "--id", &id_text, "--qty", "90", "--batch", "PB-1", "--method",
            "fefo",
        ]),
    )
    .unwrap();
    assert_eq!(dispensed["fully_dispensed"], true);
    assert_eq!(dispensed["method"], "FEFO");
    assert_eq!(dispensed["material"]["status"], "DISPENSED");

    let history = run(&engine, &["material", "history", "--id", &id_text]).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 6);
    let replay = run(&engine, &["material", "history", "--id", &id_text, "--replay"]).unwrap();
    assert_eq!(replay[0]["action"], "CREATED");

    let transactions = run(&engine, &["material", "transactions", "--id", &id_text]).unwrap();
    assert_eq!(transactions.as_array().unwrap().len(), 1);
}

#[test]
fn lookups_resolve_by_code_and_scan() {
    let engine = engine();
    let id = create(&engine, "GRN-C2");
    let shown = run(&engine, &["material", "show", "--id", &id.to_string()]).unwrap();
    let code = shown["material_code"].as_str().unwrap().to_string();

    let by_code = run(&engine, &["material", "show", "--code", &code]).unwrap();
    assert_eq!(by_code["id"].as_i64(), Some(id));

    let label = run(&engine, &["material", "label", "--id", &id.to_string()]).unwrap();
    let payload = label["qr_payload"].as_str().unwrap().to_string();
    let scanned = run(&engine, &["material", "scan", "--payload", &payload]).unwrap();
    assert_eq!(scanned["id"].as_i64(), Some(id));
}

#[test]
fn show_requires_id_or_code() {
    let engine = engine();
    let err = run(&engine, &["material", "show"]).unwrap_err();
    assert!(err.contains("--id") || err.contains("--code"), "unexpected error: {err}");
}

#[test]
fn ledger_errors_lead_with_their_code() {
    let engine = engine();
    let err = run(&engine, &["material", "show", "--id", "404"]).unwrap_err();
    assert!(err.starts_with("not_found: "), "unexpected error: {err}");

    let id = create(&engine, "GRN-C5").to_string();
    let err = run(
        &engine,
        &with_operator(&["material", "dispense", "--id", &id, "--qty", "1", "--batch", "PB-2"]),
    )
    .unwrap_err();
    assert!(err.starts_with("invalid_transition: "), "unexpected error: {err}");
}

#[test]
fn mutations_require_an_actor() {
    let engine = engine();
    let err = run(&engine, &["material", "sample", "--id", "1"]).unwrap_err();
    assert!(err.contains("--actor-id"), "unexpected error: {err}");
}

#[test]
fn viewers_are_denied_mutations() {
    let engine = engine();
    let id = create(&engine, "GRN-C3");
    let err = run(
        &engine,
        &["material", "sample", "--id", &id.to_string(), "--actor-id", "v-1", "--role", "viewer"],
    )
    .unwrap_err();
    assert!(err.starts_with("permission_denied: permission denied"), "unexpected error: {err}");
}

#[test]
fn availability_and_alerts_list_lots() {
    let engine = engine();
    let id = create(&engine, "GRN-C4").to_string();
    run(&engine, &with_operator(&["material", "sample", "--id", &id])).unwrap();
    run(&engine, &with_operator(&["material", "approve", "--id", &id])).unwrap();

    let available =
        run(&engine, &["inventory", "available", "--item-code", "RM-001", "--method", "fifo"]).unwrap();
    assert_eq!(available.as_array().unwrap().len(), 1);

    let alerts = run(&engine, &["inventory", "expiry-alerts", "--days", "30"]).unwrap();
    assert!(alerts.as_array().unwrap().is_empty());
}

#[test]
fn actor_register_stores_profile() {
    let engine = engine();
    let profile =
        run(&engine, &with_operator(&["actor", "register", "--username", "olivia"])).unwrap();
    assert_eq!(profile["username"], "olivia");
    assert_eq!(profile["role"], "operator");
}
