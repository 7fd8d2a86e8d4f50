// crates/rawmat-cli/src/main.rs
// ============================================================================
// Module: Raw Material Ledger CLI Entry Point
// Description: Command dispatcher for material lifecycle and inventory tasks.
// Purpose: Expose every ledger operation as a scriptable JSON-emitting command.
// Dependencies: clap, rawmat-config, rawmat-core, rawmat-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! The `rawmat` binary loads `rawmat.toml`, installs the tracing subscriber,
//! opens the configured material store, and runs one ledger operation per
//! invocation. Results are written to stdout as JSON; diagnostics go to
//! stderr. The caller identity is supplied with `--actor-id`, `--actor-name`
//! and `--role`, standing in for an external authentication layer.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod logging;
#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rawmat_config::RawmatConfig;
use rawmat_core::Actor;
use rawmat_core::ActorProfile;
use rawmat_core::ApproveRequest;
use rawmat_core::Clock;
use rawmat_core::CreateMaterialRequest;
use rawmat_core::DispenseRequest;
use rawmat_core::DispensingMethod;
use rawmat_core::InventoryMovementRequest;
use rawmat_core::LifecycleEngine;
use rawmat_core::LifecycleEventSink;
use rawmat_core::MaterialCode;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStore;
use rawmat_core::Quantity;
use rawmat_core::RackUpdateRequest;
use rawmat_core::RejectRequest;
use rawmat_core::Role;
use rawmat_core::SamplingRequest;
use rawmat_core::SystemClock;
use rawmat_core::parse_date;
use rawmat_core::runtime::JsonlEventSink;
use rawmat_core::runtime::NoopEventSink;
use rawmat_core::runtime::StderrEventSink;
use rawmat_store_sqlite::SqliteMaterialStore;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::Date;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `logging.event_log` value that streams events to stderr.
const STDERR_EVENT_LOG: &str = "-";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rawmat", disable_help_subcommand = true, version)]
struct Cli {
    /// Config file path (defaults to rawmat.toml or `RAWMAT_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Caller identity.
    #[command(flatten)]
    actor: ActorArgs,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Caller identity flags shared by every command.
#[derive(Args, Debug, Clone)]
struct ActorArgs {
    /// Actor identifier recorded in audit entries.
    #[arg(long = "actor-id", value_name = "ID", global = true)]
    actor_id: Option<String>,
    /// Actor display name used in default comments (defaults to the id).
    #[arg(long = "actor-name", value_name = "NAME", global = true)]
    actor_name: Option<String>,
    /// Actor role.
    #[arg(long, value_enum, default_value_t = RoleArg::Operator, global = true)]
    role: RoleArg,
}

/// Role flag values.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum RoleArg {
    /// Full access.
    Admin,
    /// Warehouse and QC operator.
    Operator,
    /// Read-only access.
    Viewer,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Self::Admin,
            RoleArg::Operator => Self::Operator,
            RoleArg::Viewer => Self::Viewer,
        }
    }
}

/// Dispensing method flag values.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum MethodArg {
    /// Oldest receipt first.
    Fifo,
    /// Earliest expiry first.
    Fefo,
}

impl From<MethodArg> for DispensingMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Fifo => Self::Fifo,
            MethodArg::Fefo => Self::Fefo,
        }
    }
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Material lifecycle operations.
    Material {
        /// Selected material subcommand.
        #[command(subcommand)]
        command: MaterialCommand,
    },
    /// Inventory movements and stock queries.
    Inventory {
        /// Selected inventory subcommand.
        #[command(subcommand)]
        command: InventoryCommand,
    },
    /// Actor directory operations.
    Actor {
        /// Selected actor subcommand.
        #[command(subcommand)]
        command: ActorCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Material lifecycle subcommands.
#[derive(Subcommand, Debug)]
enum MaterialCommand {
    /// Register a received container in quarantine.
    Create(CreateCommand),
    /// Withdraw a sample and move the material under test.
    Sample(NoteCommand),
    /// Approve a material after QC.
    Approve(ApproveCommand),
    /// Reject a material after QC.
    Reject(RejectCommand),
    /// Change the rack location.
    Rack(RackCommand),
    /// Issue quantity to a product batch.
    Dispense(DispenseCommand),
    /// Show a material by id or code.
    Show(ShowCommand),
    /// Resolve a scanned QR payload or bare material code.
    Scan(ScanCommand),
    /// Show the audit trail of a material.
    History(HistoryCommand),
    /// Render label fields and the QR payload.
    Label(IdCommand),
    /// List inventory movements of a material.
    Transactions(IdCommand),
}

/// Inventory subcommands.
#[derive(Subcommand, Debug)]
enum InventoryCommand {
    /// Record stock returned to a container.
    Inward(MovementCommand),
    /// Record stock removed outside dispensing.
    Outward(MovementCommand),
    /// List approved lots with stock in dispensing order.
    Available(AvailableCommand),
    /// List lots whose expiry falls inside the alert window.
    ExpiryAlerts(ExpiryAlertsCommand),
}

/// Actor subcommands.
#[derive(Subcommand, Debug)]
enum ActorCommand {
    /// Store the calling actor's profile for history joins.
    Register(RegisterCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print the effective values.
    Validate,
}

/// Arguments for material creation.
#[derive(Args, Debug)]
struct CreateCommand {
    /// Item code.
    #[arg(long)]
    item_code: String,
    /// Item name.
    #[arg(long)]
    item_name: String,
    /// Supplier batch or lot number.
    #[arg(long = "batch-lot")]
    batch_lot_number: String,
    /// Goods receipt note number.
    #[arg(long = "grn")]
    grn_number: String,
    /// Quantity received.
    #[arg(long = "received-qty", value_parser = parse_quantity_arg)]
    received_total_quantity: Quantity,
    /// Quantity held by the container.
    #[arg(long = "container-qty", value_parser = parse_quantity_arg)]
    container_quantity: Quantity,
    /// Supplier name.
    #[arg(long = "supplier")]
    supplier_name: String,
    /// Manufacturer name.
    #[arg(long = "manufacturer")]
    manufacturer_name: String,
    /// Receipt date (YYYY-MM-DD).
    #[arg(long = "receipt-date", value_parser = parse_date_arg)]
    date_of_receipt: Date,
    /// Manufacture date (YYYY-MM-DD).
    #[arg(long = "mfg-date", value_parser = parse_date_arg)]
    mfg_date: Option<Date>,
    /// Expiry date (YYYY-MM-DD).
    #[arg(long = "exp-date", value_parser = parse_date_arg)]
    exp_date: Option<Date>,
    /// Optional creation comment.
    #[arg(long)]
    comment: Option<String>,
}

/// Material id plus an optional comment.
#[derive(Args, Debug)]
struct NoteCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Optional comment.
    #[arg(long)]
    comment: Option<String>,
}

/// Arguments for QC approval.
#[derive(Args, Debug)]
struct ApproveCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Retest date (YYYY-MM-DD).
    #[arg(long = "retest-date", value_parser = parse_date_arg)]
    retest_date: Option<Date>,
    /// Optional comment.
    #[arg(long)]
    comment: Option<String>,
}

/// Arguments for QC rejection.
#[derive(Args, Debug)]
struct RejectCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Rejection reason (required by the ledger).
    #[arg(long)]
    reason: Option<String>,
    /// Optional comment.
    #[arg(long)]
    comment: Option<String>,
}

/// Arguments for a rack change.
#[derive(Args, Debug)]
struct RackCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// New rack location.
    #[arg(long)]
    rack: String,
}

/// Arguments for a dispense.
#[derive(Args, Debug)]
struct DispenseCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Quantity to issue.
    #[arg(long = "qty", value_parser = parse_quantity_arg)]
    quantity: Quantity,
    /// Receiving product batch.
    #[arg(long = "batch")]
    product_batch: String,
    /// Ordering policy that guided the pick (defaults from config).
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
    /// Optional comment.
    #[arg(long)]
    comment: Option<String>,
}

/// Lookup by id or material code.
#[derive(Args, Debug)]
struct ShowCommand {
    /// Material id.
    #[arg(long, conflicts_with = "code", required_unless_present = "code")]
    id: Option<i64>,
    /// Material code.
    #[arg(long)]
    code: Option<String>,
}

/// Arguments for a scan lookup.
#[derive(Args, Debug)]
struct ScanCommand {
    /// Raw scanned text.
    #[arg(long)]
    payload: String,
}

/// Arguments for history queries.
#[derive(Args, Debug)]
struct HistoryCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Emit raw entries oldest first instead of the joined newest-first view.
    #[arg(long, action = ArgAction::SetTrue)]
    replay: bool,
}

/// Material id only.
#[derive(Args, Debug)]
struct IdCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
}

/// Arguments for an inventory movement.
#[derive(Args, Debug)]
struct MovementCommand {
    /// Material id.
    #[arg(long)]
    id: i64,
    /// Quantity moved.
    #[arg(long = "qty", value_parser = parse_quantity_arg)]
    quantity: Quantity,
    /// Business date of the movement (YYYY-MM-DD).
    #[arg(long = "date", value_parser = parse_date_arg)]
    transaction_date: Date,
    /// Optional remarks.
    #[arg(long)]
    remarks: Option<String>,
}

/// Arguments for availability listing.
#[derive(Args, Debug)]
struct AvailableCommand {
    /// Restrict to one item code.
    #[arg(long)]
    item_code: Option<String>,
    /// Ordering policy (defaults from config).
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
}

/// Arguments for expiry alerts.
#[derive(Args, Debug)]
struct ExpiryAlertsCommand {
    /// Alert window in days (defaults from config).
    #[arg(long)]
    days: Option<u32>,
}

/// Arguments for actor registration.
#[derive(Args, Debug)]
struct RegisterCommand {
    /// Login name stored with the profile.
    #[arg(long)]
    username: String,
}

/// Commands that run against an open ledger.
#[derive(Debug)]
enum LedgerCommand {
    /// Material lifecycle operation.
    Material(MaterialCommand),
    /// Inventory operation.
    Inventory(InventoryCommand),
    /// Actor directory operation.
    Actor(ActorCommand),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = RawmatConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    logging::init(&config.logging).map_err(CliError::new)?;

    let command = match cli.command {
        Commands::Config { command: ConfigCommand::Validate } => {
            write_json(&config)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Material { command } => LedgerCommand::Material(command),
        Commands::Inventory { command } => LedgerCommand::Inventory(command),
        Commands::Actor { command } => LedgerCommand::Actor(command),
    };
    let actor = resolve_actor(&cli.actor);
    let output = execute(&config, command, actor.as_ref())?;
    write_json(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// Opens the configured store and runs `command`.
fn execute(config: &RawmatConfig, command: LedgerCommand, actor: Option<&Actor>) -> CliResult<Value> {
    let events = open_event_sink(config)?;
    let sqlite = config.store.to_sqlite_config();
    debug!(path = %sqlite.path.display(), "opening sqlite material store");
    let store = SqliteMaterialStore::new(sqlite)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let engine = build_engine(store, SystemClock, config, events);
    run_ledger(&engine, command, actor)
}

/// Builds an engine with the configured lifecycle settings and event sink.
fn build_engine<S: MaterialStore, C: Clock>(
    store: S,
    clock: C,
    config: &RawmatConfig,
    events: Arc<dyn LifecycleEventSink>,
) -> LifecycleEngine<S, C> {
    LifecycleEngine::new(store, clock, config.lifecycle.to_lifecycle_config())
        .with_event_sink(events)
}

/// Opens the configured event sink; `-` selects stderr.
fn open_event_sink(config: &RawmatConfig) -> CliResult<Arc<dyn LifecycleEventSink>> {
    match &config.logging.event_log {
        Some(path) if path.as_os_str() == STDERR_EVENT_LOG => Ok(Arc::new(StderrEventSink)),
        Some(path) => {
            let sink = JsonlEventSink::new(path).map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(NoopEventSink)),
    }
}

// ============================================================================
// SECTION: Ledger Commands
// ============================================================================

/// Dispatches a ledger command and returns its JSON result.
fn run_ledger<S: MaterialStore, C: Clock>(
    engine: &LifecycleEngine<S, C>,
    command: LedgerCommand,
    actor: Option<&Actor>,
) -> CliResult<Value> {
    match command {
        LedgerCommand::Material(command) => command_material(engine, command, actor),
        LedgerCommand::Inventory(command) => command_inventory(engine, command, actor),
        LedgerCommand::Actor(ActorCommand::Register(command)) => {
            let actor = require_actor(actor)?;
            let profile = ActorProfile::from_actor(actor, command.username);
            engine.register_actor(&profile).map_err(ledger_error)?;
            to_json(&profile)
        }
    }
}

/// Executes material lifecycle commands.
fn command_material<S: MaterialStore, C: Clock>(
    engine: &LifecycleEngine<S, C>,
    command: MaterialCommand,
    actor: Option<&Actor>,
) -> CliResult<Value> {
    match command {
        MaterialCommand::Create(command) => {
            let request = CreateMaterialRequest {
                item_code: command.item_code,
                item_name: command.item_name,
                batch_lot_number: command.batch_lot_number,
                grn_number: command.grn_number,
                received_total_quantity: command.received_total_quantity,
                container_quantity: command.container_quantity,
                supplier_name: command.supplier_name,
                manufacturer_name: command.manufacturer_name,
                date_of_receipt: command.date_of_receipt,
                mfg_date: command.mfg_date,
                exp_date: command.exp_date,
                comment: command.comment,
            };
            to_json(&engine.create_material(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Sample(command) => {
            let request =
                SamplingRequest { material_id: MaterialId::new(command.id), comment: command.comment };
            to_json(&engine.move_to_under_test(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Approve(command) => {
            let request = ApproveRequest {
                material_id: MaterialId::new(command.id),
                retest_date: command.retest_date,
                comment: command.comment,
            };
            to_json(&engine.approve(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Reject(command) => {
            let request = RejectRequest {
                material_id: MaterialId::new(command.id),
                rejection_reason: command.reason,
                comment: command.comment,
            };
            to_json(&engine.reject(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Rack(command) => {
            let request =
                RackUpdateRequest { material_id: MaterialId::new(command.id), rack_number: command.rack };
            to_json(&engine.update_rack(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Dispense(command) => {
            let request = DispenseRequest {
                material_id: MaterialId::new(command.id),
                issued_quantity: command.quantity,
                issued_to_product_batch: command.product_batch,
                method: command.method.map(DispensingMethod::from),
                comment: command.comment,
            };
            to_json(&engine.dispense(require_actor(actor)?, request).map_err(ledger_error)?)
        }
        MaterialCommand::Show(command) => {
            let material = match (command.id, command.code) {
                (Some(id), _) => engine.find_by_id(MaterialId::new(id)),
                (None, Some(code)) => engine.find_by_code(&MaterialCode::new(code)),
                (None, None) => {
                    return Err(CliError::new("either --id or --code is required".to_string()));
                }
            };
            to_json(&material.map_err(ledger_error)?)
        }
        MaterialCommand::Scan(command) => {
            to_json(&engine.find_by_scan(&command.payload).map_err(ledger_error)?)
        }
        MaterialCommand::History(command) => {
            let id = MaterialId::new(command.id);
            if command.replay {
                to_json(&engine.replay(id).map_err(ledger_error)?)
            } else {
                to_json(&engine.history(id).map_err(ledger_error)?)
            }
        }
        MaterialCommand::Label(command) => {
            to_json(&engine.label(MaterialId::new(command.id)).map_err(ledger_error)?)
        }
        MaterialCommand::Transactions(command) => {
            to_json(&engine.transactions(MaterialId::new(command.id)).map_err(ledger_error)?)
        }
    }
}

/// Executes inventory commands.
fn command_inventory<S: MaterialStore, C: Clock>(
    engine: &LifecycleEngine<S, C>,
    command: InventoryCommand,
    actor: Option<&Actor>,
) -> CliResult<Value> {
    match command {
        InventoryCommand::Inward(command) => {
            let outcome = engine
                .record_inward(require_actor(actor)?, movement_request(command))
                .map_err(ledger_error)?;
            to_json(&outcome)
        }
        InventoryCommand::Outward(command) => {
            let outcome = engine
                .record_outward(require_actor(actor)?, movement_request(command))
                .map_err(ledger_error)?;
            to_json(&outcome)
        }
        InventoryCommand::Available(command) => {
            let lots = engine
                .list_available(command.item_code.as_deref(), command.method.map(DispensingMethod::from))
                .map_err(ledger_error)?;
            to_json(&lots)
        }
        InventoryCommand::ExpiryAlerts(command) => {
            to_json(&engine.expiry_alerts(command.days).map_err(ledger_error)?)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a movement request from CLI arguments.
fn movement_request(command: MovementCommand) -> InventoryMovementRequest {
    InventoryMovementRequest {
        material_id: MaterialId::new(command.id),
        quantity: command.quantity,
        transaction_date: command.transaction_date,
        remarks: command.remarks,
    }
}

/// Builds the caller identity from flags, if an id was supplied.
fn resolve_actor(args: &ActorArgs) -> Option<Actor> {
    let id = args.actor_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
    let name = args.actor_name.clone().unwrap_or_else(|| id.to_string());
    Some(Actor::with_role(id, name, args.role.into()))
}

/// Returns the caller identity or fails for mutating commands.
fn require_actor(actor: Option<&Actor>) -> CliResult<&Actor> {
    actor.ok_or_else(|| CliError::new("this command requires --actor-id".to_string()))
}

/// Parses a decimal quantity flag.
fn parse_quantity_arg(value: &str) -> Result<Quantity, String> {
    Quantity::parse(value).map_err(|err| err.to_string())
}

/// Parses a `YYYY-MM-DD` date flag.
fn parse_date_arg(value: &str) -> Result<Date, String> {
    parse_date(value).map_err(|err| err.to_string())
}

/// Formats a ledger error for the user.
fn ledger_error(err: rawmat_core::LifecycleError) -> CliError {
    CliError::new(format!("{}: {err}", err.code()))
}

/// Serializes a result into JSON.
fn to_json<T: Serialize>(value: &T) -> CliResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))
}

/// Writes a value to stdout as pretty JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
