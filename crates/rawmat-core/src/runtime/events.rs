// crates/rawmat-core/src/runtime/events.rs
// ============================================================================
// Module: Lifecycle Events
// Description: Structured events emitted after committed ledger mutations.
// Purpose: Feed external log pipelines without coupling the core to them.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The audit trail inside the store is the system of record. Lifecycle events
//! are a best-effort, after-commit mirror of it for operators: one JSON object
//! per committed mutation. Sinks never fail the operation that emitted them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::ActionKind;
use crate::core::ActorId;
use crate::core::HistoryId;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::MaterialStatus;
use crate::core::Quantity;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Committed mutation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Commit timestamp.
    pub timestamp_ms: Timestamp,
    /// Material internal key.
    pub material_id: MaterialId,
    /// Material code.
    pub material_code: MaterialCode,
    /// Recorded action.
    pub action: ActionKind,
    /// Status before the mutation.
    pub from_status: Option<MaterialStatus>,
    /// Status after the mutation.
    pub to_status: MaterialStatus,
    /// Performing actor.
    pub actor: ActorId,
    /// Quantity moved or dispensed, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
    /// Remaining quantity after the mutation.
    pub remaining: Quantity,
    /// Audit entry written with the mutation.
    pub history_id: HistoryId,
}

impl LifecycleEvent {
    /// Returns the event identifier used for an action.
    #[must_use]
    pub const fn event_name(action: ActionKind) -> &'static str {
        match action {
            ActionKind::Created => "material_created",
            ActionKind::Sampling => "material_sampled",
            ActionKind::Approval => "material_approved",
            ActionKind::Rejection => "material_rejected",
            ActionKind::RackUpdate => "material_rack_updated",
            ActionKind::Dispensing => "material_dispensed",
            ActionKind::Comment => "inventory_recorded",
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for lifecycle events.
pub trait LifecycleEventSink: Send + Sync {
    /// Records a committed event.
    fn record(&self, event: &LifecycleEvent);
}

/// Sink that discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl LifecycleEventSink for NoopEventSink {
    fn record(&self, _event: &LifecycleEvent) {}
}

/// Sink that writes JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrEventSink;

impl LifecycleEventSink for StderrEventSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct JsonlEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl JsonlEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl LifecycleEventSink for JsonlEventSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// In-memory sink that keeps every event; useful for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<LifecycleEvent>>,
}

impl CollectingEventSink {
    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl LifecycleEventSink for CollectingEventSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
