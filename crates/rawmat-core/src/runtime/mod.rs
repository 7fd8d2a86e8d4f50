// crates/rawmat-core/src/runtime/mod.rs
// ============================================================================
// Module: Ledger Runtime
// Description: Lifecycle engine, quantity ledger, audit, and lot selection.
// Purpose: Execute material lifecycle operations against an injected store.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the lifecycle state machine and its supporting
//! components. Every external surface (CLI, HTTP adapters, tests) must call
//! into the same [`LifecycleEngine`] so business rules are enforced once.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod atomic;
pub mod audit;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod selector;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use atomic::run_atomic;
pub use audit::AuditRecorder;
pub use audit::ContinuityError;
pub use audit::verify_continuity;
pub use engine::ApproveRequest;
pub use engine::CreateMaterialRequest;
pub use engine::CreatedMaterial;
pub use engine::DEFAULT_CONFLICT_RETRIES;
pub use engine::DEFAULT_EXPIRY_ALERT_DAYS;
pub use engine::DispenseOutcome;
pub use engine::DispenseRequest;
pub use engine::InventoryMovementRequest;
pub use engine::LifecycleConfig;
pub use engine::LifecycleEngine;
pub use engine::MaterialLabel;
pub use engine::MovementOutcome;
pub use engine::RackUpdateRequest;
pub use engine::RejectRequest;
pub use engine::SamplingRequest;
pub use engine::TransitionOutcome;
pub use error::LifecycleError;
pub use events::CollectingEventSink;
pub use events::JsonlEventSink;
pub use events::LifecycleEvent;
pub use events::LifecycleEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use registry::MaterialRegistry;
pub use selector::DispensingSelector;
pub use selector::ExpiryAlert;
pub use store::InMemoryMaterialStore;
