// crates/rawmat-core/src/lib.rs
// ============================================================================
// Module: Raw Material Ledger Core Library
// Description: Public API surface for the raw material lifecycle ledger.
// Purpose: Expose core types, storage interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The ledger tracks received raw-material containers through quarantine,
//! quality testing, approval or rejection, rack storage and dispensing. Every
//! mutation is validated against the lifecycle state machine, applied with
//! exact decimal arithmetic and recorded in an append-only audit trail inside
//! one atomic store transaction. Storage is injected through
//! [`MaterialStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;
pub use interfaces::MaterialFilter;
pub use interfaces::MaterialStore;
pub use interfaces::MaterialTx;
pub use interfaces::StoreError;
pub use runtime::ApproveRequest;
pub use runtime::AuditRecorder;
pub use runtime::CreateMaterialRequest;
pub use runtime::CreatedMaterial;
pub use runtime::DispenseOutcome;
pub use runtime::DispenseRequest;
pub use runtime::DispensingSelector;
pub use runtime::ExpiryAlert;
pub use runtime::InMemoryMaterialStore;
pub use runtime::InventoryMovementRequest;
pub use runtime::LifecycleConfig;
pub use runtime::LifecycleEngine;
pub use runtime::LifecycleError;
pub use runtime::LifecycleEvent;
pub use runtime::LifecycleEventSink;
pub use runtime::MaterialLabel;
pub use runtime::MaterialRegistry;
pub use runtime::MovementOutcome;
pub use runtime::RackUpdateRequest;
pub use runtime::RejectRequest;
pub use runtime::SamplingRequest;
pub use runtime::TransitionOutcome;
