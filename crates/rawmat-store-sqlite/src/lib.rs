// crates/rawmat-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Material Store
// Description: Durable MaterialStore backend using SQLite.
// Purpose: Provide crash-safe persistence for the raw material ledger.
// Dependencies: rawmat-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`MaterialStore`] implementation. Each
//! lifecycle unit of work runs inside one `BEGIN IMMEDIATE` transaction, so a
//! material update, its inventory movement and its audit entry become visible
//! together or not at all. Security posture: database contents are untrusted
//! and are re-validated on every read.
//!
//! [`MaterialStore`]: rawmat_core::MaterialStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SCHEMA_VERSION;
pub use store::SqliteMaterialStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
