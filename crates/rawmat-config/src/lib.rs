// crates/rawmat-config/src/lib.rs
// ============================================================================
// Module: Raw Material Config Library
// Description: Configuration model and validation for the ledger.
// Purpose: Single source of truth for rawmat.toml semantics.
// Dependencies: rawmat-core, rawmat-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `rawmat-config` defines the configuration model for the raw material
//! ledger. Loading is strict and fail-closed: oversized files, bad paths, and
//! out-of-range values are rejected before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
