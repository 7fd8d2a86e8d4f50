// crates/rawmat-core/src/runtime/error.rs
// ============================================================================
// Module: Lifecycle Errors
// Description: Error taxonomy surfaced by every lifecycle operation.
// Purpose: Give callers typed, non-coerced business and storage failures.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! Business-rule violations are reported as distinct variants and never folded
//! into each other. Storage failures are wrapped in [`LifecycleError::Store`],
//! except write conflicts, which surface as [`LifecycleError::Conflict`] so
//! callers can retry from a fresh read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ActionKind;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::MaterialStatus;
use crate::core::Permission;
use crate::core::Quantity;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Input failed business validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Referenced material does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Requested transition is not allowed from the current status.
    #[error("invalid transition: cannot apply {action} to material in status {current}")]
    InvalidTransition {
        /// Status the material is currently in.
        current: MaterialStatus,
        /// Action that was attempted.
        action: ActionKind,
    },
    /// Requested quantity exceeds what remains.
    #[error("insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity {
        /// Quantity requested.
        requested: Quantity,
        /// Quantity available.
        available: Quantity,
    },
    /// A material with the same derived code already exists.
    #[error("duplicate material: {code} already exists as id {existing_id}")]
    DuplicateMaterial {
        /// Derived code.
        code: MaterialCode,
        /// Internal key of the existing row.
        existing_id: MaterialId,
    },
    /// A concurrent writer won; retry from a fresh read.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Actor lacks the permission required by the operation.
    #[error("permission denied: {0} required")]
    PermissionDenied(Permission),
    /// Storage failure; the enclosing operation was rolled back.
    #[error(transparent)]
    Store(StoreError),
}

impl LifecycleError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InsufficientQuantity { .. } => "insufficient_quantity",
            Self::DuplicateMaterial { .. } => "duplicate_material",
            Self::Conflict(_) => "conflict",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => Self::Conflict(reason),
            other => Self::Store(other),
        }
    }
}
