// crates/rawmat-core/src/runtime/ledger.rs
// ============================================================================
// Module: Quantity Ledger
// Description: Exact remaining-quantity arithmetic for every stock movement.
// Purpose: Keep remaining quantity within bounds on every mutation path.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Ledger functions are pure: they take the loaded material and return its
//! successor state, or the business error that blocks the movement. Nothing
//! is written here; the engine hands the successor to the registry write path,
//! which re-checks the same bounds before persisting.
//!
//! Movement rules:
//! - Dispense: `remaining -= issued`, `dispensed += issued`; the status becomes
//!   `DISPENSED` exactly when remaining reaches zero.
//! - Inward: `remaining += quantity`, never beyond the received total.
//! - Outward: `remaining -= quantity`; status is unchanged even at zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Material;
use crate::core::MaterialStatus;
use crate::core::Quantity;
use crate::core::TransactionDirection;
use crate::runtime::error::LifecycleError;

// ============================================================================
// SECTION: Movement Rules
// ============================================================================

/// Returns true when stock movements are accepted in `status`.
///
/// A dispensed lot must stay at zero, so it takes neither direction.
#[must_use]
pub const fn movement_allowed(status: MaterialStatus) -> bool {
    !matches!(status, MaterialStatus::Dispensed)
}

// ============================================================================
// SECTION: Arithmetic
// ============================================================================

/// Applies a dispense of `issued` to `material`.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] for a zero quantity and
/// [`LifecycleError::InsufficientQuantity`] when `issued` exceeds remaining.
pub fn apply_dispense(material: &Material, issued: &Quantity) -> Result<Material, LifecycleError> {
    require_positive(issued, "issued quantity")?;
    let remaining = take(material, issued)?;
    let dispensed = material
        .dispensed_quantity
        .checked_add(issued)
        .map_err(|err| LifecycleError::Validation(err.to_string()))?;
    let mut next = material.clone();
    next.status =
        if remaining.is_zero() { MaterialStatus::Dispensed } else { material.status };
    next.remaining_quantity = remaining;
    next.dispensed_quantity = dispensed;
    Ok(next)
}

/// Applies an inward or outward movement of `quantity` to `material`.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] for a zero quantity or an inward
/// movement beyond the received total, and
/// [`LifecycleError::InsufficientQuantity`] for an outward movement beyond
/// remaining.
pub fn apply_movement(
    material: &Material,
    direction: TransactionDirection,
    quantity: &Quantity,
) -> Result<Material, LifecycleError> {
    require_positive(quantity, "movement quantity")?;
    let remaining = match direction {
        TransactionDirection::Inward => {
            let raised = material
                .remaining_quantity
                .checked_add(quantity)
                .map_err(|err| LifecycleError::Validation(err.to_string()))?;
            if raised > material.received_total_quantity {
                return Err(LifecycleError::Validation(format!(
                    "inward of {quantity} would raise remaining to {raised}, above received total {}",
                    material.received_total_quantity
                )));
            }
            raised
        }
        TransactionDirection::Outward => take(material, quantity)?,
    };
    let mut next = material.clone();
    next.remaining_quantity = remaining;
    Ok(next)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects zero quantities.
fn require_positive(quantity: &Quantity, field: &str) -> Result<(), LifecycleError> {
    if quantity.is_positive() {
        Ok(())
    } else {
        Err(LifecycleError::Validation(format!("{field} must be greater than zero")))
    }
}

/// Subtracts `quantity` from remaining or reports the shortfall.
fn take(material: &Material, quantity: &Quantity) -> Result<Quantity, LifecycleError> {
    material.remaining_quantity.checked_sub(quantity).ok_or_else(|| {
        LifecycleError::InsufficientQuantity {
            requested: quantity.clone(),
            available: material.remaining_quantity.clone(),
        }
    })
}
