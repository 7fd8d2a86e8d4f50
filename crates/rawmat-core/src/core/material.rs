// crates/rawmat-core/src/core/material.rs
// ============================================================================
// Module: Material Records
// Description: Canonical current-state record for a received container.
// Purpose: Define the material row and the invariants every write must keep.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Material`] is the current state of one received container. Rows are
//! created once and then mutated only through the registry write path; they
//! are never deleted. [`Material::check_invariants`] is the single statement
//! of the row-level rules the registry enforces before every write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::MaterialCode;
use crate::core::identifiers::MaterialId;
use crate::core::quantity::Quantity;
use crate::core::status::MaterialStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Material
// ============================================================================

/// Current state of a material container.
///
/// # Invariants
/// - `0 <= remaining_quantity <= received_total_quantity`.
/// - `received_total_quantity` never changes after creation.
/// - `status` only moves along [`MaterialStatus::can_transition_to`].
/// - `dispensed_quantity` never decreases.
/// - `status == DISPENSED` implies `remaining_quantity == 0`.
/// - `rack_number` is only written while the material is `APPROVED`.
/// - `version` increases by one on every committed update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Store-assigned internal key.
    pub id: MaterialId,
    /// Derived external code.
    pub material_code: MaterialCode,
    /// Item code.
    pub item_code: String,
    /// Item name.
    pub item_name: String,
    /// Supplier batch or lot number.
    pub batch_lot_number: String,
    /// Goods receipt note number.
    pub grn_number: String,
    /// Quantity received; immutable.
    pub received_total_quantity: Quantity,
    /// Quantity still on hand.
    pub remaining_quantity: Quantity,
    /// Quantity held by the received container.
    pub container_quantity: Quantity,
    /// Cumulative quantity issued through dispensing.
    pub dispensed_quantity: Quantity,
    /// Supplier name.
    pub supplier_name: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Receipt date.
    pub date_of_receipt: Date,
    /// Manufacture date, when known.
    pub mfg_date: Option<Date>,
    /// Expiry date, when known.
    pub exp_date: Option<Date>,
    /// Rack location, assigned after approval.
    pub rack_number: Option<String>,
    /// Current lifecycle status.
    pub status: MaterialStatus,
    /// Actor that registered the material.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
    /// Optimistic concurrency version.
    pub version: i64,
}

/// Row-level invariant violation detected before a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialInvariant {
    /// Remaining quantity exceeds the received total.
    RemainingExceedsReceived,
    /// A dispensed material still holds stock.
    DispensedWithStock,
    /// The received total was changed.
    ReceivedChanged,
    /// The rack was changed outside the approved state.
    RackOutsideApproved,
    /// The status moved backward or skipped a step.
    IllegalTransition,
    /// The cumulative dispensed quantity decreased.
    DispensedDecreased,
}

impl MaterialInvariant {
    /// Returns a human-readable description.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::RemainingExceedsReceived => "remaining quantity exceeds received total",
            Self::DispensedWithStock => "dispensed material must have zero remaining quantity",
            Self::ReceivedChanged => "received total quantity is immutable",
            Self::RackOutsideApproved => "rack number may only change while approved",
            Self::IllegalTransition => "material status may only move forward",
            Self::DispensedDecreased => "dispensed quantity must never decrease",
        }
    }
}

impl Material {
    /// Checks the row-level invariants of `self` as the successor of `previous`.
    ///
    /// # Errors
    ///
    /// Returns the first [`MaterialInvariant`] that `self` violates.
    pub fn check_invariants(&self, previous: &Self) -> Result<(), MaterialInvariant> {
        if self.received_total_quantity != previous.received_total_quantity {
            return Err(MaterialInvariant::ReceivedChanged);
        }
        if !previous.status.can_transition_to(self.status) {
            return Err(MaterialInvariant::IllegalTransition);
        }
        if self.dispensed_quantity < previous.dispensed_quantity {
            return Err(MaterialInvariant::DispensedDecreased);
        }
        self.check_bounds()?;
        if self.rack_number != previous.rack_number
            && previous.status != MaterialStatus::Approved
        {
            return Err(MaterialInvariant::RackOutsideApproved);
        }
        Ok(())
    }

    /// Checks the quantity bounds and the dispensed-status rule.
    ///
    /// # Errors
    ///
    /// Returns the first [`MaterialInvariant`] that `self` violates.
    pub fn check_bounds(&self) -> Result<(), MaterialInvariant> {
        if self.remaining_quantity > self.received_total_quantity {
            return Err(MaterialInvariant::RemainingExceedsReceived);
        }
        if self.status == MaterialStatus::Dispensed && !self.remaining_quantity.is_zero() {
            return Err(MaterialInvariant::DispensedWithStock);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: New Material
// ============================================================================

/// Fully resolved row handed to the store on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaterialRecord {
    /// Derived external code.
    pub material_code: MaterialCode,
    /// Item code.
    pub item_code: String,
    /// Item name.
    pub item_name: String,
    /// Supplier batch or lot number.
    pub batch_lot_number: String,
    /// Goods receipt note number.
    pub grn_number: String,
    /// Quantity received.
    pub received_total_quantity: Quantity,
    /// Quantity held by the received container.
    pub container_quantity: Quantity,
    /// Supplier name.
    pub supplier_name: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Receipt date.
    pub date_of_receipt: Date,
    /// Manufacture date, when known.
    pub mfg_date: Option<Date>,
    /// Expiry date, when known.
    pub exp_date: Option<Date>,
    /// Registering actor.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl NewMaterialRecord {
    /// Materializes the row with its store-assigned key.
    ///
    /// New rows start in quarantine with the full received quantity on hand.
    #[must_use]
    pub fn into_material(self, id: MaterialId) -> Material {
        Material {
            id,
            material_code: self.material_code,
            item_code: self.item_code,
            item_name: self.item_name,
            batch_lot_number: self.batch_lot_number,
            grn_number: self.grn_number,
            remaining_quantity: self.received_total_quantity.clone(),
            received_total_quantity: self.received_total_quantity,
            container_quantity: self.container_quantity,
            dispensed_quantity: Quantity::zero(),
            supplier_name: self.supplier_name,
            manufacturer_name: self.manufacturer_name,
            date_of_receipt: self.date_of_receipt,
            mfg_date: self.mfg_date,
            exp_date: self.exp_date,
            rack_number: None,
            status: MaterialStatus::Quarantine,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}
