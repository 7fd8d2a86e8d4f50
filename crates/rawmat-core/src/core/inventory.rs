// crates/rawmat-core/src/core/inventory.rs
// ============================================================================
// Module: Inventory Transactions
// Description: Inward and outward stock movement records.
// Purpose: Record quantity movements that happen outside dispensing.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Inventory transactions are append-only. Each one is written in the same
//! store transaction as the remaining-quantity change it describes and the
//! matching `COMMENT` audit entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::MaterialId;
use crate::core::identifiers::TransactionId;
use crate::core::quantity::Quantity;
use crate::core::status::TransactionDirection;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Transactions
// ============================================================================

/// Movement ready to be appended, before the store assigns its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventoryTransaction {
    /// Material moved.
    pub material_id: MaterialId,
    /// Movement direction.
    pub direction: TransactionDirection,
    /// Quantity moved; strictly positive.
    pub quantity: Quantity,
    /// Business date of the movement.
    pub transaction_date: Date,
    /// Actor that recorded the movement.
    pub performed_by: ActorId,
    /// Optional remarks.
    pub remarks: Option<String>,
    /// Server-assigned timestamp.
    pub recorded_at: Timestamp,
}

impl NewInventoryTransaction {
    /// Materializes the movement with its store-assigned key.
    #[must_use]
    pub fn into_transaction(self, id: TransactionId) -> InventoryTransaction {
        InventoryTransaction {
            id,
            material_id: self.material_id,
            direction: self.direction,
            quantity: self.quantity,
            transaction_date: self.transaction_date,
            performed_by: self.performed_by,
            remarks: self.remarks,
            recorded_at: self.recorded_at,
        }
    }
}

/// Stored inventory movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    /// Store-assigned key.
    pub id: TransactionId,
    /// Material moved.
    pub material_id: MaterialId,
    /// Movement direction.
    pub direction: TransactionDirection,
    /// Quantity moved.
    pub quantity: Quantity,
    /// Business date of the movement.
    pub transaction_date: Date,
    /// Recording actor.
    pub performed_by: ActorId,
    /// Optional remarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Server-assigned timestamp.
    pub recorded_at: Timestamp,
}
