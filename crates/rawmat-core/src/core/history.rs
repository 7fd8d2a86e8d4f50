// crates/rawmat-core/src/core/history.rs
// ============================================================================
// Module: Status History
// Description: Immutable audit entries recorded for every material mutation.
// Purpose: Define the audit record shapes written and read by the recorder.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Each committed mutation appends exactly one [`StatusHistoryEntry`]. Entries
//! are never updated or deleted. Reads return [`HistoryRecord`] values, which
//! join the stored actor profile (when one exists) at read time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::core::actor::Role;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::HistoryId;
use crate::core::identifiers::MaterialId;
use crate::core::quantity::Quantity;
use crate::core::status::ActionKind;
use crate::core::status::DispensingMethod;
use crate::core::status::MaterialStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Audit entry ready to be appended, before the store assigns its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    /// Material the entry belongs to.
    pub material_id: MaterialId,
    /// Status before the mutation; `None` only for creation.
    pub from_status: Option<MaterialStatus>,
    /// Status after the mutation.
    pub to_status: MaterialStatus,
    /// Kind of mutation.
    pub action: ActionKind,
    /// Actor that performed the mutation.
    pub performed_by: ActorId,
    /// Free-text comment.
    pub comment: String,
    /// Rejection reason for QC rejections.
    pub rejection_reason: Option<String>,
    /// Sampling instant for sampling entries.
    pub sampling_date: Option<Timestamp>,
    /// Retest date recorded at approval.
    pub retest_date: Option<Date>,
    /// Product batch the material was dispensed to.
    pub issued_to_product_batch: Option<String>,
    /// Quantity issued by a dispense.
    pub dispensed_quantity: Option<Quantity>,
    /// Ordering policy that guided the dispense.
    pub dispensing_method: Option<DispensingMethod>,
    /// Server-assigned timestamp.
    pub timestamp: Timestamp,
}

impl NewHistoryEntry {
    /// Materializes the entry with its store-assigned key.
    #[must_use]
    pub fn into_entry(self, id: HistoryId) -> StatusHistoryEntry {
        StatusHistoryEntry {
            id,
            material_id: self.material_id,
            from_status: self.from_status,
            to_status: self.to_status,
            action: self.action,
            performed_by: self.performed_by,
            comment: self.comment,
            rejection_reason: self.rejection_reason,
            sampling_date: self.sampling_date,
            retest_date: self.retest_date,
            issued_to_product_batch: self.issued_to_product_batch,
            dispensed_quantity: self.dispensed_quantity,
            dispensing_method: self.dispensing_method,
            timestamp: self.timestamp,
        }
    }
}

/// Stored, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    /// Store-assigned key; increases with insertion order.
    pub id: HistoryId,
    /// Material the entry belongs to.
    pub material_id: MaterialId,
    /// Status before the mutation.
    pub from_status: Option<MaterialStatus>,
    /// Status after the mutation.
    pub to_status: MaterialStatus,
    /// Kind of mutation.
    pub action: ActionKind,
    /// Actor that performed the mutation.
    pub performed_by: ActorId,
    /// Free-text comment.
    pub comment: String,
    /// Rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Sampling instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_date: Option<Timestamp>,
    /// Retest date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retest_date: Option<Date>,
    /// Dispense target batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_to_product_batch: Option<String>,
    /// Dispensed quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispensed_quantity: Option<Quantity>,
    /// Dispensing method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispensing_method: Option<DispensingMethod>,
    /// Server-assigned timestamp.
    pub timestamp: Timestamp,
}

// ============================================================================
// SECTION: Enriched Reads
// ============================================================================

/// History entry joined with the performing actor's profile.
///
/// Enrichment fields are `None` when no profile is stored for the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Stored entry.
    #[serde(flatten)]
    pub entry: StatusHistoryEntry,
    /// Actor display name.
    pub performed_by_name: Option<String>,
    /// Actor username.
    pub performed_by_username: Option<String>,
    /// Actor role.
    pub performed_by_role: Option<Role>,
}
