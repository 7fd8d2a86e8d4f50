// crates/rawmat-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ledger Interfaces
// Description: Storage traits implemented by ledger backends.
// Purpose: Keep the lifecycle runtime independent of the persistence engine.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The runtime talks to storage exclusively through [`MaterialStore`] and the
//! transactional [`MaterialTx`] units it hands out. A transaction is scoped:
//! it becomes durable only through [`MaterialTx::commit`], and dropping it on
//! any other path rolls back every staged write.
//!
//! Security posture: stores are trusted to enforce row-version checks and
//! uniqueness of material codes; violations surface as typed errors, never as
//! silent overwrites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ActorId;
use crate::core::ActorProfile;
use crate::core::HistoryId;
use crate::core::HistoryRecord;
use crate::core::InventoryTransaction;
use crate::core::Material;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::MaterialStatus;
use crate::core::NewHistoryEntry;
use crate::core::NewInventoryTransaction;
use crate::core::NewMaterialRecord;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Material store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("material store io error: {0}")]
    Io(String),
    /// Backend database error.
    #[error("material store db error: {0}")]
    Db(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("material store corruption: {0}")]
    Corrupt(String),
    /// Stored schema version is incompatible.
    #[error("material store version mismatch: {0}")]
    VersionMismatch(String),
    /// Data handed to the store is invalid.
    #[error("material store invalid data: {0}")]
    Invalid(String),
    /// A concurrent writer changed the row or held the write lock.
    #[error("material store conflict: {0}")]
    Conflict(String),
    /// A unique key already exists.
    #[error("material store duplicate key: {0}")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Filter applied to material listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialFilter {
    /// Only materials in this status.
    pub status: Option<MaterialStatus>,
    /// Only materials with this item code.
    pub item_code: Option<String>,
}

impl MaterialFilter {
    /// Returns true when `material` passes the filter.
    #[must_use]
    pub fn matches(&self, material: &Material) -> bool {
        self.status.is_none_or(|status| material.status == status)
            && self.item_code.as_deref().is_none_or(|code| material.item_code == code)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Persistent material store.
///
/// Read methods observe committed state only.
pub trait MaterialStore: Send + Sync {
    /// Opens a scoped read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the write lock cannot be taken and
    /// [`StoreError`] for other backend failures.
    fn begin(&self) -> Result<Box<dyn MaterialTx + '_>, StoreError>;

    /// Loads a material by internal key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError>;

    /// Loads a material by derived code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn material_by_code(&self, code: &MaterialCode) -> Result<Option<Material>, StoreError>;

    /// Lists materials matching `filter`, ordered by internal key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, StoreError>;

    /// Returns the audit trail of a material oldest first, joined with stored
    /// actor profiles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Returns the inventory movements of a material oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn transactions(&self, id: MaterialId) -> Result<Vec<InventoryTransaction>, StoreError>;

    /// Inserts or replaces an actor profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn upsert_actor(&self, profile: &ActorProfile) -> Result<(), StoreError>;

    /// Loads an actor profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn actor(&self, id: &ActorId) -> Result<Option<ActorProfile>, StoreError>;
}

/// Scoped read-write unit of work.
///
/// # Invariants
/// - Writes are invisible to other readers until [`MaterialTx::commit`].
/// - Dropping an uncommitted transaction rolls back all of its writes.
pub trait MaterialTx {
    /// Loads a material for modification inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn material_for_update(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError>;

    /// Loads a material by derived code inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn material_by_code(&mut self, code: &MaterialCode) -> Result<Option<Material>, StoreError>;

    /// Inserts a new material row and returns it with its assigned key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the code already exists.
    fn insert_material(&mut self, record: &NewMaterialRecord) -> Result<Material, StoreError>;

    /// Writes `material` if the stored version still equals `material.version`.
    ///
    /// Returns the stored row with its incremented version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the stored version moved.
    fn update_material(&mut self, material: &Material) -> Result<Material, StoreError>;

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryId, StoreError>;

    /// Appends an inventory movement.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_transaction(
        &mut self,
        transaction: &NewInventoryTransaction,
    ) -> Result<InventoryTransaction, StoreError>;

    /// Makes every staged write durable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the commit fails; the transaction is rolled
    /// back in that case.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
