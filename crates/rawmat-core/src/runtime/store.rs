// crates/rawmat-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Material Store
// Description: Mutex-guarded material store with staged transactions.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryMaterialStore`] implements [`MaterialStore`] for tests and local
//! demos. A transaction holds the store mutex for its whole lifetime and works
//! on a staged copy of the state, so transactions are fully serialized and an
//! uncommitted transaction leaves no trace. It is not intended for production
//! use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::ActorId;
use crate::core::ActorProfile;
use crate::core::HistoryId;
use crate::core::HistoryRecord;
use crate::core::InventoryTransaction;
use crate::core::Material;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::NewHistoryEntry;
use crate::core::NewInventoryTransaction;
use crate::core::NewMaterialRecord;
use crate::core::StatusHistoryEntry;
use crate::core::TransactionId;
use crate::interfaces::MaterialFilter;
use crate::interfaces::MaterialStore;
use crate::interfaces::MaterialTx;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Complete store contents.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Materials keyed by internal id.
    materials: BTreeMap<MaterialId, Material>,
    /// Unique index from code to internal id.
    codes: BTreeMap<MaterialCode, MaterialId>,
    /// Audit entries in insertion order.
    history: Vec<StatusHistoryEntry>,
    /// Inventory movements in insertion order.
    transactions: Vec<InventoryTransaction>,
    /// Actor profiles.
    actors: BTreeMap<ActorId, ActorProfile>,
    /// Last assigned material key.
    last_material_id: i64,
    /// Last assigned history key.
    last_history_id: i64,
    /// Last assigned transaction key.
    last_transaction_id: i64,
}

impl MemoryState {
    /// Returns the audit trail of a material joined with actor profiles.
    fn history_records(&self, id: MaterialId) -> Vec<HistoryRecord> {
        self.history
            .iter()
            .filter(|entry| entry.material_id == id)
            .map(|entry| {
                let profile = self.actors.get(&entry.performed_by);
                HistoryRecord {
                    entry: entry.clone(),
                    performed_by_name: profile.map(|p| p.display_name.clone()),
                    performed_by_username: profile.map(|p| p.username.clone()),
                    performed_by_role: profile.map(|p| p.role),
                }
            })
            .collect()
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory material store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMaterialStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryMaterialStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Io("material store mutex poisoned".to_string()))
    }
}

impl MaterialStore for InMemoryMaterialStore {
    fn begin(&self) -> Result<Box<dyn MaterialTx + '_>, StoreError> {
        let guard = self.lock()?;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.lock()?.materials.get(&id).cloned())
    }

    fn material_by_code(&self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.codes.get(code).and_then(|id| guard.materials.get(id)).cloned())
    }

    fn materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.materials.values().filter(|material| filter.matches(material)).cloned().collect())
    }

    fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self.lock()?.history_records(id))
    }

    fn transactions(&self, id: MaterialId) -> Result<Vec<InventoryTransaction>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.transactions.iter().filter(|tx| tx.material_id == id).cloned().collect())
    }

    fn upsert_actor(&self, profile: &ActorProfile) -> Result<(), StoreError> {
        self.lock()?.actors.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn actor(&self, id: &ActorId) -> Result<Option<ActorProfile>, StoreError> {
        Ok(self.lock()?.actors.get(id).cloned())
    }
}

// ============================================================================
// SECTION: Transactions
// ============================================================================

/// Staged transaction over the in-memory state.
struct MemoryTx<'a> {
    /// Held store lock; serializes transactions.
    guard: MutexGuard<'a, MemoryState>,
    /// Working copy published on commit.
    staged: MemoryState,
}

impl MaterialTx for MemoryTx<'_> {
    fn material_for_update(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.staged.materials.get(&id).cloned())
    }

    fn material_by_code(&mut self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        Ok(self.staged.codes.get(code).and_then(|id| self.staged.materials.get(id)).cloned())
    }

    fn insert_material(&mut self, record: &NewMaterialRecord) -> Result<Material, StoreError> {
        if self.staged.codes.contains_key(&record.material_code) {
            return Err(StoreError::Duplicate(record.material_code.to_string()));
        }
        self.staged.last_material_id += 1;
        let id = MaterialId::new(self.staged.last_material_id);
        let material = record.clone().into_material(id);
        self.staged.codes.insert(material.material_code.clone(), id);
        self.staged.materials.insert(id, material.clone());
        Ok(material)
    }

    fn update_material(&mut self, material: &Material) -> Result<Material, StoreError> {
        let stored = self
            .staged
            .materials
            .get_mut(&material.id)
            .ok_or_else(|| StoreError::Invalid(format!("material {} does not exist", material.id)))?;
        if stored.version != material.version {
            return Err(StoreError::Conflict(format!(
                "material {} version moved from {} to {}",
                material.id, material.version, stored.version
            )));
        }
        if stored.material_code != material.material_code {
            return Err(StoreError::Invalid("material code is immutable".to_string()));
        }
        let mut next = material.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    fn insert_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryId, StoreError> {
        if !self.staged.materials.contains_key(&entry.material_id) {
            return Err(StoreError::Invalid(format!(
                "history references unknown material {}",
                entry.material_id
            )));
        }
        self.staged.last_history_id += 1;
        let id = HistoryId::new(self.staged.last_history_id);
        self.staged.history.push(entry.clone().into_entry(id));
        Ok(id)
    }

    fn insert_transaction(
        &mut self,
        transaction: &NewInventoryTransaction,
    ) -> Result<InventoryTransaction, StoreError> {
        if !self.staged.materials.contains_key(&transaction.material_id) {
            return Err(StoreError::Invalid(format!(
                "transaction references unknown material {}",
                transaction.material_id
            )));
        }
        self.staged.last_transaction_id += 1;
        let id = TransactionId::new(self.staged.last_transaction_id);
        let stored = transaction.clone().into_transaction(id);
        self.staged.transactions.push(stored.clone());
        Ok(stored)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
