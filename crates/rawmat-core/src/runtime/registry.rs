// crates/rawmat-core/src/runtime/registry.rs
// ============================================================================
// Module: Material Registry
// Description: Material identity, lookups, and the single material write path.
// Purpose: Own material rows and re-check row invariants before every write.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The registry is the only component that writes material rows. Creation
//! derives the material code and refuses duplicates; updates re-check the row
//! invariants of [`Material::check_invariants`] and rely on the store's
//! row-version check for optimistic concurrency.
//!
//! Read lookups go through [`MaterialRegistry`]; write helpers are free
//! functions that run inside the caller's transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::IdentityInputs;
use crate::core::Material;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::NewMaterialRecord;
use crate::core::decode_scan;
use crate::core::derive_material_code;
use crate::interfaces::MaterialFilter;
use crate::interfaces::MaterialStore;
use crate::interfaces::MaterialTx;
use crate::interfaces::StoreError;
use crate::runtime::error::LifecycleError;

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Derives the material code for a set of receipt attributes.
#[must_use]
pub fn derive_id(inputs: IdentityInputs<'_>) -> MaterialCode {
    derive_material_code(inputs)
}

// ============================================================================
// SECTION: Read Lookups
// ============================================================================

/// Read-only view over committed material rows.
pub struct MaterialRegistry<'a, S: ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: MaterialStore + ?Sized> MaterialRegistry<'a, S> {
    /// Creates a registry view over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Finds a material by internal key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when absent.
    pub fn find_by_id(&self, id: MaterialId) -> Result<Material, LifecycleError> {
        self.store.material(id)?.ok_or_else(|| not_found_id(id))
    }

    /// Finds a material by derived code.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when absent.
    pub fn find_by_code(&self, code: &MaterialCode) -> Result<Material, LifecycleError> {
        self.store
            .material_by_code(code)?
            .ok_or_else(|| LifecycleError::NotFound(format!("material {code}")))
    }

    /// Resolves raw QR scan input (JSON payload or bare code) to a material.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for unreadable input and
    /// [`LifecycleError::NotFound`] when no material matches.
    pub fn find_by_scan(&self, raw: &str) -> Result<Material, LifecycleError> {
        let code = decode_scan(raw)
            .ok_or_else(|| LifecycleError::Validation("unreadable scan payload".to_string()))?;
        self.find_by_code(&code)
    }

    /// Lists materials matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the read fails.
    pub fn list(&self, filter: &MaterialFilter) -> Result<Vec<Material>, LifecycleError> {
        Ok(self.store.materials(filter)?)
    }
}

// ============================================================================
// SECTION: Write Path
// ============================================================================

/// Inserts a new material, refusing duplicate codes.
///
/// # Errors
///
/// Returns [`LifecycleError::DuplicateMaterial`] when the derived code exists.
pub fn create(
    tx: &mut dyn MaterialTx,
    record: &NewMaterialRecord,
) -> Result<Material, LifecycleError> {
    if let Some(existing) = tx.material_by_code(&record.material_code)? {
        return Err(duplicate(&existing));
    }
    match tx.insert_material(record) {
        Ok(material) => Ok(material),
        Err(StoreError::Duplicate(_)) => match tx.material_by_code(&record.material_code)? {
            Some(existing) => Err(duplicate(&existing)),
            None => Err(LifecycleError::Conflict(format!(
                "material {} was inserted concurrently",
                record.material_code
            ))),
        },
        Err(err) => Err(err.into()),
    }
}

/// Loads a material for modification inside `tx`.
///
/// # Errors
///
/// Returns [`LifecycleError::NotFound`] when absent.
pub fn load_for_update(
    tx: &mut dyn MaterialTx,
    id: MaterialId,
) -> Result<Material, LifecycleError> {
    tx.material_for_update(id)?.ok_or_else(|| not_found_id(id))
}

/// Writes `next` as the successor of `previous` after re-checking invariants.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] when an invariant would break and
/// [`LifecycleError::Conflict`] when the row version moved.
pub fn update_fields(
    tx: &mut dyn MaterialTx,
    previous: &Material,
    next: &Material,
) -> Result<Material, LifecycleError> {
    if next.id != previous.id || next.version != previous.version {
        return Err(LifecycleError::Validation(
            "material update must target the loaded row version".to_string(),
        ));
    }
    next.check_invariants(previous)
        .map_err(|violation| LifecycleError::Validation(violation.describe().to_string()))?;
    Ok(tx.update_material(next)?)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a not-found error for an internal key.
fn not_found_id(id: MaterialId) -> LifecycleError {
    LifecycleError::NotFound(format!("material id {id}"))
}

/// Builds a duplicate error for an existing row.
fn duplicate(existing: &Material) -> LifecycleError {
    LifecycleError::DuplicateMaterial {
        code: existing.material_code.clone(),
        existing_id: existing.id,
    }
}
