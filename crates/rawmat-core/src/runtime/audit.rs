// crates/rawmat-core/src/runtime/audit.rs
// ============================================================================
// Module: Audit Recorder
// Description: Append-only status history writes, reads, and replay checks.
// Purpose: Make every material mutation traceable and verifiable.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! [`record`] appends one entry inside the caller's transaction, so an audit
//! write failure aborts and rolls back the mutation it describes. Reads come
//! in two orders: [`AuditRecorder::history`] is newest first for display and
//! [`AuditRecorder::replay`] is oldest first for reconstruction.
//!
//! [`verify_continuity`] checks that a replayed trail is a valid walk of the
//! lifecycle: it starts with a creation entry and every entry's from-status
//! equals the previous entry's to-status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ActionKind;
use crate::core::HistoryId;
use crate::core::HistoryRecord;
use crate::core::MaterialId;
use crate::core::MaterialStatus;
use crate::core::NewHistoryEntry;
use crate::core::StatusHistoryEntry;
use crate::interfaces::MaterialStore;
use crate::interfaces::MaterialTx;
use crate::interfaces::StoreError;
use crate::runtime::error::LifecycleError;

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Appends `entry` inside `tx`.
///
/// # Errors
///
/// Returns [`LifecycleError::Store`] when the insert fails.
pub fn record(
    tx: &mut dyn MaterialTx,
    entry: &NewHistoryEntry,
) -> Result<HistoryId, LifecycleError> {
    Ok(tx.insert_history(entry)?)
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Read access to the audit trail of committed materials.
pub struct AuditRecorder<'a, S: ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: MaterialStore + ?Sized> AuditRecorder<'a, S> {
    /// Creates a recorder view over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns the enriched trail of a material, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material.
    pub fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, LifecycleError> {
        self.ensure_exists(id)?;
        let mut records = self.store.history(id)?;
        records.sort_by(|a, b| {
            b.entry.timestamp.cmp(&a.entry.timestamp).then_with(|| b.entry.id.cmp(&a.entry.id))
        });
        Ok(records)
    }

    /// Returns the raw trail of a material, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material.
    pub fn replay(&self, id: MaterialId) -> Result<Vec<StatusHistoryEntry>, LifecycleError> {
        self.ensure_exists(id)?;
        let mut entries: Vec<StatusHistoryEntry> =
            self.store.history(id)?.into_iter().map(|record| record.entry).collect();
        entries.sort_by_key(|entry| entry.id);
        Ok(entries)
    }

    /// Replays a material's trail and checks it against the stored status.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material and
    /// [`LifecycleError::Store`] wrapping a corruption report when the trail
    /// is inconsistent.
    pub fn verify(&self, id: MaterialId) -> Result<(), LifecycleError> {
        let material = self.store.material(id)?.ok_or_else(|| not_found(id))?;
        let entries = self.replay(id)?;
        let corrupt = |err: ContinuityError| {
            LifecycleError::Store(StoreError::Corrupt(format!("material {id}: {err}")))
        };
        let last = verify_continuity(&entries).map_err(corrupt)?;
        if last != material.status {
            return Err(corrupt(ContinuityError::StatusMismatch {
                replayed: last,
                stored: material.status,
            }));
        }
        Ok(())
    }

    /// Fails with not-found when the material does not exist.
    fn ensure_exists(&self, id: MaterialId) -> Result<(), LifecycleError> {
        match self.store.material(id)? {
            Some(_) => Ok(()),
            None => Err(not_found(id)),
        }
    }
}

/// Builds a not-found error for an internal key.
fn not_found(id: MaterialId) -> LifecycleError {
    LifecycleError::NotFound(format!("material id {id}"))
}

// ============================================================================
// SECTION: Continuity
// ============================================================================

/// Audit trail continuity failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinuityError {
    /// Trail has no entries.
    #[error("audit trail is empty")]
    Empty,
    /// First entry is not a creation entry.
    #[error("audit trail does not start with a creation entry")]
    MissingCreation,
    /// An entry does not continue from its predecessor.
    #[error("audit entry {entry} starts from {found:?}, expected {expected}")]
    Broken {
        /// Offending entry.
        entry: HistoryId,
        /// Status the previous entry ended in.
        expected: MaterialStatus,
        /// Status the entry claims to start from.
        found: Option<MaterialStatus>,
    },
    /// Replayed status differs from the stored row.
    #[error("replayed status {replayed} does not match stored status {stored}")]
    StatusMismatch {
        /// Status reached by replay.
        replayed: MaterialStatus,
        /// Status stored on the row.
        stored: MaterialStatus,
    },
}

/// Verifies an oldest-first trail and returns the status it ends in.
///
/// # Errors
///
/// Returns [`ContinuityError`] describing the first discontinuity.
pub fn verify_continuity(entries: &[StatusHistoryEntry]) -> Result<MaterialStatus, ContinuityError> {
    let (first, rest) = entries.split_first().ok_or(ContinuityError::Empty)?;
    if first.action != ActionKind::Created || first.from_status.is_some() {
        return Err(ContinuityError::MissingCreation);
    }
    let mut current = first.to_status;
    for entry in rest {
        if entry.from_status != Some(current) {
            return Err(ContinuityError::Broken {
                entry: entry.id,
                expected: current,
                found: entry.from_status,
            });
        }
        current = entry.to_status;
    }
    Ok(current)
}
