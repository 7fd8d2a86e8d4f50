// crates/rawmat-core/tests/atomicity.rs
// ============================================================================
// Module: Atomicity Tests
// Description: Rollback, conflict retry, and concurrent dispense coverage.
// Purpose: Ensure mutations and audit entries commit together or not at all.
// Dependencies: rawmat-core
// ============================================================================
//! ## Overview
//! Wraps the in-memory store with fault-injecting transactions to prove that
//! an audit write failure rolls back the material change, that write conflicts
//! are retried from a fresh read, and that concurrent dispenses never
//! over-issue.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;

use common::approved_material;
use common::engine_over;
use common::operator;
use common::qty;
use common::receipt;
use rawmat_core::ActorId;
use rawmat_core::ActorProfile;
use rawmat_core::DispenseRequest;
use rawmat_core::HistoryId;
use rawmat_core::HistoryRecord;
use rawmat_core::InMemoryMaterialStore;
use rawmat_core::InventoryTransaction;
use rawmat_core::LifecycleError;
use rawmat_core::Material;
use rawmat_core::MaterialCode;
use rawmat_core::MaterialFilter;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStatus;
use rawmat_core::MaterialStore;
use rawmat_core::MaterialTx;
use rawmat_core::NewHistoryEntry;
use rawmat_core::NewInventoryTransaction;
use rawmat_core::NewMaterialRecord;
use rawmat_core::SamplingRequest;
use rawmat_core::StoreError;
use rawmat_core::runtime::registry;
use rawmat_core::runtime::run_atomic;

// ============================================================================
// SECTION: Fault Injection
// ============================================================================

/// Store wrapper whose transactions can fail audit writes or report conflicts.
#[derive(Clone, Default)]
struct FaultyStore {
    inner: InMemoryMaterialStore,
    fail_history: Arc<AtomicBool>,
    conflicts_left: Arc<AtomicU32>,
}

struct FaultyTx<'a> {
    inner: Box<dyn MaterialTx + 'a>,
    fail_history: bool,
    conflict: bool,
}

impl MaterialStore for FaultyStore {
    fn begin(&self) -> Result<Box<dyn MaterialTx + '_>, StoreError> {
        let conflict = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin()?,
            fail_history: self.fail_history.load(Ordering::SeqCst),
            conflict,
        }))
    }

    fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        self.inner.material(id)
    }

    fn material_by_code(&self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        self.inner.material_by_code(code)
    }

    fn materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, StoreError> {
        self.inner.materials(filter)
    }

    fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, StoreError> {
        self.inner.history(id)
    }

    fn transactions(&self, id: MaterialId) -> Result<Vec<InventoryTransaction>, StoreError> {
        self.inner.transactions(id)
    }

    fn upsert_actor(&self, profile: &ActorProfile) -> Result<(), StoreError> {
        self.inner.upsert_actor(profile)
    }

    fn actor(&self, id: &ActorId) -> Result<Option<ActorProfile>, StoreError> {
        self.inner.actor(id)
    }
}

impl MaterialTx for FaultyTx<'_> {
    fn material_for_update(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        self.inner.material_for_update(id)
    }

    fn material_by_code(&mut self, code: &MaterialCode) -> Result<Option<Material>, StoreError> {
        self.inner.material_by_code(code)
    }

    fn insert_material(&mut self, record: &NewMaterialRecord) -> Result<Material, StoreError> {
        self.inner.insert_material(record)
    }

    fn update_material(&mut self, material: &Material) -> Result<Material, StoreError> {
        if self.conflict {
            return Err(StoreError::Conflict("injected version race".to_string()));
        }
        self.inner.update_material(material)
    }

    fn insert_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryId, StoreError> {
        if self.fail_history {
            return Err(StoreError::Io("injected audit failure".to_string()));
        }
        self.inner.insert_history(entry)
    }

    fn insert_transaction(
        &mut self,
        transaction: &NewInventoryTransaction,
    ) -> Result<InventoryTransaction, StoreError> {
        self.inner.insert_transaction(transaction)
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn audit_failure_rolls_back_the_mutation() {
    let store = FaultyStore::default();
    let (engine, _) = engine_over(store.clone());
    let material = approved_material(&engine, receipt("GRN-A1", "40"));

    store.fail_history.store(true, Ordering::SeqCst);
    let err = engine
        .dispense(
            &operator(),
            DispenseRequest {
                material_id: material.id,
                issued_quantity: qty("10"),
                issued_to_product_batch: "PB-1".to_string(),
                method: None,
                comment: None,
            },
        )
        .unwrap_err();
    assert_eq!(err, LifecycleError::Store(StoreError::Io("injected audit failure".to_string())));

    let stored = engine.find_by_id(material.id).unwrap();
    assert_eq!(stored.remaining_quantity, qty("40"));
    assert!(stored.dispensed_quantity.is_zero());
    assert_eq!(stored.version, material.version);
    assert_eq!(engine.history(material.id).unwrap().len(), 3);
}

#[test]
fn audit_failure_rolls_back_creation() {
    let store = FaultyStore::default();
    store.fail_history.store(true, Ordering::SeqCst);
    let (engine, _) = engine_over(store);
    let err = engine.create_material(&operator(), receipt("GRN-A2", "1")).unwrap_err();
    assert!(matches!(err, LifecycleError::Store(_)));
    assert!(engine.registry().list(&MaterialFilter::default()).unwrap().is_empty());
}

#[test]
fn conflicts_are_retried_from_a_fresh_read() {
    let store = FaultyStore::default();
    let (engine, _) = engine_over(store.clone());
    let id = engine.create_material(&operator(), receipt("GRN-A3", "5")).unwrap().material.id;

    store.conflicts_left.store(2, Ordering::SeqCst);
    let outcome = engine
        .move_to_under_test(&operator(), SamplingRequest { material_id: id, comment: None })
        .unwrap();
    assert_eq!(outcome.material.status, MaterialStatus::UnderTest);
    assert_eq!(engine.history(id).unwrap().len(), 2);
}

#[test]
fn conflicts_surface_after_retries_are_exhausted() {
    let store = FaultyStore::default();
    let (engine, _) = engine_over(store.clone());
    let id = engine.create_material(&operator(), receipt("GRN-A4", "5")).unwrap().material.id;

    store.conflicts_left.store(10, Ordering::SeqCst);
    let err = engine
        .move_to_under_test(&operator(), SamplingRequest { material_id: id, comment: None })
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert_eq!(engine.find_by_id(id).unwrap().status, MaterialStatus::Quarantine);
    assert_eq!(engine.history(id).unwrap().len(), 1);
}

#[test]
fn concurrent_dispenses_never_exceed_remaining() {
    let (engine, _) = engine_over(InMemoryMaterialStore::new());
    let material = approved_material(&engine, receipt("GRN-A5", "100"));
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0 .. 2)
        .map(|index| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.dispense(
                    &operator(),
                    DispenseRequest {
                        material_id: material.id,
                        issued_quantity: qty("60"),
                        issued_to_product_batch: format!("PB-{index}"),
                        method: None,
                        comment: None,
                    },
                )
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|result| matches!(
        result,
        Err(LifecycleError::InsufficientQuantity { .. })
    )));
    let stored = engine.find_by_id(material.id).unwrap();
    assert_eq!(stored.remaining_quantity, qty("40"));
    assert_eq!(stored.dispensed_quantity, qty("60"));
}

#[test]
fn write_path_refuses_backward_status_and_quantity_loss() {
    let (engine, _) = engine_over(InMemoryMaterialStore::new());
    let material = approved_material(&engine, receipt("GRN-A6", "100"));

    let err = run_atomic(engine.store(), 0, "test", |tx| {
        let previous = registry::load_for_update(tx, material.id)?;
        let mut next = previous.clone();
        next.status = MaterialStatus::Quarantine;
        next.remaining_quantity = qty("50");
        registry::update_fields(tx, &previous, &next)
    })
    .unwrap_err();
    assert_eq!(
        err,
        LifecycleError::Validation("material status may only move forward".to_string())
    );

    let stored = engine.find_by_id(material.id).unwrap();
    assert_eq!(stored.status, MaterialStatus::Approved);
    assert_eq!(stored.remaining_quantity, qty("100"));
    assert_eq!(stored.version, material.version);
}

#[test]
fn write_path_refuses_a_shrinking_dispensed_total() {
    let (engine, _) = engine_over(InMemoryMaterialStore::new());
    let material = approved_material(&engine, receipt("GRN-A7", "100"));
    engine
        .dispense(
            &operator(),
            DispenseRequest {
                material_id: material.id,
                issued_quantity: qty("30"),
                issued_to_product_batch: "PB-9".to_string(),
                method: None,
                comment: None,
            },
        )
        .unwrap();

    let err = run_atomic(engine.store(), 0, "test", |tx| {
        let previous = registry::load_for_update(tx, material.id)?;
        let mut next = previous.clone();
        next.dispensed_quantity = qty("10");
        registry::update_fields(tx, &previous, &next)
    })
    .unwrap_err();
    assert_eq!(
        err,
        LifecycleError::Validation("dispensed quantity must never decrease".to_string())
    );
    assert_eq!(engine.find_by_id(material.id).unwrap().dispensed_quantity, qty("30"));
}

#[test]
fn status_transitions_only_move_forward() {
    use MaterialStatus::Approved;
    use MaterialStatus::Dispensed;
    use MaterialStatus::Quarantine;
    use MaterialStatus::Rejected;
    use MaterialStatus::UnderTest;

    let allowed = [
        (Quarantine, UnderTest),
        (UnderTest, Approved),
        (UnderTest, Rejected),
        (Approved, Dispensed),
    ];
    let all = [Quarantine, UnderTest, Approved, Rejected, Dispensed];
    for from in all {
        for to in all {
            let expected = from == to || allowed.contains(&(from, to));
            assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
        }
    }
}
