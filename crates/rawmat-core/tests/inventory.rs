// crates/rawmat-core/tests/inventory.rs
// ============================================================================
// Module: Inventory Movement Tests
// Description: Inward and outward stock movements against the ledger.
// Purpose: Validate movement records, audit comments, and quantity bounds.
// Dependencies: rawmat-core, time
// ============================================================================
//! ## Overview
//! Movements adjust remaining quantity without changing status, write an
//! inventory transaction and a `COMMENT` audit entry in the same unit, and
//! respect `0 <= remaining <= received`.

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

use common::approved_material;
use common::memory_engine;
use common::operator;
use common::qty;
use common::receipt;
use common::viewer;
use rawmat_core::ActionKind;
use rawmat_core::DispenseRequest;
use rawmat_core::InventoryMovementRequest;
use rawmat_core::LifecycleError;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStatus;
use rawmat_core::Permission;
use rawmat_core::RejectRequest;
use rawmat_core::SamplingRequest;
use rawmat_core::TransactionDirection;
use time::macros::date;

fn movement(material_id: MaterialId, quantity: &str, remarks: Option<&str>) -> InventoryMovementRequest {
    InventoryMovementRequest {
        material_id,
        quantity: qty(quantity),
        transaction_date: date!(2024 - 06 - 01),
        remarks: remarks.map(str::to_string),
    }
}

#[test]
fn outward_then_inward_adjusts_remaining_and_keeps_status() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let id = engine.create_material(&actor, receipt("GRN-I1", "100")).unwrap().material.id;

    let outward = engine.record_outward(&actor, movement(id, "10", Some("Damaged drum"))).unwrap();
    assert_eq!(outward.material.remaining_quantity, qty("90"));
    assert_eq!(outward.material.status, MaterialStatus::Quarantine);
    assert_eq!(outward.transaction.direction, TransactionDirection::Outward);
    assert_eq!(outward.transaction.remarks.as_deref(), Some("Damaged drum"));

    let inward = engine.record_inward(&actor, movement(id, "4", None)).unwrap();
    assert_eq!(inward.material.remaining_quantity, qty("94"));
    assert_eq!(inward.material.received_total_quantity, qty("100"));

    let transactions = engine.transactions(id).unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].id, outward.transaction.id);
    assert_eq!(transactions[1].direction, TransactionDirection::Inward);

    let replay = engine.replay(id).unwrap();
    assert_eq!(replay.len(), 3);
    assert_eq!(replay[1].action, ActionKind::Comment);
    assert_eq!(replay[1].from_status, Some(MaterialStatus::Quarantine));
    assert_eq!(replay[1].to_status, MaterialStatus::Quarantine);
    assert_eq!(replay[1].comment, "Inventory outward: 10 units. Damaged drum");
    assert_eq!(replay[2].comment, "Inventory inward: 4 units.");
    engine.audit().verify(id).unwrap();
}

#[test]
fn outward_beyond_remaining_is_rejected_without_side_effects() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let id = engine.create_material(&actor, receipt("GRN-I2", "5")).unwrap().material.id;

    let err = engine.record_outward(&actor, movement(id, "5.5", None)).unwrap_err();
    assert_eq!(
        err,
        LifecycleError::InsufficientQuantity { requested: qty("5.5"), available: qty("5") }
    );
    assert!(engine.transactions(id).unwrap().is_empty());
    assert_eq!(engine.history(id).unwrap().len(), 1);
}

#[test]
fn inward_cannot_exceed_received_total() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let id = engine.create_material(&actor, receipt("GRN-I3", "20")).unwrap().material.id;
    engine.record_outward(&actor, movement(id, "2", None)).unwrap();

    let err = engine.record_inward(&actor, movement(id, "3", None)).unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
    assert_eq!(engine.find_by_id(id).unwrap().remaining_quantity, qty("18"));

    let restored = engine.record_inward(&actor, movement(id, "2", None)).unwrap();
    assert_eq!(restored.material.remaining_quantity, qty("20"));
}

#[test]
fn zero_quantity_movement_is_invalid() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let id = engine.create_material(&actor, receipt("GRN-I4", "20")).unwrap().material.id;
    let err = engine.record_outward(&actor, movement(id, "0", None)).unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
}

#[test]
fn outward_to_zero_keeps_approved_status() {
    let (engine, _) = memory_engine();
    let material = approved_material(&engine, receipt("GRN-I5", "8"));
    let outcome = engine.record_outward(&operator(), movement(material.id, "8", None)).unwrap();
    assert!(outcome.material.remaining_quantity.is_zero());
    assert_eq!(outcome.material.status, MaterialStatus::Approved);
    assert!(engine.list_available(None, None).unwrap().is_empty());
}

#[test]
fn dispensed_materials_refuse_movements() {
    let (engine, _) = memory_engine();
    let actor = operator();

    let drained = approved_material(&engine, receipt("GRN-I6", "3"));
    engine
        .dispense(
            &actor,
            DispenseRequest {
                material_id: drained.id,
                issued_quantity: qty("3"),
                issued_to_product_batch: "PB-9".to_string(),
                method: None,
                comment: None,
            },
        )
        .unwrap();
    let err = engine.record_outward(&actor, movement(drained.id, "1", None)).unwrap_err();
    assert_eq!(
        err,
        LifecycleError::InvalidTransition {
            current: MaterialStatus::Dispensed,
            action: ActionKind::Comment,
        }
    );

    let rejected = engine.create_material(&actor, receipt("GRN-I7", "10")).unwrap().material.id;
    engine.move_to_under_test(&actor, SamplingRequest { material_id: rejected, comment: None }).unwrap();
    engine
        .reject(
            &actor,
            RejectRequest {
                material_id: rejected,
                rejection_reason: Some("Assay out of range".to_string()),
                comment: None,
            },
        )
        .unwrap();
    let returned = engine.record_outward(&actor, movement(rejected, "10", Some("Returned"))).unwrap();
    assert_eq!(returned.material.status, MaterialStatus::Rejected);
    assert!(returned.material.remaining_quantity.is_zero());
}

#[test]
fn rejected_materials_accept_inward_movements() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let id = engine.create_material(&actor, receipt("GRN-I9", "100")).unwrap().material.id;
    engine.record_outward(&actor, movement(id, "10", None)).unwrap();
    engine.move_to_under_test(&actor, SamplingRequest { material_id: id, comment: None }).unwrap();
    engine
        .reject(
            &actor,
            RejectRequest {
                material_id: id,
                rejection_reason: Some("Moisture above limit".to_string()),
                comment: None,
            },
        )
        .unwrap();

    let inward = engine.record_inward(&actor, movement(id, "5", None)).unwrap();
    assert_eq!(inward.material.status, MaterialStatus::Rejected);
    assert_eq!(inward.material.remaining_quantity, qty("95"));
    assert_eq!(inward.transaction.direction, TransactionDirection::Inward);
    assert_eq!(engine.transactions(id).unwrap().len(), 2);
}

#[test]
fn viewers_cannot_move_stock() {
    let (engine, _) = memory_engine();
    let id = engine.create_material(&operator(), receipt("GRN-I8", "10")).unwrap().material.id;
    let err = engine.record_inward(&viewer(), movement(id, "1", None)).unwrap_err();
    assert_eq!(err, LifecycleError::PermissionDenied(Permission::ManageInventory));
}

#[test]
fn transactions_of_unknown_material_are_not_found() {
    let (engine, _) = memory_engine();
    let err = engine.transactions(MaterialId::new(404)).unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}
