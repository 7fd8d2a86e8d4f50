// crates/rawmat-core/tests/selector.rs
// ============================================================================
// Module: Dispensing Selector Tests
// Description: FIFO/FEFO lot ordering and expiry alert windows.
// Purpose: Ensure operators are pointed at the right lots to issue.
// Dependencies: rawmat-core, time
// ============================================================================
//! ## Overview
//! Builds a small warehouse of lots with distinct receipt and expiry dates and
//! checks availability filtering, both ordering policies, the configured
//! default policy, and the expiry alert window.

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

use common::TODAY;
use common::approved_material;
use common::memory_engine;
use common::operator;
use common::qty;
use common::receipt;
use rawmat_core::CreateMaterialRequest;
use rawmat_core::DispenseRequest;
use rawmat_core::DispensingMethod;
use rawmat_core::InMemoryMaterialStore;
use rawmat_core::LifecycleConfig;
use rawmat_core::LifecycleEngine;
use rawmat_core::ManualClock;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStatus;
use rawmat_core::MaterialStore;
use rawmat_core::RejectRequest;
use rawmat_core::SamplingRequest;
use time::Date;
use time::macros::date;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn lot(item: &str, grn: &str, received: Date, expiry: Option<Date>) -> CreateMaterialRequest {
    let mut request = receipt(grn, "50");
    request.item_code = item.to_string();
    request.date_of_receipt = received;
    request.exp_date = expiry;
    request
}

/// Approved lots: (L1, L2, L3, L4) with L4 under a different item code.
fn stocked<S: MaterialStore>(
    engine: &LifecycleEngine<S, ManualClock>,
) -> (MaterialId, MaterialId, MaterialId, MaterialId) {
    let l1 = approved_material(engine, lot("RM-001", "GRN-S1", date!(2024 - 05 - 20), Some(date!(2025 - 03 - 01))));
    let l2 = approved_material(engine, lot("RM-001", "GRN-S2", date!(2024 - 05 - 10), None));
    let l3 = approved_material(engine, lot("RM-001", "GRN-S3", date!(2024 - 05 - 25), Some(date!(2024 - 12 - 01))));
    let l4 = approved_material(engine, lot("RM-002", "GRN-S4", date!(2024 - 05 - 15), Some(date!(2024 - 12 - 01))));
    (l1.id, l2.id, l3.id, l4.id)
}

fn ids(lots: &[rawmat_core::Material]) -> Vec<MaterialId> {
    lots.iter().map(|material| material.id).collect()
}

// ============================================================================
// SECTION: Availability
// ============================================================================

#[test]
fn fefo_orders_by_expiry_with_undated_lots_last() {
    let (engine, _) = memory_engine();
    let (l1, l2, l3, _) = stocked(&engine);
    let lots = engine.list_available(Some("RM-001"), Some(DispensingMethod::Fefo)).unwrap();
    assert_eq!(ids(&lots), vec![l3, l1, l2]);
}

#[test]
fn fefo_breaks_expiry_ties_by_receipt() {
    let (engine, _) = memory_engine();
    let (l1, l2, l3, l4) = stocked(&engine);
    let lots = engine.list_available(None, Some(DispensingMethod::Fefo)).unwrap();
    assert_eq!(ids(&lots), vec![l4, l3, l1, l2]);
}

#[test]
fn fifo_orders_by_receipt() {
    let (engine, _) = memory_engine();
    let (l1, l2, l3, _) = stocked(&engine);
    let lots = engine.list_available(Some("RM-001"), Some(DispensingMethod::Fifo)).unwrap();
    assert_eq!(ids(&lots), vec![l2, l1, l3]);
}

#[test]
fn only_approved_lots_with_stock_are_available() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let (l1, l2, l3, _) = stocked(&engine);
    engine.create_material(&actor, lot("RM-001", "GRN-S5", date!(2024 - 05 - 01), None)).unwrap();
    engine
        .dispense(
            &actor,
            DispenseRequest {
                material_id: l2,
                issued_quantity: qty("50"),
                issued_to_product_batch: "PB-7".to_string(),
                method: Some(DispensingMethod::Fifo),
                comment: None,
            },
        )
        .unwrap();

    let lots = engine.list_available(Some("RM-001"), Some(DispensingMethod::Fifo)).unwrap();
    assert_eq!(ids(&lots), vec![l1, l3]);
    assert!(lots.iter().all(|material| material.status == MaterialStatus::Approved));
    assert!(engine.list_available(Some("RM-404"), None).unwrap().is_empty());
}

#[test]
fn configured_default_method_applies_to_listing_and_dispense() {
    let clock = ManualClock::at_date(TODAY);
    let config = LifecycleConfig {
        default_dispensing_method: DispensingMethod::Fefo,
        ..LifecycleConfig::default()
    };
    let engine = LifecycleEngine::new(InMemoryMaterialStore::new(), clock, config);
    let (l1, l2, l3, _) = stocked(&engine);
    assert_eq!(ids(&engine.list_available(Some("RM-001"), None).unwrap()), vec![l3, l1, l2]);

    let outcome = engine
        .dispense(
            &operator(),
            DispenseRequest {
                material_id: l3,
                issued_quantity: qty("1"),
                issued_to_product_batch: "PB-8".to_string(),
                method: None,
                comment: None,
            },
        )
        .unwrap();
    assert_eq!(outcome.method, DispensingMethod::Fefo);
    let latest = &engine.history(l3).unwrap()[0];
    assert_eq!(latest.entry.dispensing_method, Some(DispensingMethod::Fefo));
}

// ============================================================================
// SECTION: Expiry Alerts
// ============================================================================

#[test]
fn expiry_alerts_cover_the_window_and_skip_terminal_lots() {
    let (engine, _) = memory_engine();
    let actor = operator();
    let create = |grn: &str, expiry: Date| {
        let mut request = lot("RM-001", grn, date!(2024 - 05 - 20), Some(expiry));
        request.mfg_date = Some(date!(2024 - 01 - 01));
        engine.create_material(&actor, request).unwrap().material.id
    };
    let soon = create("GRN-E1", date!(2024 - 06 - 10));
    let later = create("GRN-E2", date!(2024 - 06 - 20));
    let today = create("GRN-E3", TODAY);
    let _outside = create("GRN-E4", date!(2024 - 08 - 01));
    let _expired = create("GRN-E5", date!(2024 - 05 - 30));
    let rejected = create("GRN-E6", date!(2024 - 06 - 05));
    engine.move_to_under_test(&actor, SamplingRequest { material_id: rejected, comment: None }).unwrap();
    engine
        .reject(
            &actor,
            RejectRequest {
                material_id: rejected,
                rejection_reason: Some("Contaminated".to_string()),
                comment: None,
            },
        )
        .unwrap();

    let alerts = engine.expiry_alerts(None).unwrap();
    let found: Vec<(MaterialId, i64)> =
        alerts.iter().map(|alert| (alert.material.id, alert.days_until_expiry)).collect();
    assert_eq!(found, vec![(today, 0), (soon, 9), (later, 19)]);

    let narrow = engine.expiry_alerts(Some(10)).unwrap();
    assert_eq!(narrow.len(), 2);
}

#[test]
fn expiry_alerts_follow_the_clock() {
    let (engine, clock) = memory_engine();
    let mut request = lot("RM-001", "GRN-E7", date!(2024 - 05 - 20), Some(date!(2024 - 07 - 15)));
    request.mfg_date = None;
    engine.create_material(&operator(), request).unwrap();
    assert!(engine.expiry_alerts(None).unwrap().is_empty());

    clock.advance(20 * 86_400_000);
    let alerts = engine.expiry_alerts(None).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].days_until_expiry, 24);
}
