// crates/rawmat-core/tests/proptest_ledger.rs
// ============================================================================
// Module: Ledger Property Tests
// Description: Randomized movement and dispense sequences.
// Purpose: Check quantity conservation and status coupling under any order.
// Dependencies: rawmat-core, proptest
// ============================================================================
//! ## Overview
//! Drives one approved lot through arbitrary dispense and movement sequences.
//! Whatever succeeds or fails, the stored row must stay within
//! `0 <= remaining <= received`, the received total never changes, the sum of
//! successful issues equals the dispensed counter, and `DISPENSED` is reached
//! exactly when a dispense drains the lot.

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
use common::receipt;
use proptest::prelude::*;
use rawmat_core::DispenseRequest;
use rawmat_core::InventoryMovementRequest;
use rawmat_core::LifecycleError;
use rawmat_core::MaterialId;
use rawmat_core::MaterialStatus;
use rawmat_core::Quantity;

#[derive(Debug, Clone)]
enum Step {
    Dispense(u32),
    Inward(u32),
    Outward(u32),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u32 .. 40).prop_map(Step::Dispense),
        (1u32 .. 40).prop_map(Step::Inward),
        (1u32 .. 40).prop_map(Step::Outward),
    ]
}

proptest! {
    #[test]
    fn quantities_are_conserved(steps in prop::collection::vec(step(), 1 .. 24)) {
        let (engine, _) = memory_engine();
        let actor = operator();
        let received = Quantity::from_units(100);
        let material = approved_material(&engine, receipt("GRN-P1", "100"));
        let mut issued_total = Quantity::zero();
        let mut applied = 0usize;
        let mut movements = 0usize;

        for (index, step) in steps.into_iter().enumerate() {
            let before = engine.find_by_id(material.id).unwrap();
            let is_dispense = matches!(step, Step::Dispense(_));
            let result = match step {
                Step::Dispense(units) => engine
                    .dispense(&actor, DispenseRequest {
                        material_id: material.id,
                        issued_quantity: Quantity::from_units(units),
                        issued_to_product_batch: format!("PB-{index}"),
                        method: None,
                        comment: None,
                    })
                    .map(|outcome| {
                        issued_total = issued_total.checked_add(&outcome.dispensed).unwrap();
                        outcome.material
                    }),
                Step::Inward(units) => engine
                    .record_inward(&actor, movement(material.id, units))
                    .map(|outcome| outcome.material),
                Step::Outward(units) => engine
                    .record_outward(&actor, movement(material.id, units))
                    .map(|outcome| outcome.material),
            };

            let stored = engine.find_by_id(material.id).unwrap();
            let succeeded = result.is_ok();
            if succeeded {
                applied += 1;
                if !is_dispense {
                    movements += 1;
                }
            }
            match result {
                Ok(after) => prop_assert_eq!(&after, &stored),
                Err(
                    LifecycleError::InsufficientQuantity { .. }
                    | LifecycleError::Validation(_)
                    | LifecycleError::InvalidTransition { .. },
                ) => prop_assert_eq!(&before, &stored),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }

            prop_assert_eq!(&stored.received_total_quantity, &received);
            prop_assert!(stored.remaining_quantity <= received);
            prop_assert_eq!(&stored.dispensed_quantity, &issued_total);
            if stored.status == MaterialStatus::Dispensed {
                prop_assert!(stored.remaining_quantity.is_zero());
            }
            if before.status != stored.status {
                prop_assert!(is_dispense);
                prop_assert_eq!(stored.status, MaterialStatus::Dispensed);
            }
            if is_dispense && succeeded && stored.remaining_quantity.is_zero() {
                prop_assert_eq!(stored.status, MaterialStatus::Dispensed);
            }
        }

        engine.audit().verify(material.id).unwrap();
        // Created, sampled and approved precede the generated steps.
        prop_assert_eq!(engine.replay(material.id).unwrap().len(), 3 + applied);
        prop_assert_eq!(engine.transactions(material.id).unwrap().len(), movements);
    }
}

fn movement(material_id: MaterialId, units: u32) -> InventoryMovementRequest {
    InventoryMovementRequest {
        material_id,
        quantity: Quantity::from_units(units),
        transaction_date: TODAY,
        remarks: None,
    }
}
