// crates/rawmat-core/tests/common/mod.rs
// =============================================================================
// Module: Ledger Test Helpers
// Description: Shared fixtures for lifecycle engine integration tests.
// Purpose: Reduce duplication across integration tests for rawmat-core.
// =============================================================================

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Test helpers are selectively used across suites."
)]

use rawmat_core::Actor;
use rawmat_core::ApproveRequest;
use rawmat_core::CreateMaterialRequest;
use rawmat_core::InMemoryMaterialStore;
use rawmat_core::LifecycleConfig;
use rawmat_core::LifecycleEngine;
use rawmat_core::ManualClock;
use rawmat_core::Material;
use rawmat_core::MaterialStore;
use rawmat_core::Quantity;
use rawmat_core::Role;
use rawmat_core::SamplingRequest;
use time::Date;
use time::macros::date;

/// Date every test clock starts on.
pub const TODAY: Date = date!(2024 - 06 - 01);

/// Parses a quantity literal.
pub fn qty(text: &str) -> Quantity {
    Quantity::parse(text).unwrap()
}

/// Returns an operator actor with default permissions.
pub fn operator() -> Actor {
    Actor::with_role("user-1", "Olivia Operator", Role::Operator)
}

/// Returns a read-only actor.
pub fn viewer() -> Actor {
    Actor::with_role("user-2", "Victor Viewer", Role::Viewer)
}

/// Builds an engine over an in-memory store with a pinned clock.
pub fn memory_engine() -> (LifecycleEngine<InMemoryMaterialStore, ManualClock>, ManualClock) {
    engine_over(InMemoryMaterialStore::new())
}

/// Builds an engine over `store` with a pinned clock.
pub fn engine_over<S: MaterialStore>(store: S) -> (LifecycleEngine<S, ManualClock>, ManualClock) {
    let clock = ManualClock::at_date(TODAY);
    let engine = LifecycleEngine::new(store, clock.clone(), LifecycleConfig::default());
    (engine, clock)
}

/// Returns a valid receipt request for `grn` with `quantity` received.
pub fn receipt(grn: &str, quantity: &str) -> CreateMaterialRequest {
    CreateMaterialRequest {
        item_code: "RM-001".to_string(),
        item_name: "Lactose Monohydrate".to_string(),
        batch_lot_number: "LOT-2024-07".to_string(),
        grn_number: grn.to_string(),
        received_total_quantity: qty(quantity),
        container_quantity: qty(quantity),
        supplier_name: "Acme Supplies".to_string(),
        manufacturer_name: "Acme Pharma".to_string(),
        date_of_receipt: date!(2024 - 05 - 20),
        mfg_date: Some(date!(2024 - 01 - 10)),
        exp_date: Some(date!(2026 - 01 - 10)),
        comment: None,
    }
}

/// Creates, samples and approves a material.
pub fn approved_material<S: MaterialStore>(
    engine: &LifecycleEngine<S, ManualClock>,
    request: CreateMaterialRequest,
) -> Material {
    let actor = operator();
    let created = engine.create_material(&actor, request).unwrap();
    let id = created.material.id;
    engine.move_to_under_test(&actor, SamplingRequest { material_id: id, comment: None }).unwrap();
    engine
        .approve(&actor, ApproveRequest { material_id: id, retest_date: None, comment: None })
        .unwrap()
        .material
}
