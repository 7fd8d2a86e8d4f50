// crates/rawmat-core/src/runtime/selector.rs
// ============================================================================
// Module: Dispensing Selector
// Description: FIFO/FEFO ordering of dispensable lots and expiry alerts.
// Purpose: Tell operators which approved lots to issue next.
// Dependencies: crate::core, crate::interfaces, serde, time
// ============================================================================

//! ## Overview
//! The selector is a pure read of committed state. Available lots are
//! `APPROVED` materials with positive remaining quantity, ordered by:
//! - FEFO: expiry ascending (no expiry last), then receipt ascending.
//! - FIFO: receipt ascending, then creation ascending.
//!
//! Both orders end with the internal key as the final tie-break so the result
//! is total and stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::core::DispensingMethod;
use crate::core::Material;
use crate::core::MaterialStatus;
use crate::core::time::days_between;
use crate::interfaces::MaterialFilter;
use crate::interfaces::MaterialStore;
use crate::runtime::error::LifecycleError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Material whose expiry falls inside the alert window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    /// Expiring material.
    #[serde(flatten)]
    pub material: Material,
    /// Whole days from today until expiry (0 when expiring today).
    pub days_until_expiry: i64,
}

// ============================================================================
// SECTION: Selector
// ============================================================================

/// Read-only lot selector.
pub struct DispensingSelector<'a, S: ?Sized> {
    /// Backing store.
    store: &'a S,
}

impl<'a, S: MaterialStore + ?Sized> DispensingSelector<'a, S> {
    /// Creates a selector over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Lists dispensable lots in `method` order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the read fails.
    pub fn list_available(
        &self,
        item_code: Option<&str>,
        method: DispensingMethod,
    ) -> Result<Vec<Material>, LifecycleError> {
        let filter = MaterialFilter {
            status: Some(MaterialStatus::Approved),
            item_code: item_code.map(str::to_string),
        };
        let mut lots: Vec<Material> = self
            .store
            .materials(&filter)?
            .into_iter()
            .filter(|material| material.remaining_quantity.is_positive())
            .collect();
        order_lots(&mut lots, method);
        Ok(lots)
    }

    /// Lists materials expiring within `days` days of `today`.
    ///
    /// Rejected and dispensed materials are excluded; results are ordered by
    /// expiry ascending.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] when the window overflows the
    /// calendar and [`LifecycleError::Store`] when the read fails.
    pub fn expiry_alerts(&self, today: Date, days: u32) -> Result<Vec<ExpiryAlert>, LifecycleError> {
        let horizon = today
            .checked_add(time::Duration::days(i64::from(days)))
            .ok_or_else(|| LifecycleError::Validation(format!("alert window too large: {days}")))?;
        let mut alerts: Vec<ExpiryAlert> = self
            .store
            .materials(&MaterialFilter::default())?
            .into_iter()
            .filter(|material| !material.status.is_terminal())
            .filter_map(|material| {
                let expiry = material.exp_date?;
                (today <= expiry && expiry <= horizon).then(|| ExpiryAlert {
                    days_until_expiry: days_between(today, expiry),
                    material,
                })
            })
            .collect();
        alerts.sort_by(|a, b| {
            a.material.exp_date.cmp(&b.material.exp_date).then(a.material.id.cmp(&b.material.id))
        });
        Ok(alerts)
    }
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Sorts lots in place by `method`.
pub fn order_lots(lots: &mut [Material], method: DispensingMethod) {
    match method {
        DispensingMethod::Fefo => lots.sort_by(|a, b| {
            expiry_nulls_last(a.exp_date, b.exp_date)
                .then(a.date_of_receipt.cmp(&b.date_of_receipt))
                .then(a.id.cmp(&b.id))
        }),
        DispensingMethod::Fifo => lots.sort_by(|a, b| {
            a.date_of_receipt
                .cmp(&b.date_of_receipt)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        }),
    }
}

/// Compares optional expiry dates with missing dates ordered last.
fn expiry_nulls_last(a: Option<Date>, b: Option<Date>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
