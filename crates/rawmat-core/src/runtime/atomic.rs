// crates/rawmat-core/src/runtime/atomic.rs
// ============================================================================
// Module: Atomic Operation Runner
// Description: Begin/commit/retry wrapper around store transactions.
// Purpose: Run each lifecycle mutation as one all-or-nothing unit.
// Dependencies: crate::interfaces, tracing
// ============================================================================

//! ## Overview
//! [`run_atomic`] opens a transaction, runs the operation body against it and
//! commits. Any error before commit drops the transaction, which rolls it
//! back. A [`LifecycleError::Conflict`] restarts the whole body from a fresh
//! read, up to the configured number of retries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::warn;

use crate::interfaces::MaterialStore;
use crate::interfaces::MaterialTx;
use crate::runtime::error::LifecycleError;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs `body` inside a store transaction, retrying on conflicts.
///
/// # Errors
///
/// Returns the body's error (after rollback), a commit failure, or
/// [`LifecycleError::Conflict`] once `retries` retries are exhausted.
pub fn run_atomic<S, T, F>(
    store: &S,
    retries: u32,
    operation: &'static str,
    mut body: F,
) -> Result<T, LifecycleError>
where
    S: MaterialStore + ?Sized,
    F: FnMut(&mut dyn MaterialTx) -> Result<T, LifecycleError>,
{
    let mut attempt: u32 = 0;
    loop {
        match run_once(store, &mut body) {
            Err(LifecycleError::Conflict(reason)) if attempt < retries => {
                attempt += 1;
                warn!(operation, attempt, retries, %reason, "lifecycle conflict; retrying");
            }
            result => return result,
        }
    }
}

/// Runs one attempt: begin, body, commit.
fn run_once<S, T, F>(store: &S, body: &mut F) -> Result<T, LifecycleError>
where
    S: MaterialStore + ?Sized,
    F: FnMut(&mut dyn MaterialTx) -> Result<T, LifecycleError>,
{
    let mut tx = store.begin()?;
    let value = body(&mut *tx)?;
    tx.commit()?;
    Ok(value)
}
