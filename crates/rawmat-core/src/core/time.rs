// crates/rawmat-core/src/core/time.rs
// ============================================================================
// Module: Ledger Time Model
// Description: Server timestamps, calendar dates, and injectable clocks.
// Purpose: Keep audit timestamps and date arithmetic deterministic under test.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Audit entries and inventory transactions carry server-assigned
//! [`Timestamp`] values in unix milliseconds. Receipt, manufacture, expiry and
//! retest dates are calendar [`Date`] values exchanged as `YYYY-MM-DD`.
//!
//! The runtime never reads wall-clock time directly; it asks a [`Clock`]. The
//! [`SystemClock`] backs production hosts, while [`ManualClock`] lets tests pin
//! and advance time explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Milliseconds per second.
const MILLIS_PER_SECOND: i128 = 1_000;

/// Server-assigned timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values come from a [`Clock`]; callers never supply audit timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the UTC calendar date of this timestamp.
    #[must_use]
    pub fn utc_date(self) -> Date {
        let nanos = i128::from(self.0) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_or(OffsetDateTime::UNIX_EPOCH.date(), OffsetDateTime::date)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Calendar Dates
// ============================================================================

/// Wire and storage format for calendar dates.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Errors raised when parsing calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date (expected YYYY-MM-DD): {0}")]
pub struct DateParseError(pub String);

/// Formats a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| {
        format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
    })
}

/// Formats a date as `YYYYMMDD` for material codes.
#[must_use]
pub fn compact_date(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`DateParseError`] when the input is not a valid calendar date.
pub fn parse_date(text: &str) -> Result<Date, DateParseError> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|_| DateParseError(text.to_string()))
}

/// Returns the whole number of days from `from` until `to` (negative if past).
#[must_use]
pub fn days_between(from: Date, to: Date) -> i64 {
    (to - from).whole_days()
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of server time for the runtime.
pub trait Clock: Send + Sync {
    /// Returns the current server timestamp.
    fn now(&self) -> Timestamp;

    /// Returns the current UTC calendar date.
    fn today(&self) -> Date {
        self.now().utc_date()
    }
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let millis = nanos / 1_000_000;
        Timestamp(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Manually driven clock for deterministic tests and replays.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Current instant in unix milliseconds.
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock pinned at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self { millis: Arc::new(AtomicI64::new(start.as_unix_millis())) }
    }

    /// Creates a clock pinned at midnight UTC of `date`.
    #[must_use]
    pub fn at_date(date: Date) -> Self {
        let seconds = date.midnight().assume_utc().unix_timestamp();
        let millis = i128::from(seconds) * MILLIS_PER_SECOND;
        Self::new(Timestamp(i64::try_from(millis).unwrap_or(i64::MAX)))
    }

    /// Advances the clock by `millis` milliseconds.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Sets the clock to `instant`.
    pub fn set(&self, instant: Timestamp) {
        self.millis.store(instant.as_unix_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use time::macros::date;

    use super::*;

    #[test]
    fn dates_round_trip_through_text() {
        let parsed = parse_date("2024-03-07").unwrap();
        assert_eq!(parsed, date!(2024 - 03 - 07));
        assert_eq!(format_date(parsed), "2024-03-07");
        assert_eq!(compact_date(parsed), "20240307");
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("07/03/2024").is_err());
    }

    #[test]
    fn manual_clock_advances_shared_instant() {
        let clock = ManualClock::at_date(date!(2024 - 01 - 01));
        let other = clock.clone();
        clock.advance(86_400_000);
        assert_eq!(other.today(), date!(2024 - 01 - 02));
    }

    #[test]
    fn days_between_counts_whole_days() {
        assert_eq!(days_between(date!(2024 - 01 - 01), date!(2024 - 01 - 31)), 30);
        assert_eq!(days_between(date!(2024 - 01 - 31), date!(2024 - 01 - 01)), -30);
    }
}
