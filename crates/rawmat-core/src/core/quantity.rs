// crates/rawmat-core/src/core/quantity.rs
// ============================================================================
// Module: Exact Quantities
// Description: Non-negative exact decimal quantities for stock arithmetic.
// Purpose: Keep ledger arithmetic free of floating-point drift.
// Dependencies: bigdecimal, serde, thiserror
// ============================================================================

//! ## Overview
//! Quantities are fractional (kilograms, litres) and must compare and subtract
//! exactly, so they wrap [`BigDecimal`] instead of `f64`. A [`Quantity`] can
//! never be negative: subtraction is only available through
//! [`Quantity::checked_sub`], which refuses to cross zero.
//!
//! Quantities serialize as canonical decimal strings (`"12.5"`, `"100"`) so
//! JSON and storage round-trips never lose precision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::Zero;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of fractional digits accepted in a quantity.
pub const MAX_QUANTITY_SCALE: i64 = 6;
/// Maximum number of significant digits accepted in a quantity.
pub const MAX_QUANTITY_DIGITS: u64 = 28;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when constructing a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Input was not a decimal number.
    #[error("quantity is not a decimal number: {0}")]
    Malformed(String),
    /// Input was below zero.
    #[error("quantity must not be negative: {0}")]
    Negative(String),
    /// Input exceeded the supported precision.
    #[error("quantity exceeds supported precision: {0}")]
    Precision(String),
}

// ============================================================================
// SECTION: Quantity
// ============================================================================

/// Non-negative exact decimal quantity.
///
/// # Invariants
/// - The wrapped value is `>= 0`.
/// - At most [`MAX_QUANTITY_SCALE`] fractional digits and
///   [`MAX_QUANTITY_DIGITS`] significant digits.
/// - Equality and ordering are numeric (`1.50 == 1.5`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity(BigDecimal);

impl Quantity {
    /// Returns a zero quantity.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigDecimal::zero())
    }

    /// Wraps a decimal after checking sign and precision.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError`] when the value is negative or too precise.
    pub fn new(value: BigDecimal) -> Result<Self, QuantityError> {
        if value < BigDecimal::zero() {
            return Err(QuantityError::Negative(canonical_string(&value)));
        }
        let (_, scale) = value.as_bigint_and_exponent();
        if scale > MAX_QUANTITY_SCALE
            || scale < -i64::try_from(MAX_QUANTITY_DIGITS).unwrap_or(i64::MAX)
            || value.digits() > MAX_QUANTITY_DIGITS
        {
            return Err(QuantityError::Precision(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parses a decimal string such as `"12.5"`.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError`] when the text is not a valid quantity.
    pub fn parse(text: &str) -> Result<Self, QuantityError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Malformed(String::new()));
        }
        let value = BigDecimal::from_str(trimmed)
            .map_err(|_| QuantityError::Malformed(trimmed.to_string()))?;
        Self::new(value)
    }

    /// Builds a quantity from a whole number of units.
    #[must_use]
    pub fn from_units(units: u32) -> Self {
        Self(BigDecimal::from(units))
    }

    /// Returns true when the quantity is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true when the quantity is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        !self.is_zero()
    }

    /// Returns the wrapped decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// Adds two quantities.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Precision`] when the sum exceeds the supported
    /// digit count.
    pub fn checked_add(&self, other: &Self) -> Result<Self, QuantityError> {
        Self::new(&self.0 + &other.0)
    }

    /// Subtracts `other`, returning `None` when the result would be negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        match self.0.cmp(&other.0) {
            Ordering::Less => None,
            Ordering::Equal => Some(Self::zero()),
            Ordering::Greater => Some(Self(&self.0 - &other.0)),
        }
    }

    /// Returns the canonical string form (no exponent, no trailing zeros).
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        canonical_string(&self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_canonical_string()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a decimal in plain notation with trailing fractional zeros removed.
fn canonical_string(value: &BigDecimal) -> String {
    let (mantissa, scale) = value.as_bigint_and_exponent();
    let raw = mantissa.to_string();
    let (negative, digits) = raw.strip_prefix('-').map_or((false, raw.as_str()), |rest| (true, rest));
    let mut text = if scale <= 0 {
        let zeros = usize::try_from(scale.unsigned_abs()).unwrap_or(0);
        format!("{digits}{}", "0".repeat(zeros))
    } else {
        let scale = usize::try_from(scale).unwrap_or(0);
        if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            format!("{whole}.{fraction}")
        } else {
            format!("0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    };
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text.is_empty() {
        text.push('0');
    }
    if negative && text != "0" {
        text.insert(0, '-');
    }
    text
}

// ============================================================================
// SECTION: Tests
// ============================================================================
