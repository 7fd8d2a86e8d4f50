// crates/rawmat-core/src/core/status.rs
// ============================================================================
// Module: Lifecycle Vocabulary
// Description: Closed enums for material status, audit actions, and methods.
// Purpose: Give the lifecycle state machine a typed, stable vocabulary.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every enum here has a stable `SCREAMING_SNAKE_CASE` wire form that is also
//! the stored text form. Parsing is strict: unknown values are rejected rather
//! than mapped to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error raised when a stored or supplied enum value is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Enum being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display`, and `FromStr` for a closed enum.
macro_rules! closed_enum_text {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the stable wire and storage form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

// ============================================================================
// SECTION: Material Status
// ============================================================================

/// Lifecycle status of a material container.
///
/// # Invariants
/// - Transitions only move forward: `QUARANTINE -> UNDER_TEST -> APPROVED |
///   REJECTED`, then `APPROVED -> DISPENSED`.
/// - `REJECTED` and `DISPENSED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialStatus {
    /// Received and awaiting sampling.
    Quarantine,
    /// Sampled and awaiting QC decision.
    UnderTest,
    /// Released for use.
    Approved,
    /// Failed QC.
    Rejected,
    /// Fully consumed by dispensing.
    Dispensed,
}

closed_enum_text!(MaterialStatus, "material status", {
    Quarantine => "QUARANTINE",
    UnderTest => "UNDER_TEST",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Dispensed => "DISPENSED",
});

impl MaterialStatus {
    /// Returns true when no further lifecycle transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Dispensed)
    }

    /// Returns true when a row in `self` may be written with status `next`.
    ///
    /// Staying in the same status is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Quarantine, Self::Quarantine | Self::UnderTest)
            | (Self::UnderTest, Self::UnderTest | Self::Approved | Self::Rejected)
            | (Self::Approved, Self::Approved | Self::Dispensed)
            | (Self::Rejected, Self::Rejected)
            | (Self::Dispensed, Self::Dispensed) => true,
            (Self::Quarantine, _)
            | (Self::UnderTest, _)
            | (Self::Approved, _)
            | (Self::Rejected, _)
            | (Self::Dispensed, _) => false,
        }
    }
}

// ============================================================================
// SECTION: Audit Actions
// ============================================================================

/// Kind of mutation recorded in a status history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Material registered in quarantine.
    Created,
    /// Sample withdrawn; material moved under test.
    Sampling,
    /// QC approval.
    Approval,
    /// QC rejection.
    Rejection,
    /// Rack location changed.
    RackUpdate,
    /// Quantity issued to a product batch.
    Dispensing,
    /// Annotation without a status change (inventory movements).
    Comment,
}

closed_enum_text!(ActionKind, "action kind", {
    Created => "CREATED",
    Sampling => "SAMPLING",
    Approval => "APPROVAL",
    Rejection => "REJECTION",
    RackUpdate => "RACK_UPDATE",
    Dispensing => "DISPENSING",
    Comment => "COMMENT",
});

// ============================================================================
// SECTION: Dispensing Methods
// ============================================================================

/// Lot ordering policy used when choosing what to dispense.
///
/// Lowercase names are accepted on input for config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispensingMethod {
    /// First in, first out by receipt date.
    #[default]
    #[serde(alias = "fifo")]
    Fifo,
    /// First expired, first out by expiry date.
    #[serde(alias = "fefo")]
    Fefo,
}

closed_enum_text!(DispensingMethod, "dispensing method", {
    Fifo => "FIFO",
    Fefo => "FEFO",
});

// ============================================================================
// SECTION: Inventory Direction
// ============================================================================

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionDirection {
    /// Stock returned or added.
    Inward,
    /// Stock removed outside dispensing.
    Outward,
}

closed_enum_text!(TransactionDirection, "transaction direction", {
    Inward => "INWARD",
    Outward => "OUTWARD",
});

impl TransactionDirection {
    /// Returns the lowercase label used in default comments.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inward => "inward",
            Self::Outward => "outward",
        }
    }
}
