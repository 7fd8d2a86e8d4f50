// crates/rawmat-core/src/core/hashing.rs
// ============================================================================
// Module: Material Code Derivation
// Description: Deterministic SHA-256 derivation of external material codes.
// Purpose: Give every received container a stable, reproducible identity.
// Dependencies: sha2, time
// ============================================================================

//! ## Overview
//! A material code is derived from the receipt attributes that identify a
//! physical container. The digest input is
//! `{item_code}-{batch_lot}-{grn}-{container_quantity}-{YYYY-MM-DD}` with the
//! container quantity in canonical decimal form, hashed with SHA-256. The code
//! is `MAT-{YYYYMMDD}-{first 8 hex chars, uppercase}`.
//!
//! Re-deriving from the same attributes always yields the same code, which is
//! how duplicate receipts are detected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sha2::Digest;
use sha2::Sha256;
use time::Date;

use crate::core::identifiers::MaterialCode;
use crate::core::quantity::Quantity;
use crate::core::time::compact_date;
use crate::core::time::format_date;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix carried by every derived material code.
pub const MATERIAL_CODE_PREFIX: &str = "MAT";
/// Number of digest bytes rendered into the code (8 hex chars).
const CODE_DIGEST_BYTES: usize = 4;

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Receipt attributes that determine a material's identity.
#[derive(Debug, Clone, Copy)]
pub struct IdentityInputs<'a> {
    /// Item code of the material.
    pub item_code: &'a str,
    /// Supplier batch or lot number.
    pub batch_lot_number: &'a str,
    /// Goods receipt note number.
    pub grn_number: &'a str,
    /// Quantity held by the received container.
    pub container_quantity: &'a Quantity,
    /// Date the container was received.
    pub date_of_receipt: Date,
}

/// Derives the external material code for the given receipt attributes.
#[must_use]
pub fn derive_material_code(inputs: IdentityInputs<'_>) -> MaterialCode {
    let preimage = format!(
        "{}-{}-{}-{}-{}",
        inputs.item_code,
        inputs.batch_lot_number,
        inputs.grn_number,
        inputs.container_quantity,
        format_date(inputs.date_of_receipt)
    );
    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    let digest = hasher.finalize();
    let hash = upper_hex(&digest[.. CODE_DIGEST_BYTES]);
    MaterialCode::new(format!(
        "{MATERIAL_CODE_PREFIX}-{}-{hash}",
        compact_date(inputs.date_of_receipt)
    ))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as an uppercase hex string.
fn upper_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
