// crates/rawmat-core/src/core/label.rs
// ============================================================================
// Module: QR Payloads and Labels
// Description: Scan payload encoding and printable label fields.
// Purpose: Expose what the QR/label collaborator needs without rendering.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The ledger never renders images. It produces the QR payload string
//! (`{"id":"MAT-...","v":1}`) and the label fields; an external collaborator
//! turns those into pixels. Scans are decoded leniently: the versioned JSON
//! payload or a bare material code are both accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;

use crate::core::identifiers::MaterialCode;
use crate::core::material::Material;
use crate::core::status::MaterialStatus;

// ============================================================================
// SECTION: QR Payload
// ============================================================================

/// Current QR payload version.
pub const QR_PAYLOAD_VERSION: u32 = 1;
/// Unit appended to label quantities.
pub const LABEL_QUANTITY_UNIT: &str = "kg";

/// JSON payload encoded into material QR codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Material code.
    pub id: MaterialCode,
    /// Payload version.
    pub v: u32,
}

impl QrPayload {
    /// Creates a current-version payload for `code`.
    #[must_use]
    pub fn new(code: MaterialCode) -> Self {
        Self { id: code, v: QR_PAYLOAD_VERSION }
    }

    /// Encodes the payload as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Extracts the material code from raw scan input.
///
/// Returns `None` for blank input or a JSON object without a string `id`.
#[must_use]
pub fn decode_scan(raw: &str) -> Option<MaterialCode> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') {
        let payload: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        let id = payload.get("id")?.as_str()?.trim();
        return if id.is_empty() { None } else { Some(MaterialCode::new(id)) };
    }
    Some(MaterialCode::new(trimmed))
}

// ============================================================================
// SECTION: Label Data
// ============================================================================

/// Printable label fields for a material container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelData {
    /// Material code.
    pub material_id: MaterialCode,
    /// Item code.
    pub item_code: String,
    /// Item name.
    pub item_name: String,
    /// Batch or lot number.
    pub batch_lot: String,
    /// GRN number.
    pub grn_number: String,
    /// Container quantity with unit.
    pub quantity: String,
    /// Current status.
    pub status: MaterialStatus,
    /// Receipt date.
    pub receipt_date: Date,
    /// Manufacture date.
    pub mfg_date: Option<Date>,
    /// Expiry date.
    pub exp_date: Option<Date>,
    /// Supplier name.
    pub supplier: String,
    /// Manufacturer name.
    pub manufacturer: String,
}

impl LabelData {
    /// Builds label fields from a material record.
    #[must_use]
    pub fn from_material(material: &Material) -> Self {
        Self {
            material_id: material.material_code.clone(),
            item_code: material.item_code.clone(),
            item_name: material.item_name.clone(),
            batch_lot: material.batch_lot_number.clone(),
            grn_number: material.grn_number.clone(),
            quantity: format!("{} {LABEL_QUANTITY_UNIT}", material.container_quantity),
            status: material.status,
            receipt_date: material.date_of_receipt,
            mfg_date: material.mfg_date,
            exp_date: material.exp_date,
            supplier: material.supplier_name.clone(),
            manufacturer: material.manufacturer_name.clone(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
