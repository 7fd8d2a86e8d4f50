// crates/rawmat-core/src/core/mod.rs
// ============================================================================
// Module: Ledger Core Types
// Description: Canonical material, audit, and inventory data structures.
// Purpose: Provide stable, serializable types shared by every ledger surface.
// Dependencies: bigdecimal, serde, sha2, time
// ============================================================================

//! ## Overview
//! Core types describe materials, their lifecycle vocabulary, audit entries,
//! inventory movements, and the identity derivation used for QR labels. They
//! carry no I/O; persistence lives behind [`crate::interfaces`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod actor;
pub mod hashing;
pub mod history;
pub mod identifiers;
pub mod inventory;
pub mod label;
pub mod material;
pub mod quantity;
pub mod status;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actor::Actor;
pub use actor::ActorProfile;
pub use actor::Permission;
pub use actor::Role;
pub use hashing::IdentityInputs;
pub use hashing::MATERIAL_CODE_PREFIX;
pub use hashing::derive_material_code;
pub use history::HistoryRecord;
pub use history::NewHistoryEntry;
pub use history::StatusHistoryEntry;
pub use identifiers::ActorId;
pub use identifiers::HistoryId;
pub use identifiers::MaterialCode;
pub use identifiers::MaterialId;
pub use identifiers::TransactionId;
pub use inventory::InventoryTransaction;
pub use inventory::NewInventoryTransaction;
pub use label::LabelData;
pub use label::QrPayload;
pub use label::decode_scan;
pub use material::Material;
pub use material::MaterialInvariant;
pub use material::NewMaterialRecord;
pub use quantity::Quantity;
pub use quantity::QuantityError;
pub use status::ActionKind;
pub use status::DispensingMethod;
pub use status::MaterialStatus;
pub use status::TransactionDirection;
pub use status::UnknownVariant;
pub use self::time::Clock;
pub use self::time::DateParseError;
pub use self::time::ManualClock;
pub use self::time::SystemClock;
pub use self::time::Timestamp;
pub use self::time::format_date;
pub use self::time::parse_date;
