// crates/rawmat-core/src/runtime/engine.rs
// ============================================================================
// Module: Lifecycle Engine
// Description: Status transition engine for the raw material lifecycle.
// Purpose: Validate, apply, and audit every material mutation atomically.
// Dependencies: crate::{core, interfaces}, serde, time, tracing
// ============================================================================

//! ## Overview
//! [`LifecycleEngine`] is the single entry point for material mutations. Each
//! operation checks the actor's permission, validates its input, then runs one
//! atomic unit: load the row, check the lifecycle state, compute the successor
//! through the quantity ledger, write it through the registry and append one
//! audit entry. Nothing is visible until the unit commits; any failure rolls
//! the whole unit back.
//!
//! Lifecycle: `QUARANTINE -> UNDER_TEST -> APPROVED | REJECTED`, then
//! `APPROVED -> DISPENSED` when a dispense drains the remaining quantity.
//! `REJECTED` and `DISPENSED` are terminal.
//!
//! Security posture: the engine trusts the supplied [`Actor`] but enforces the
//! per-operation permission and every business invariant itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use tracing::debug;

use crate::core::ActionKind;
use crate::core::Actor;
use crate::core::ActorProfile;
use crate::core::Clock;
use crate::core::DispensingMethod;
use crate::core::HistoryId;
use crate::core::HistoryRecord;
use crate::core::IdentityInputs;
use crate::core::InventoryTransaction;
use crate::core::LabelData;
use crate::core::Material;
use crate::core::MaterialCode;
use crate::core::MaterialId;
use crate::core::MaterialStatus;
use crate::core::NewHistoryEntry;
use crate::core::NewInventoryTransaction;
use crate::core::NewMaterialRecord;
use crate::core::Permission;
use crate::core::QrPayload;
use crate::core::Quantity;
use crate::core::StatusHistoryEntry;
use crate::core::Timestamp;
use crate::core::TransactionDirection;
use crate::interfaces::MaterialStore;
use crate::runtime::atomic::run_atomic;
use crate::runtime::audit;
use crate::runtime::audit::AuditRecorder;
use crate::runtime::error::LifecycleError;
use crate::runtime::events::LifecycleEvent;
use crate::runtime::events::LifecycleEventSink;
use crate::runtime::events::NoopEventSink;
use crate::runtime::ledger;
use crate::runtime::registry;
use crate::runtime::registry::MaterialRegistry;
use crate::runtime::selector::DispensingSelector;
use crate::runtime::selector::ExpiryAlert;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of any free-text field, in characters.
pub const MAX_TEXT_FIELD_CHARS: usize = 256;
/// Maximum length of comments and remarks, in characters.
pub const MAX_COMMENT_CHARS: usize = 2_048;
/// Default number of automatic retries after a write conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;
/// Default expiry alert window in days.
pub const DEFAULT_EXPIRY_ALERT_DAYS: u32 = 30;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Lifecycle engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Automatic retries after a write conflict before surfacing it.
    pub conflict_retries: u32,
    /// Ordering applied when a dispense or listing names no method.
    pub default_dispensing_method: DispensingMethod,
    /// Expiry alert window used when a caller names none.
    pub expiry_alert_days: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            default_dispensing_method: DispensingMethod::Fifo,
            expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Receipt of a new material container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMaterialRequest {
    /// Item code.
    pub item_code: String,
    /// Item name.
    pub item_name: String,
    /// Supplier batch or lot number.
    pub batch_lot_number: String,
    /// Goods receipt note number.
    pub grn_number: String,
    /// Quantity received.
    pub received_total_quantity: Quantity,
    /// Quantity held by the container.
    pub container_quantity: Quantity,
    /// Supplier name.
    pub supplier_name: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Receipt date.
    pub date_of_receipt: Date,
    /// Manufacture date.
    #[serde(default)]
    pub mfg_date: Option<Date>,
    /// Expiry date.
    #[serde(default)]
    pub exp_date: Option<Date>,
    /// Optional creation comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Sample withdrawal moving a material under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// QC approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// Optional retest date.
    #[serde(default)]
    pub retest_date: Option<Date>,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// QC rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// Mandatory rejection reason.
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Rack location change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackUpdateRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// New rack location.
    pub rack_number: String,
}

/// Issue of material to a product batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// Quantity to issue.
    pub issued_quantity: Quantity,
    /// Receiving product batch.
    pub issued_to_product_batch: String,
    /// Ordering policy that guided the pick; defaults from configuration.
    #[serde(default)]
    pub method: Option<DispensingMethod>,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Inward or outward stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovementRequest {
    /// Target material.
    pub material_id: MaterialId,
    /// Quantity moved.
    pub quantity: Quantity,
    /// Business date of the movement.
    pub transaction_date: Date,
    /// Optional remarks.
    #[serde(default)]
    pub remarks: Option<String>,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of a material creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMaterial {
    /// Stored material.
    pub material: Material,
    /// Creation audit entry.
    pub history_id: HistoryId,
    /// QR payload string for the label collaborator.
    pub qr_payload: String,
    /// Printable label fields.
    pub label: LabelData,
}

/// Result of a status or rack transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// Material after the transition.
    pub material: Material,
    /// Audit entry written with the transition.
    pub history_id: HistoryId,
}

/// Result of a dispense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseOutcome {
    /// Material after the dispense.
    pub material: Material,
    /// Audit entry written with the dispense.
    pub history_id: HistoryId,
    /// Quantity issued.
    pub dispensed: Quantity,
    /// Ordering policy recorded for the dispense.
    pub method: DispensingMethod,
    /// True when the dispense drained the material.
    pub fully_dispensed: bool,
}

/// Result of an inventory movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOutcome {
    /// Material after the movement.
    pub material: Material,
    /// Audit entry written with the movement.
    pub history_id: HistoryId,
    /// Stored movement record.
    pub transaction: InventoryTransaction,
}

/// QR payload and label fields for an existing material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLabel {
    /// QR payload string.
    pub qr_payload: String,
    /// Printable label fields.
    pub label: LabelData,
}

// ============================================================================
// SECTION: Internal Plans
// ============================================================================

/// Audit details contributed by a specific operation.
#[derive(Debug, Default)]
struct EntryDetails {
    /// Entry comment.
    comment: String,
    /// Rejection reason.
    rejection_reason: Option<String>,
    /// Sampling instant.
    sampling_date: Option<Timestamp>,
    /// Retest date.
    retest_date: Option<Date>,
    /// Dispense target batch.
    issued_to_product_batch: Option<String>,
    /// Dispensed quantity.
    dispensed_quantity: Option<Quantity>,
    /// Dispensing method.
    dispensing_method: Option<DispensingMethod>,
}

/// Stock movement staged alongside a mutation.
#[derive(Debug)]
struct StagedMovement {
    /// Direction.
    direction: TransactionDirection,
    /// Quantity moved.
    quantity: Quantity,
    /// Business date.
    transaction_date: Date,
    /// Remarks.
    remarks: Option<String>,
}

/// Successor state computed by an operation.
#[derive(Debug)]
struct Mutation {
    /// Material successor.
    next: Material,
    /// Audit details.
    details: EntryDetails,
    /// Optional stock movement.
    movement: Option<StagedMovement>,
}

/// Committed mutation.
#[derive(Debug)]
struct Applied {
    /// Status before the mutation.
    from_status: MaterialStatus,
    /// Stored material after the mutation.
    material: Material,
    /// Audit entry id.
    history_id: HistoryId,
    /// Stored movement, when staged.
    transaction: Option<InventoryTransaction>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Raw material lifecycle engine.
pub struct LifecycleEngine<S, C> {
    /// Material store.
    store: S,
    /// Server clock.
    clock: C,
    /// Engine configuration.
    config: LifecycleConfig,
    /// After-commit event sink.
    events: Arc<dyn LifecycleEventSink>,
}

impl<S: MaterialStore, C: Clock> LifecycleEngine<S, C> {
    /// Creates an engine over `store` with a no-op event sink.
    #[must_use]
    pub fn new(store: S, clock: C, config: LifecycleConfig) -> Self {
        Self { store, clock, config, events: Arc::new(NoopEventSink) }
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn LifecycleEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns a registry view for lookups.
    #[must_use]
    pub const fn registry(&self) -> MaterialRegistry<'_, S> {
        MaterialRegistry::new(&self.store)
    }

    /// Returns an audit view for history reads.
    #[must_use]
    pub const fn audit(&self) -> AuditRecorder<'_, S> {
        AuditRecorder::new(&self.store)
    }

    /// Returns a selector view for dispensing reads.
    #[must_use]
    pub const fn selector(&self) -> DispensingSelector<'_, S> {
        DispensingSelector::new(&self.store)
    }

    // ------------------------------------------------------------------------
    // Actors
    // ------------------------------------------------------------------------

    /// Stores an actor profile used to enrich history reads.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for blank profile fields and
    /// [`LifecycleError::Store`] when the write fails.
    pub fn register_actor(&self, profile: &ActorProfile) -> Result<(), LifecycleError> {
        require_text("actor id", profile.id.as_str())?;
        require_text("display name", &profile.display_name)?;
        require_text("username", &profile.username)?;
        self.store.upsert_actor(profile)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Registers a received container in quarantine.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PermissionDenied`],
    /// [`LifecycleError::Validation`], [`LifecycleError::DuplicateMaterial`],
    /// or a storage error.
    pub fn create_material(
        &self,
        actor: &Actor,
        request: CreateMaterialRequest,
    ) -> Result<CreatedMaterial, LifecycleError> {
        require_permission(actor, Permission::CreateMaterial)?;
        let item_code = require_text("item code", &request.item_code)?;
        let item_name = require_text("item name", &request.item_name)?;
        let batch_lot_number = require_text("batch/lot number", &request.batch_lot_number)?;
        let grn_number = require_text("GRN number", &request.grn_number)?;
        let supplier_name = require_text("supplier name", &request.supplier_name)?;
        let manufacturer_name = require_text("manufacturer name", &request.manufacturer_name)?;
        if !request.received_total_quantity.is_positive() {
            return Err(LifecycleError::Validation(
                "received total quantity must be greater than zero".to_string(),
            ));
        }
        if !request.container_quantity.is_positive() {
            return Err(LifecycleError::Validation(
                "container quantity must be greater than zero".to_string(),
            ));
        }
        if let (Some(mfg), Some(exp)) = (request.mfg_date, request.exp_date)
            && exp < mfg
        {
            return Err(LifecycleError::Validation(
                "expiry date must not precede manufacture date".to_string(),
            ));
        }
        let comment = comment_or(request.comment.as_deref(), || {
            "Material created and placed in Quarantine".to_string()
        })?;
        let material_code = registry::derive_id(IdentityInputs {
            item_code: &item_code,
            batch_lot_number: &batch_lot_number,
            grn_number: &grn_number,
            container_quantity: &request.container_quantity,
            date_of_receipt: request.date_of_receipt,
        });
        let qr_payload = encode_qr(&material_code)?;

        let (material, history_id) = run_atomic(
            &self.store,
            self.config.conflict_retries,
            ActionKind::Created.as_str(),
            |tx| {
                let now = self.clock.now();
                let record = NewMaterialRecord {
                    material_code: material_code.clone(),
                    item_code: item_code.clone(),
                    item_name: item_name.clone(),
                    batch_lot_number: batch_lot_number.clone(),
                    grn_number: grn_number.clone(),
                    received_total_quantity: request.received_total_quantity.clone(),
                    container_quantity: request.container_quantity.clone(),
                    supplier_name: supplier_name.clone(),
                    manufacturer_name: manufacturer_name.clone(),
                    date_of_receipt: request.date_of_receipt,
                    mfg_date: request.mfg_date,
                    exp_date: request.exp_date,
                    created_by: actor.id.clone(),
                    created_at: now,
                };
                let material = registry::create(tx, &record)?;
                let entry = NewHistoryEntry {
                    material_id: material.id,
                    from_status: None,
                    to_status: material.status,
                    action: ActionKind::Created,
                    performed_by: actor.id.clone(),
                    comment: comment.clone(),
                    rejection_reason: None,
                    sampling_date: None,
                    retest_date: None,
                    issued_to_product_batch: None,
                    dispensed_quantity: None,
                    dispensing_method: None,
                    timestamp: now,
                };
                let history_id = audit::record(tx, &entry)?;
                Ok((material, history_id))
            },
        )?;

        let applied = Applied {
            from_status: material.status,
            material,
            history_id,
            transaction: None,
        };
        self.emit(ActionKind::Created, actor, &applied, None, true);
        let applied_material = applied.material;
        Ok(CreatedMaterial {
            qr_payload,
            label: LabelData::from_material(&applied_material),
            material: applied_material,
            history_id,
        })
    }

    // ------------------------------------------------------------------------
    // Status Transitions
    // ------------------------------------------------------------------------

    /// Moves a quarantined material under test after sampling.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the material is in
    /// `QUARANTINE`.
    pub fn move_to_under_test(
        &self,
        actor: &Actor,
        request: SamplingRequest,
    ) -> Result<TransitionOutcome, LifecycleError> {
        require_permission(actor, Permission::MoveToUnderTest)?;
        let comment = comment_or(request.comment.as_deref(), || {
            format!("Sample withdrawn by {}", actor.display_name)
        })?;
        let applied = self.mutate(actor, ActionKind::Sampling, request.material_id, None, |current, now| {
            require_status(current, MaterialStatus::Quarantine, ActionKind::Sampling)?;
            let mut next = current.clone();
            next.status = MaterialStatus::UnderTest;
            Ok(Mutation {
                next,
                details: EntryDetails {
                    comment: comment.clone(),
                    sampling_date: Some(now),
                    ..EntryDetails::default()
                },
                movement: None,
            })
        })?;
        Ok(applied.into_transition())
    }

    /// Approves a material under test.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the material is
    /// `UNDER_TEST`.
    pub fn approve(
        &self,
        actor: &Actor,
        request: ApproveRequest,
    ) -> Result<TransitionOutcome, LifecycleError> {
        require_permission(actor, Permission::ApproveRejectQc)?;
        let comment = comment_or(request.comment.as_deref(), || {
            format!("Approved by {}", actor.display_name)
        })?;
        let applied = self.mutate(actor, ActionKind::Approval, request.material_id, None, |current, _| {
            require_status(current, MaterialStatus::UnderTest, ActionKind::Approval)?;
            let mut next = current.clone();
            next.status = MaterialStatus::Approved;
            Ok(Mutation {
                next,
                details: EntryDetails {
                    comment: comment.clone(),
                    retest_date: request.retest_date,
                    ..EntryDetails::default()
                },
                movement: None,
            })
        })?;
        Ok(applied.into_transition())
    }

    /// Rejects a material under test.
    ///
    /// The rejection reason is validated before any state is read.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for a missing or blank reason and
    /// [`LifecycleError::InvalidTransition`] unless the material is
    /// `UNDER_TEST`.
    pub fn reject(
        &self,
        actor: &Actor,
        request: RejectRequest,
    ) -> Result<TransitionOutcome, LifecycleError> {
        require_permission(actor, Permission::ApproveRejectQc)?;
        let reason = match request.rejection_reason.as_deref() {
            Some(reason) if !reason.trim().is_empty() => require_comment(reason)?,
            _ => {
                return Err(LifecycleError::Validation(
                    "rejection reason is required".to_string(),
                ));
            }
        };
        let comment = comment_or(request.comment.as_deref(), || {
            format!("Rejected by {}", actor.display_name)
        })?;
        let applied =
            self.mutate(actor, ActionKind::Rejection, request.material_id, None, |current, _| {
                require_status(current, MaterialStatus::UnderTest, ActionKind::Rejection)?;
                let mut next = current.clone();
                next.status = MaterialStatus::Rejected;
                Ok(Mutation {
                    next,
                    details: EntryDetails {
                        comment: comment.clone(),
                        rejection_reason: Some(reason.clone()),
                        ..EntryDetails::default()
                    },
                    movement: None,
                })
            })?;
        Ok(applied.into_transition())
    }

    /// Assigns the rack location of an approved material.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for a blank rack and
    /// [`LifecycleError::InvalidTransition`] unless the material is `APPROVED`.
    pub fn update_rack(
        &self,
        actor: &Actor,
        request: RackUpdateRequest,
    ) -> Result<TransitionOutcome, LifecycleError> {
        require_permission(actor, Permission::UpdateRack)?;
        let rack = require_text("rack number", &request.rack_number)?;
        let comment = format!("Rack number updated to {rack}");
        let applied =
            self.mutate(actor, ActionKind::RackUpdate, request.material_id, None, |current, _| {
                require_status(current, MaterialStatus::Approved, ActionKind::RackUpdate)?;
                let mut next = current.clone();
                next.rack_number = Some(rack.clone());
                Ok(Mutation {
                    next,
                    details: EntryDetails { comment: comment.clone(), ..EntryDetails::default() },
                    movement: None,
                })
            })?;
        Ok(applied.into_transition())
    }

    /// Issues quantity from an approved material to a product batch.
    ///
    /// The material becomes `DISPENSED` exactly when its remaining quantity
    /// reaches zero.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the material is
    /// `APPROVED` and [`LifecycleError::InsufficientQuantity`] when the issue
    /// exceeds the remaining quantity.
    pub fn dispense(
        &self,
        actor: &Actor,
        request: DispenseRequest,
    ) -> Result<DispenseOutcome, LifecycleError> {
        require_permission(actor, Permission::Dispense)?;
        let batch = require_text("product batch", &request.issued_to_product_batch)?;
        if !request.issued_quantity.is_positive() {
            return Err(LifecycleError::Validation(
                "issued quantity must be greater than zero".to_string(),
            ));
        }
        let method = request.method.unwrap_or(self.config.default_dispensing_method);
        let comment =
            comment_or(request.comment.as_deref(), || format!("Dispensed to {batch}"))?;
        let issued = request.issued_quantity;
        let applied = self.mutate(
            actor,
            ActionKind::Dispensing,
            request.material_id,
            Some(issued.clone()),
            |current, _| {
                require_status(current, MaterialStatus::Approved, ActionKind::Dispensing)?;
                let next = ledger::apply_dispense(current, &issued)?;
                Ok(Mutation {
                    next,
                    details: EntryDetails {
                        comment: comment.clone(),
                        issued_to_product_batch: Some(batch.clone()),
                        dispensed_quantity: Some(issued.clone()),
                        dispensing_method: Some(method),
                        ..EntryDetails::default()
                    },
                    movement: None,
                })
            },
        )?;
        Ok(DispenseOutcome {
            fully_dispensed: applied.material.status == MaterialStatus::Dispensed,
            material: applied.material,
            history_id: applied.history_id,
            dispensed: issued,
            method,
        })
    }

    // ------------------------------------------------------------------------
    // Inventory Movements
    // ------------------------------------------------------------------------

    /// Records an inward movement that raises the remaining quantity.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for a zero quantity or when the
    /// remaining quantity would exceed the received total, and
    /// [`LifecycleError::InvalidTransition`] for dispensed materials.
    pub fn record_inward(
        &self,
        actor: &Actor,
        request: InventoryMovementRequest,
    ) -> Result<MovementOutcome, LifecycleError> {
        self.record_movement(actor, TransactionDirection::Inward, request)
    }

    /// Records an outward movement that lowers the remaining quantity.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InsufficientQuantity`] when the movement
    /// exceeds the remaining quantity, and
    /// [`LifecycleError::InvalidTransition`] for dispensed materials.
    pub fn record_outward(
        &self,
        actor: &Actor,
        request: InventoryMovementRequest,
    ) -> Result<MovementOutcome, LifecycleError> {
        self.record_movement(actor, TransactionDirection::Outward, request)
    }

    /// Shared inward/outward path.
    fn record_movement(
        &self,
        actor: &Actor,
        direction: TransactionDirection,
        request: InventoryMovementRequest,
    ) -> Result<MovementOutcome, LifecycleError> {
        require_permission(actor, Permission::ManageInventory)?;
        if !request.quantity.is_positive() {
            return Err(LifecycleError::Validation(
                "movement quantity must be greater than zero".to_string(),
            ));
        }
        let remarks = match request.remarks.as_deref() {
            Some(text) if !text.trim().is_empty() => Some(require_comment(text)?),
            _ => None,
        };
        let comment = match &remarks {
            Some(text) => {
                format!("Inventory {}: {} units. {text}", direction.label(), request.quantity)
            }
            None => format!("Inventory {}: {} units.", direction.label(), request.quantity),
        };
        let quantity = request.quantity;
        let applied = self.mutate(
            actor,
            ActionKind::Comment,
            request.material_id,
            Some(quantity.clone()),
            |current, _| {
                if !ledger::movement_allowed(current.status) {
                    return Err(LifecycleError::InvalidTransition {
                        current: current.status,
                        action: ActionKind::Comment,
                    });
                }
                let next = ledger::apply_movement(current, direction, &quantity)?;
                Ok(Mutation {
                    next,
                    details: EntryDetails { comment: comment.clone(), ..EntryDetails::default() },
                    movement: Some(StagedMovement {
                        direction,
                        quantity: quantity.clone(),
                        transaction_date: request.transaction_date,
                        remarks: remarks.clone(),
                    }),
                })
            },
        )?;
        let transaction = applied.transaction.ok_or_else(|| {
            LifecycleError::Validation("movement was not recorded".to_string())
        })?;
        Ok(MovementOutcome {
            material: applied.material,
            history_id: applied.history_id,
            transaction,
        })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Finds a material by internal key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when absent.
    pub fn find_by_id(&self, id: MaterialId) -> Result<Material, LifecycleError> {
        self.registry().find_by_id(id)
    }

    /// Finds a material by derived code.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when absent.
    pub fn find_by_code(&self, code: &MaterialCode) -> Result<Material, LifecycleError> {
        self.registry().find_by_code(code)
    }

    /// Resolves raw QR scan input to a material.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for unreadable input and
    /// [`LifecycleError::NotFound`] when absent.
    pub fn find_by_scan(&self, raw: &str) -> Result<Material, LifecycleError> {
        self.registry().find_by_scan(raw)
    }

    /// Returns the QR payload and label fields of a material.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when absent.
    pub fn label(&self, id: MaterialId) -> Result<MaterialLabel, LifecycleError> {
        let material = self.find_by_id(id)?;
        Ok(MaterialLabel {
            qr_payload: encode_qr(&material.material_code)?,
            label: LabelData::from_material(&material),
        })
    }

    /// Returns the enriched audit trail of a material, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material.
    pub fn history(&self, id: MaterialId) -> Result<Vec<HistoryRecord>, LifecycleError> {
        self.audit().history(id)
    }

    /// Returns the audit trail of a material, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material.
    pub fn replay(&self, id: MaterialId) -> Result<Vec<StatusHistoryEntry>, LifecycleError> {
        self.audit().replay(id)
    }

    /// Returns the inventory movements of a material, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown material.
    pub fn transactions(&self, id: MaterialId) -> Result<Vec<InventoryTransaction>, LifecycleError> {
        self.find_by_id(id)?;
        Ok(self.store.transactions(id)?)
    }

    /// Lists dispensable lots; `method` defaults from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the read fails.
    pub fn list_available(
        &self,
        item_code: Option<&str>,
        method: Option<DispensingMethod>,
    ) -> Result<Vec<Material>, LifecycleError> {
        self.selector()
            .list_available(item_code, method.unwrap_or(self.config.default_dispensing_method))
    }

    /// Lists materials expiring within `days` (default from configuration) of
    /// the clock's current date.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] when the read fails.
    pub fn expiry_alerts(&self, days: Option<u32>) -> Result<Vec<ExpiryAlert>, LifecycleError> {
        self.selector()
            .expiry_alerts(self.clock.today(), days.unwrap_or(self.config.expiry_alert_days))
    }

    // ------------------------------------------------------------------------
    // Mutation Core
    // ------------------------------------------------------------------------

    /// Runs one load/plan/write/audit unit for an existing material.
    fn mutate<F>(
        &self,
        actor: &Actor,
        action: ActionKind,
        id: MaterialId,
        quantity: Option<Quantity>,
        plan: F,
    ) -> Result<Applied, LifecycleError>
    where
        F: Fn(&Material, Timestamp) -> Result<Mutation, LifecycleError>,
    {
        let applied = run_atomic(&self.store, self.config.conflict_retries, action.as_str(), |tx| {
            let now = self.clock.now();
            let current = registry::load_for_update(tx, id)?;
            let Mutation { mut next, details, movement } = plan(&current, now)?;
            next.updated_at = now;
            let stored = registry::update_fields(tx, &current, &next)?;
            let transaction = match movement {
                Some(staged) => Some(tx.insert_transaction(&NewInventoryTransaction {
                    material_id: stored.id,
                    direction: staged.direction,
                    quantity: staged.quantity,
                    transaction_date: staged.transaction_date,
                    performed_by: actor.id.clone(),
                    remarks: staged.remarks,
                    recorded_at: now,
                })?),
                None => None,
            };
            let entry = NewHistoryEntry {
                material_id: stored.id,
                from_status: Some(current.status),
                to_status: stored.status,
                action,
                performed_by: actor.id.clone(),
                comment: details.comment,
                rejection_reason: details.rejection_reason,
                sampling_date: details.sampling_date,
                retest_date: details.retest_date,
                issued_to_product_batch: details.issued_to_product_batch,
                dispensed_quantity: details.dispensed_quantity,
                dispensing_method: details.dispensing_method,
                timestamp: now,
            };
            let history_id = audit::record(tx, &entry)?;
            Ok(Applied { from_status: current.status, material: stored, history_id, transaction })
        })?;
        self.emit(action, actor, &applied, quantity, false);
        Ok(applied)
    }

    /// Emits the after-commit event and diagnostic log for a mutation.
    fn emit(
        &self,
        action: ActionKind,
        actor: &Actor,
        applied: &Applied,
        quantity: Option<Quantity>,
        created: bool,
    ) {
        debug!(
            material_id = %applied.material.id,
            material_code = %applied.material.material_code,
            action = %action,
            actor = %actor.id,
            to_status = %applied.material.status,
            "lifecycle mutation committed"
        );
        self.events.record(&LifecycleEvent {
            event: LifecycleEvent::event_name(action),
            timestamp_ms: applied.material.updated_at,
            material_id: applied.material.id,
            material_code: applied.material.material_code.clone(),
            action,
            from_status: if created { None } else { Some(applied.from_status) },
            to_status: applied.material.status,
            actor: actor.id.clone(),
            quantity,
            remaining: applied.material.remaining_quantity.clone(),
            history_id: applied.history_id,
        });
    }
}

impl Applied {
    /// Converts into a transition outcome.
    fn into_transition(self) -> TransitionOutcome {
        TransitionOutcome { material: self.material, history_id: self.history_id }
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Fails unless `actor` holds `permission`.
fn require_permission(actor: &Actor, permission: Permission) -> Result<(), LifecycleError> {
    if actor.can(permission) { Ok(()) } else { Err(LifecycleError::PermissionDenied(permission)) }
}

/// Fails unless the material is in `required`.
fn require_status(
    material: &Material,
    required: MaterialStatus,
    action: ActionKind,
) -> Result<(), LifecycleError> {
    if material.status == required {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { current: material.status, action })
    }
}

/// Returns the trimmed value of a required short text field.
fn require_text(field: &str, value: &str) -> Result<String, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_TEXT_FIELD_CHARS {
        return Err(LifecycleError::Validation(format!(
            "{field} exceeds {MAX_TEXT_FIELD_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Returns the trimmed value of a free-text comment.
fn require_comment(value: &str) -> Result<String, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(LifecycleError::Validation(format!(
            "comment exceeds {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Returns the supplied comment, or the default when absent or blank.
fn comment_or(
    supplied: Option<&str>,
    default: impl FnOnce() -> String,
) -> Result<String, LifecycleError> {
    match supplied {
        Some(text) if !text.trim().is_empty() => require_comment(text),
        _ => Ok(default()),
    }
}

/// Encodes the QR payload for `code`.
fn encode_qr(code: &MaterialCode) -> Result<String, LifecycleError> {
    QrPayload::new(code.clone())
        .encode()
        .map_err(|err| LifecycleError::Validation(format!("failed to encode qr payload: {err}")))
}
