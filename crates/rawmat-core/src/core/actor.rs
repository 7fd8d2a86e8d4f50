// crates/rawmat-core/src/core/actor.rs
// ============================================================================
// Module: Actors and Permissions
// Description: Authenticated actor context, roles, and permission vocabulary.
// Purpose: Carry the caller identity and its grants into lifecycle operations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Authentication happens outside the ledger. Callers hand the runtime an
//! [`Actor`] that already carries its permission set; the runtime trusts it,
//! checks the one permission each operation needs, and records the actor id
//! verbatim in the audit trail.
//!
//! [`ActorProfile`] is the read-side projection used to enrich history with a
//! display name, username and role.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;

// ============================================================================
// SECTION: Permissions
// ============================================================================

/// Grant required by a ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Read-only access.
    ViewOnly,
    /// Register received containers.
    CreateMaterial,
    /// Withdraw samples and move material under test.
    MoveToUnderTest,
    /// Record QC approval or rejection.
    ApproveRejectQc,
    /// Assign rack locations.
    UpdateRack,
    /// Issue material to product batches.
    Dispense,
    /// Record inward and outward movements.
    ManageInventory,
}

impl Permission {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewOnly => "VIEW_ONLY",
            Self::CreateMaterial => "CREATE_MATERIAL",
            Self::MoveToUnderTest => "MOVE_TO_UNDER_TEST",
            Self::ApproveRejectQc => "APPROVE_REJECT_QC",
            Self::UpdateRack => "UPDATE_RACK",
            Self::Dispense => "DISPENSE",
            Self::ManageInventory => "MANAGE_INVENTORY",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Coarse role assigned by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Admin,
    /// Warehouse and QC operator.
    Operator,
    /// Read-only user.
    Viewer,
}

impl Role {
    /// Returns the stable wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a role from its wire form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Returns the permission set granted to this role by default.
    #[must_use]
    pub fn default_permissions(self) -> BTreeSet<Permission> {
        match self {
            Self::Admin | Self::Operator => BTreeSet::from([
                Permission::ViewOnly,
                Permission::CreateMaterial,
                Permission::MoveToUnderTest,
                Permission::ApproveRejectQc,
                Permission::UpdateRack,
                Permission::Dispense,
                Permission::ManageInventory,
            ]),
            Self::Viewer => BTreeSet::from([Permission::ViewOnly]),
        }
    }
}

// ============================================================================
// SECTION: Actor Context
// ============================================================================

/// Authenticated caller supplied with every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable actor identifier recorded in audit entries.
    pub id: ActorId,
    /// Human-readable name used in default comments.
    pub display_name: String,
    /// Role assigned by the authentication collaborator.
    pub role: Role,
    /// Effective permission set.
    pub permissions: BTreeSet<Permission>,
}

impl Actor {
    /// Creates an actor with the default permissions of `role`.
    #[must_use]
    pub fn with_role(id: impl Into<ActorId>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            permissions: role.default_permissions(),
        }
    }

    /// Returns true when the actor holds `permission`.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Stored actor projection joined into history reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Actor identifier.
    pub id: ActorId,
    /// Display name.
    pub display_name: String,
    /// Login name.
    pub username: String,
    /// Assigned role.
    pub role: Role,
}

impl ActorProfile {
    /// Builds a profile from an actor context and a username.
    #[must_use]
    pub fn from_actor(actor: &Actor, username: impl Into<String>) -> Self {
        Self {
            id: actor.id.clone(),
            display_name: actor.display_name.clone(),
            username: username.into(),
            role: actor.role,
        }
    }
}
