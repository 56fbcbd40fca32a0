//! Roles, approval status, and the capability check that gates every
//! protected operation.
//!
//! Each account owns exactly one [`RoleAssignment`]. Privileged roles start
//! out `pending` and only grant their extra actions once an admin approves
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Authority,
  Admin,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleStatus {
  Pending,
  Approved,
  Rejected,
}

/// Everything a protected endpoint can ask permission for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  /// Profile, alerts, FIRs, lost items, contacts, geofencing.
  UseTouristFeatures,
  ViewAuthorityPortal,
  RespondToAlert,
  UpdateFirStatus,
  UpdateLostItemStatus,
  ViewAdminPanel,
  ManageRoles,
}

/// The single authorization rule for the whole application.
pub fn permits(role: Role, status: RoleStatus, action: Action) -> bool {
  let approved = status == RoleStatus::Approved;
  match action {
    Action::UseTouristFeatures => true,
    Action::ViewAuthorityPortal
    | Action::RespondToAlert
    | Action::UpdateFirStatus
    | Action::UpdateLostItemStatus => {
      approved && matches!(role, Role::Authority | Role::Admin)
    }
    Action::ViewAdminPanel | Action::ManageRoles => approved && role == Role::Admin,
  }
}

// ─── RoleAssignment ──────────────────────────────────────────────────────────

/// The one role row held by each account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
  pub user_id:     Uuid,
  pub role:        Role,
  pub role_status: RoleStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl RoleAssignment {
  /// A freshly requested role: plain users are approved immediately,
  /// authority and admin requests wait for an admin.
  pub fn requested(user_id: Uuid, role: Role, now: DateTime<Utc>) -> Self {
    let role_status = match role {
      Role::User => RoleStatus::Approved,
      Role::Authority | Role::Admin => RoleStatus::Pending,
    };
    Self { user_id, role, role_status, created_at: now, updated_at: now }
  }

  /// `pending` → `approved`, keeping the requested role.
  pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
    if self.role_status != RoleStatus::Pending {
      return Err(Error::InvalidTransition {
        entity: "role request",
        from:   self.role_status.to_string(),
        to:     RoleStatus::Approved.to_string(),
      });
    }
    self.role_status = RoleStatus::Approved;
    self.updated_at = now;
    Ok(())
  }

  /// Turn the request down: the account falls back to an approved `user`.
  pub fn reject(&mut self, now: DateTime<Utc>) {
    self.role = Role::User;
    self.role_status = RoleStatus::Approved;
    self.updated_at = now;
  }

  /// Admin override to any role, approved on the spot.
  pub fn reassign(&mut self, role: Role, now: DateTime<Utc>) {
    self.role = role;
    self.role_status = RoleStatus::Approved;
    self.updated_at = now;
  }

  pub fn permits(&self, action: Action) -> bool {
    permits(self.role, self.role_status, action)
  }

  pub fn granted_actions(&self) -> Vec<Action> {
    Action::iter().filter(|a| self.permits(*a)).collect()
  }
}
