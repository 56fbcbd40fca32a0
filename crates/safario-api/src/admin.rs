//! Admin panel: review role requests and reassign roles.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/roles` | `{pending, approved}` with owner details |
//! | `POST` | `/admin/roles/{user_id}/approve` | Pending requests only |
//! | `POST` | `/admin/roles/{user_id}/reject` | Falls back to approved `user` |
//! | `PUT`  | `/admin/roles/{user_id}` | `{role}`; approved on the spot |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use safario_core::{
  role::{Action, Role, RoleAssignment, RoleStatus},
  store::SafetyStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  reported::{Reported, with_profiles},
};

#[derive(Debug, Serialize)]
pub struct RoleBoard {
  pub pending:  Vec<Reported<RoleAssignment>>,
  pub approved: Vec<Reported<RoleAssignment>>,
}

/// `GET /admin/roles`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<RoleBoard>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ViewAdminPanel)?;

  let roles = state.store.list_roles().await.map_err(ApiError::store::<S>)?;
  let (pending, approved): (Vec<_>, Vec<_>) = with_profiles(&state, roles, |r| r.user_id)
    .await?
    .into_iter()
    .filter(|r| r.record.role_status != RoleStatus::Rejected)
    .partition(|r| r.record.role_status == RoleStatus::Pending);

  Ok(Json(RoleBoard { pending, approved }))
}

async fn load<S>(state: &AppState<S>, user_id: Uuid) -> Result<RoleAssignment, ApiError>
where
  S: SafetyStore + 'static,
{
  state
    .store
    .get_role(user_id)
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(|| ApiError::NotFound(format!("no role for user {user_id}")))
}

async fn save<S>(state: &AppState<S>, role: RoleAssignment) -> Result<Json<RoleAssignment>, ApiError>
where
  S: SafetyStore + 'static,
{
  state.store.update_role(role.clone()).await.map_err(ApiError::store::<S>)?;
  tracing::info!(user = %role.user_id, role = %role.role, status = %role.role_status, "role updated");
  Ok(Json(role))
}

/// `POST /admin/roles/{user_id}/approve`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(user_id): Path<Uuid>,
) -> Result<Json<RoleAssignment>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ManageRoles)?;
  let mut role = load(&state, user_id).await?;
  role.approve(Utc::now())?;
  save(&state, role).await
}

/// `POST /admin/roles/{user_id}/reject`
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(user_id): Path<Uuid>,
) -> Result<Json<RoleAssignment>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ManageRoles)?;
  let mut role = load(&state, user_id).await?;
  role.reject(Utc::now());
  save(&state, role).await
}

#[derive(Debug, Deserialize)]
pub struct ReassignBody {
  pub role: Role,
}

/// `PUT /admin/roles/{user_id}`
pub async fn reassign<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(user_id): Path<Uuid>,
  Json(body): Json<ReassignBody>,
) -> Result<Json<RoleAssignment>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ManageRoles)?;
  let mut role = load(&state, user_id).await?;
  role.reassign(body.role, Utc::now());
  save(&state, role).await
}
