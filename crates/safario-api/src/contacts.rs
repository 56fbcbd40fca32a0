//! Handlers for the caller's emergency contacts.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | |
//! | `POST`   | `/contacts` | `{name, relationship, phone, email?}` |
//! | `DELETE` | `/contacts/{id}` | 404 unless owned by the caller |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use safario_core::{
  contact::{EmergencyContact, NewContact},
  role::Action,
  store::SafetyStore,
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /contacts`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<EmergencyContact>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let contacts = state.store.list_contacts(user.id()).await.map_err(ApiError::store::<S>)?;
  Ok(Json(contacts))
}

/// `POST /contacts`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(mut body): Json<NewContact>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;
  body.user_id = user.id();
  let contact = state.store.add_contact(body.validate()?).await.map_err(ApiError::store::<S>)?;
  Ok((StatusCode::CREATED, Json(contact)))
}

/// `DELETE /contacts/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let removed = state.store.delete_contact(user.id(), id).await.map_err(ApiError::store::<S>)?;
  if removed {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("contact {id} not found")))
  }
}
