//! Handlers for emergency (SOS) alerts.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/alerts` | Caller's alerts, newest first |
//! | `POST` | `/alerts` | `{lat, lng, alert_type?}` |
//! | `GET`  | `/authority/alerts` | All alerts with owner details |
//! | `POST` | `/authority/alerts/{id}/resolve` | `{response_notes}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use safario_core::{
  change::ChangeEvent,
  geo::Coordinates,
  report::{EmergencyAlert, NewAlert},
  role::Action,
  store::SafetyStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  reported::{Reported, with_profiles},
};

// ─── Tourist ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RaiseBody {
  pub lat:        f64,
  pub lng:        f64,
  #[serde(default)]
  pub alert_type: Option<String>,
}

/// `POST /alerts`
pub async fn raise<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<RaiseBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;
  let location = Coordinates::checked(body.lat, body.lng)?;

  let alert = state
    .store
    .create_alert(NewAlert::new(user.id(), location, body.alert_type))
    .await
    .map_err(ApiError::store::<S>)?;

  tracing::warn!(
    alert = %alert.alert_id,
    user = %alert.user_id,
    lat = location.lat,
    lng = location.lng,
    "emergency alert raised"
  );
  Ok((StatusCode::CREATED, Json(alert)))
}

/// `GET /alerts`
pub async fn list_own<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<EmergencyAlert>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let alerts = state.store.list_alerts(Some(user.id())).await.map_err(ApiError::store::<S>)?;
  Ok(Json(alerts))
}

// ─── Authority ───────────────────────────────────────────────────────────────

/// `GET /authority/alerts`
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<Reported<EmergencyAlert>>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ViewAuthorityPortal)?;
  let alerts = state.store.list_alerts(None).await.map_err(ApiError::store::<S>)?;
  Ok(Json(with_profiles(&state, alerts, |a| a.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub response_notes: String,
}

/// `POST /authority/alerts/{id}/resolve`
pub async fn resolve<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<EmergencyAlert>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::RespondToAlert)?;

  let mut alert = state
    .store
    .get_alert(id)
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(|| ApiError::NotFound(format!("alert {id} not found")))?;

  alert.resolve(user.id(), &body.response_notes, Utc::now())?;
  state.store.update_alert(alert.clone()).await.map_err(ApiError::store::<S>)?;

  tracing::info!(alert = %id, responder = %user.id(), "alert resolved");
  state.feed.publish(ChangeEvent::AlertUpdated(alert.clone()));
  Ok(Json(alert))
}
