//! Handlers for FIR (First Information Report) filing and review.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/firs` | Caller's reports, newest first |
//! | `POST` | `/firs` | `{incident_type, description, lat, lng}` |
//! | `GET`  | `/authority/firs` | All reports with owner details |
//! | `PUT`  | `/authority/firs/{id}/status` | `{status}`; forward moves only |

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
  report::{FirReport, FirStatus, IncidentType, NewFirReport},
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

#[derive(Debug, Deserialize)]
pub struct FileBody {
  pub incident_type: IncidentType,
  pub description:   String,
  pub lat:           f64,
  pub lng:           f64,
}

/// `POST /firs`
pub async fn file<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<FileBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;
  let location = Coordinates::checked(body.lat, body.lng)?;
  let input =
    NewFirReport::new(user.id(), body.incident_type, &body.description, location, Utc::now())?;

  let report = state.store.create_fir(input).await.map_err(ApiError::store::<S>)?;
  tracing::info!(fir = %report.fir_number, user = %report.user_id, "FIR filed");
  Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /firs`
pub async fn list_own<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<FirReport>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let reports = state.store.list_firs(Some(user.id())).await.map_err(ApiError::store::<S>)?;
  Ok(Json(reports))
}

/// `GET /authority/firs`
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<Reported<FirReport>>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ViewAuthorityPortal)?;
  let reports = state.store.list_firs(None).await.map_err(ApiError::store::<S>)?;
  Ok(Json(with_profiles(&state, reports, |r| r.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: FirStatus,
}

/// `PUT /authority/firs/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<FirReport>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UpdateFirStatus)?;

  let mut report = state
    .store
    .get_fir(id)
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(|| ApiError::NotFound(format!("FIR {id} not found")))?;

  report.advance(body.status)?;
  state.store.update_fir(report.clone()).await.map_err(ApiError::store::<S>)?;

  tracing::info!(fir = %report.fir_number, status = %report.status, "FIR status updated");
  state.feed.publish(ChangeEvent::FirUpdated(report.clone()));
  Ok(Json(report))
}
