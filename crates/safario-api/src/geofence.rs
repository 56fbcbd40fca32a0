//! Live geofencing sessions.
//!
//! The client starts a session at its current position, then streams
//! positions; each response carries only the zone crossings that position
//! caused.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/geofence/session` | `{lat, lng, radius_m?}`; replaces any running session |
//! | `DELETE` | `/geofence/session` | |
//! | `POST`   | `/geofence/positions` | `{lat, lng}` |
//! | `GET`    | `/geofence/map` | GeoJSON of the zones and last position |

use axum::{Json, extract::State, http::StatusCode};
use safario_core::{
  geo::Coordinates,
  geofence::{Geofence, GeofenceEvent, GeofenceMonitor, Notification},
  role::Action,
  store::SafetyStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::CurrentUser, error::ApiError};

fn no_session() -> ApiError {
  ApiError::NotFound("geofencing is not active; start a session first".to_owned())
}

#[derive(Debug, Serialize)]
pub struct Observation {
  pub events:                Vec<GeofenceEvent>,
  pub notifications:         Vec<Notification>,
  pub inside_safe_perimeter: bool,
  pub active_danger_zones:   Vec<String>,
}

impl Observation {
  fn new(monitor: &GeofenceMonitor, events: Vec<GeofenceEvent>) -> Self {
    Self {
      notifications:         events.iter().filter_map(GeofenceEvent::notification).collect(),
      events,
      inside_safe_perimeter: monitor.inside_safe_perimeter(),
      active_danger_zones:   monitor
        .active_danger_zones()
        .into_iter()
        .map(str::to_owned)
        .collect(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct Started {
  pub geofence:    Geofence,
  #[serde(flatten)]
  pub observation: Observation,
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub lat:      f64,
  pub lng:      f64,
  #[serde(default)]
  pub radius_m: Option<f64>,
}

/// `POST /geofence/session`
pub async fn start<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<StartBody>,
) -> Result<Json<Started>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;
  let origin = Coordinates::checked(body.lat, body.lng)?;
  let radius_m = body.radius_m.unwrap_or(state.config.geofence.safe_radius_m);
  if !(radius_m.is_finite() && radius_m > 0.0) {
    return Err(ApiError::BadRequest("radius_m must be a positive number".to_owned()));
  }

  let mut monitor =
    GeofenceMonitor::new(Geofence::around(origin, radius_m, state.config.geofence.zones()));
  let events = monitor.observe(origin);
  let started = Started {
    geofence:    monitor.geofence().clone(),
    observation: Observation::new(&monitor, events),
  };

  state.monitors.lock().await.insert(user.id(), monitor);
  tracing::debug!(user = %user.id(), radius_m, "geofencing started");
  Ok(Json(started))
}

/// `DELETE /geofence/session`
pub async fn stop<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  if state.monitors.lock().await.remove(&user.id()).is_some() {
    tracing::debug!(user = %user.id(), "geofencing stopped");
  }
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PositionBody {
  pub lat: f64,
  pub lng: f64,
}

/// `POST /geofence/positions`
pub async fn observe<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<PositionBody>,
) -> Result<Json<Observation>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let position = Coordinates::checked(body.lat, body.lng)?;

  let mut monitors = state.monitors.lock().await;
  let monitor = monitors.get_mut(&user.id()).ok_or_else(no_session)?;
  let events = monitor.observe(position);
  if !events.is_empty() {
    tracing::debug!(user = %user.id(), count = events.len(), "geofence transitions");
  }
  Ok(Json(Observation::new(monitor, events)))
}

/// `GET /geofence/map`
pub async fn map<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let monitors = state.monitors.lock().await;
  let monitor = monitors.get(&user.id()).ok_or_else(no_session)?;
  Ok(Json(monitor.geofence().to_geojson(monitor.last_position())))
}
