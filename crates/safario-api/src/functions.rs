//! Thin HTTP wrappers over [`safario_functions`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`/`POST` | `/map-token` | `{token}` |
//! | `POST` | `/weather` | `{lat, lng}` → `{temp, condition, humidity, description}` |
//! | `POST` | `/location-places` | `{lat?, lng?}` → always 200 `{data: {city, places}}` |
//! | `POST` | `/send-otp` | `{phoneNumber}` → `{success: true}` |

use axum::{
  Json,
  extract::State,
  http::{HeaderName, Method},
};
use bytes::Bytes;
use chrono::Utc;
use safario_core::store::SafetyStore;
use safario_functions::{MapToken, places::NearbyPlaces, weather::Weather};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{AppState, error::ApiError};

/// Any origin may call the functions, with the headers browser SDK clients
/// send.
pub fn cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([
      HeaderName::from_static("authorization"),
      HeaderName::from_static("x-client-info"),
      HeaderName::from_static("apikey"),
      HeaderName::from_static("content-type"),
    ])
}

/// `GET|POST /map-token`
pub async fn map_token<S>(State(state): State<AppState<S>>) -> Json<MapToken>
where
  S: SafetyStore + Clone + 'static,
{
  Json(state.functions.map_token())
}

#[derive(Debug, Deserialize)]
pub struct PositionBody {
  #[serde(default)]
  pub lat: Option<f64>,
  #[serde(default)]
  pub lng: Option<f64>,
}

/// `POST /weather`
pub async fn weather<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<PositionBody>,
) -> Result<Json<Weather>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let (Some(lat), Some(lng)) = (body.lat, body.lng) else {
    return Err(ApiError::BadRequest("lat and lng are required".to_owned()));
  };
  match state.functions.weather.current(lat, lng).await {
    Ok(weather) => Ok(Json(weather)),
    Err(e) => {
      tracing::warn!(error = %e, "weather lookup failed");
      Err(e.into())
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PlacesResponse {
  pub data: NearbyPlaces,
}

/// `POST /location-places`
///
/// The body is parsed by hand: a missing or unreadable body still gets the
/// default destinations.
pub async fn location_places<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Json<PlacesResponse>
where
  S: SafetyStore + Clone + 'static,
{
  let (lat, lng) = match serde_json::from_slice::<PositionBody>(&body) {
    Ok(position) => (position.lat, position.lng),
    Err(e) => {
      tracing::debug!(error = %e, "unreadable places request, using defaults");
      (None, None)
    }
  };
  Json(PlacesResponse { data: state.functions.places.lookup(lat, lng).await })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpBody {
  pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct Sent {
  pub success: bool,
}

/// `POST /send-otp`
pub async fn send_otp<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SendOtpBody>,
) -> Result<Json<Sent>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  state
    .functions
    .otp
    .issue(state.store.as_ref(), &body.phone_number, Utc::now())
    .await
    .inspect_err(|e| tracing::warn!(error = %e, "otp dispatch failed"))?;
  Ok(Json(Sent { success: true }))
}
