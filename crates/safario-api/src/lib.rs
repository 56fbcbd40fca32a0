//! JSON REST API for Safario.
//!
//! Exposes two axum [`Router`]s over any [`SafetyStore`]: the application API
//! and the proxy functions. TLS, static files and process concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .nest("/api", safario_api::api_router(state.clone()))
//!   .nest("/functions/v1", safario_api::functions_router(state))
//! ```

pub mod admin;
pub mod alerts;
pub mod auth;
pub mod contacts;
pub mod error;
pub mod firs;
pub mod functions;
pub mod geofence;
pub mod lost_items;
pub mod profile;
pub mod realtime;
pub mod reported;

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post, put},
};
use safario_core::{
  geo::Coordinates,
  geofence::{GeofenceMonitor, Zone},
  store::SafetyStore,
};
use safario_functions::Functions;
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

pub use error::ApiError;
pub use realtime::ChangeFeed;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_session_ttl_hours() -> i64 { 168 }
fn default_safe_radius_m() -> f64 { 1_000.0 }

/// Settings the handlers need at request time.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Root directory for uploaded files.
  pub storage_dir:       PathBuf,
  /// External URL prefix under which `storage_dir` is served.
  pub public_base_url:   String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  #[serde(default)]
  pub geofence:          GeofenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeofenceConfig {
  /// Safe-perimeter radius used when a session does not name one.
  #[serde(default = "default_safe_radius_m")]
  pub safe_radius_m: f64,
  #[serde(default)]
  pub danger_zones:  Vec<DangerZoneConfig>,
}

impl Default for GeofenceConfig {
  fn default() -> Self {
    Self { safe_radius_m: default_safe_radius_m(), danger_zones: Vec::new() }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DangerZoneConfig {
  pub name:     String,
  pub lat:      f64,
  pub lng:      f64,
  pub radius_m: f64,
}

impl DangerZoneConfig {
  pub fn validate(&self) -> safario_core::Result<()> {
    Coordinates::checked(self.lat, self.lng)?;
    positive_radius("radius_m", self.radius_m)
  }
}

fn positive_radius(field: &'static str, radius_m: f64) -> safario_core::Result<()> {
  if radius_m.is_finite() && radius_m > 0.0 {
    Ok(())
  } else {
    Err(safario_core::Error::Invalid {
      field,
      reason: format!("{radius_m} is not a positive radius"),
    })
  }
}

impl GeofenceConfig {
  /// Reject a non-positive radius or a danger zone whose centre is not a
  /// valid position.
  pub fn validate(&self) -> safario_core::Result<()> {
    positive_radius("safe_radius_m", self.safe_radius_m)?;
    for zone in &self.danger_zones {
      zone.validate()?;
    }
    Ok(())
  }

  /// Danger zones as configured. Call [`GeofenceConfig::validate`] first.
  pub fn zones(&self) -> Vec<Zone> {
    self
      .danger_zones
      .iter()
      .map(|z| Zone::new(z.name.clone(), Coordinates::new(z.lat, z.lng), z.radius_m))
      .collect()
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: SafetyStore> {
  pub store:     Arc<S>,
  pub config:    Arc<ApiConfig>,
  pub functions: Arc<Functions>,
  pub feed:      ChangeFeed,
  /// Live geofence sessions, one per user.
  pub monitors:  Arc<Mutex<HashMap<Uuid, GeofenceMonitor>>>,
}

impl<S: SafetyStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig, functions: Functions) -> Self {
    Self {
      store,
      config: Arc::new(config),
      functions: Arc::new(functions),
      feed: ChangeFeed::default(),
      monitors: Arc::default(),
    }
  }
}

// ─── Routers ─────────────────────────────────────────────────────────────────

/// The application API, to be nested under `/api`.
pub fn api_router<S>(state: AppState<S>) -> Router
where
  S: SafetyStore + Clone + 'static,
{
  Router::new()
    // Auth
    .route("/auth/signup", post(auth::signup::<S>))
    .route("/auth/signin", post(auth::signin::<S>))
    .route("/auth/otp/verify", post(auth::verify_otp::<S>))
    .route("/auth/signout", post(auth::signout::<S>))
    .route("/me", get(auth::me::<S>))
    // Profile & digital ID
    .route(
      "/profile",
      get(profile::get_own::<S>).post(profile::create::<S>).patch(profile::update::<S>),
    )
    .route("/id-card", get(profile::id_card::<S>))
    // Tourist records
    .route("/alerts", get(alerts::list_own::<S>).post(alerts::raise::<S>))
    .route("/firs", get(firs::list_own::<S>).post(firs::file::<S>))
    .route("/lost-items", get(lost_items::list_own::<S>).post(lost_items::file::<S>))
    .route(
      "/lost-items/images",
      post(lost_items::upload_image::<S>)
        .layer(DefaultBodyLimit::max(lost_items::MAX_IMAGE_BYTES + 1)),
    )
    .route("/contacts", get(contacts::list::<S>).post(contacts::add::<S>))
    .route("/contacts/{id}", delete(contacts::remove::<S>))
    // Geofencing
    .route("/geofence/session", post(geofence::start::<S>).delete(geofence::stop::<S>))
    .route("/geofence/positions", post(geofence::observe::<S>))
    .route("/geofence/map", get(geofence::map::<S>))
    // Realtime
    .route("/realtime", get(realtime::subscribe::<S>))
    // Authority portal
    .route("/authority/alerts", get(alerts::list_all::<S>))
    .route("/authority/alerts/{id}/resolve", post(alerts::resolve::<S>))
    .route("/authority/firs", get(firs::list_all::<S>))
    .route("/authority/firs/{id}/status", put(firs::set_status::<S>))
    .route("/authority/lost-items", get(lost_items::list_all::<S>))
    .route("/authority/lost-items/{id}/status", put(lost_items::set_status::<S>))
    // Admin panel
    .route("/admin/roles", get(admin::list::<S>))
    .route("/admin/roles/{user_id}", put(admin::reassign::<S>))
    .route("/admin/roles/{user_id}/approve", post(admin::approve::<S>))
    .route("/admin/roles/{user_id}/reject", post(admin::reject::<S>))
    .with_state(state)
}

/// The proxy functions, to be nested under `/functions/v1`. Answers CORS
/// preflight for any origin.
pub fn functions_router<S>(state: AppState<S>) -> Router
where
  S: SafetyStore + Clone + 'static,
{
  Router::new()
    .route("/map-token", get(functions::map_token::<S>).post(functions::map_token::<S>))
    .route("/weather", post(functions::weather::<S>))
    .route("/location-places", post(functions::location_places::<S>))
    .route("/send-otp", post(functions::send_otp::<S>))
    .layer(functions::cors())
    .with_state(state)
}
