//! Process wiring for the Safario server: configuration, the outer router
//! and the admin bootstrap.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header},
};
use chrono::Utc;
use safario_api::{ApiConfig, AppState, GeofenceConfig};
use safario_core::{
  role::{Role, RoleAssignment},
  store::SafetyStore,
};
use safario_functions::FunctionsConfig;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  services::ServeDir,
  set_header::SetResponseHeaderLayer,
  trace::TraceLayer,
};

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("safario.db") }
fn default_storage_dir() -> PathBuf { PathBuf::from("storage") }
fn default_public_base_url() -> String { "http://localhost:8080".to_owned() }
fn default_session_ttl_hours() -> i64 { 168 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `SAFARIO__*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default = "default_storage_dir")]
  pub storage_dir:       PathBuf,
  #[serde(default = "default_public_base_url")]
  pub public_base_url:   String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  /// Browser origins allowed to call `/api`. `"*"` allows any.
  #[serde(default)]
  pub cors_origins:      Vec<String>,
  #[serde(default)]
  pub functions:         FunctionsConfig,
  #[serde(default)]
  pub geofence:          GeofenceConfig,
}

impl ServerConfig {
  /// Resolve `~` in the configured paths.
  pub fn expand_paths(mut self) -> Self {
    self.store_path = expand_tilde(&self.store_path);
    self.storage_dir = expand_tilde(&self.storage_dir);
    self
  }

  /// Check the values serde cannot: geofence radii and danger-zone centres.
  pub fn validate(&self) -> anyhow::Result<()> {
    for zone in &self.geofence.danger_zones {
      zone.validate().with_context(|| format!("invalid danger zone {:?}", zone.name))?;
    }
    self.geofence.validate().context("invalid geofence settings")
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      storage_dir:       self.storage_dir.clone(),
      public_base_url:   self.public_base_url.clone(),
      session_ttl_hours: self.session_ttl_hours,
      geofence:          self.geofence.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn api_cors(origins: &[String]) -> CorsLayer {
  let allow_origin = if origins.iter().any(|o| o == "*") {
    AllowOrigin::any()
  } else {
    AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
  };

  CorsLayer::new()
    .allow_origin(allow_origin)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, HeaderName::from_static("apikey")])
}

/// The full application: `/api`, `/functions/v1` and uploaded files under
/// `/storage`.
pub fn build_app<S>(state: AppState<S>, config: &ServerConfig) -> Router
where
  S: SafetyStore + Clone + 'static,
{
  Router::new()
    .nest(
      "/api",
      safario_api::api_router(state.clone()).layer(api_cors(&config.cors_origins)),
    )
    .nest("/functions/v1", safario_api::functions_router(state))
    .nest_service(
      "/storage",
      ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
          header::X_CONTENT_TYPE_OPTIONS,
          HeaderValue::from_static("nosniff"),
        ))
        .service(ServeDir::new(&config.storage_dir)),
    )
    .layer(TraceLayer::new_for_http())
}

// ─── Admin bootstrap ─────────────────────────────────────────────────────────

/// Make the account registered under `email` an approved admin.
pub async fn grant_admin<S>(store: &S, email: &str) -> anyhow::Result<RoleAssignment>
where
  S: SafetyStore,
{
  let creds = store
    .find_credentials_by_email(email.trim().to_lowercase())
    .await
    .context("failed to look up account")?
    .with_context(|| format!("no account registered with email {email}"))?;
  let user_id = creds.account.account_id;
  let now = Utc::now();

  match store.get_role(user_id).await.context("failed to load role")? {
    Some(mut role) => {
      role.reassign(Role::Admin, now);
      store.update_role(role.clone()).await.context("failed to update role")?;
      Ok(role)
    }
    None => {
      let mut role = RoleAssignment::requested(user_id, Role::Admin, now);
      role.reassign(Role::Admin, now);
      store.insert_role(role.clone()).await.context("failed to insert role")?;
      Ok(role)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use safario_core::{account::NewAccount, role::RoleStatus};
  use safario_functions::Functions;
  use safario_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn config(storage_dir: PathBuf) -> ServerConfig {
    ServerConfig {
      host:              default_host(),
      port:              0,
      store_path:        PathBuf::from(":memory:"),
      storage_dir,
      public_base_url:   default_public_base_url(),
      session_ttl_hours: 1,
      cors_origins:      vec!["https://app.safario.example".to_owned()],
      functions:         FunctionsConfig::default(),
      geofence:          GeofenceConfig::default(),
    }
  }

  async fn make_app(config: &ServerConfig) -> (Router, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let state = AppState::new(
      store.clone(),
      config.api_config(),
      Functions::new(&config.functions).unwrap(),
    );
    (build_app(state, config), store)
  }

  #[tokio::test]
  async fn storage_files_are_served() {
    let dir = std::env::temp_dir().join(format!("safario-server-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("lost-items")).unwrap();
    std::fs::write(dir.join("lost-items/bag.png"), b"png").unwrap();
    let cfg = config(dir.clone());
    let (app, _) = make_app(&cfg).await;

    let req = Request::builder()
      .uri("/storage/lost-items/bag.png")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"png");
    std::fs::remove_dir_all(dir).ok();
  }

  #[tokio::test]
  async fn api_cors_allows_configured_origin_only() {
    let cfg = config(std::env::temp_dir());
    let preflight = |origin: &str| {
      Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/me")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
    };

    let (app, _) = make_app(&cfg).await;
    let resp = app.clone().oneshot(preflight("https://app.safario.example")).await.unwrap();
    assert_eq!(
      resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
      "https://app.safario.example"
    );

    let resp = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
  }

  #[tokio::test]
  async fn functions_are_mounted() {
    let (app, _) = make_app(&config(std::env::temp_dir())).await;
    let req = Request::builder()
      .uri("/functions/v1/map-token")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["token"], "");
  }

  #[tokio::test]
  async fn grant_admin_promotes_existing_account() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let account = store
      .create_account(NewAccount {
        email:         Some("chief@example.com".into()),
        phone_number:  None,
        password_hash: None,
      })
      .await
      .unwrap();
    store
      .insert_role(RoleAssignment::requested(account.account_id, Role::User, Utc::now()))
      .await
      .unwrap();

    let role = grant_admin(&store, "Chief@Example.com").await.unwrap();
    assert_eq!((role.role, role.role_status), (Role::Admin, RoleStatus::Approved));
    let stored = store.get_role(account.account_id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Admin);

    assert!(grant_admin(&store, "nobody@example.com").await.is_err());
  }

  #[test]
  fn bad_danger_zones_fail_validation() {
    let zone = |lat: f64, radius_m: f64| safario_api::DangerZoneConfig {
      name: "Old Market".to_owned(),
      lat,
      lng: 72.57,
      radius_m,
    };
    let mut cfg = config(std::env::temp_dir());
    cfg.geofence.danger_zones = vec![zone(23.02, 200.0)];
    assert!(cfg.validate().is_ok());

    for bad in [zone(123.0, 200.0), zone(23.02, 0.0), zone(23.02, f64::NAN)] {
      cfg.geofence.danger_zones = vec![bad];
      let err = cfg.validate().unwrap_err();
      assert!(format!("{err:#}").contains("Old Market"), "{err:#}");
    }

    cfg.geofence.danger_zones.clear();
    cfg.geofence.safe_radius_m = -5.0;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/srv/x.db")), PathBuf::from("/srv/x.db"));
  }
}
