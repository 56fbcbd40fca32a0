//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use safario_core::store::SafetyStore;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  /// A third-party service failed or is not configured.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend error. Uniqueness violations become [`ApiError::Conflict`]
  /// so a write that loses a race still answers 409.
  pub fn store<S: SafetyStore>(e: S::Error) -> Self {
    if S::is_conflict(&e) { Self::Conflict(e.to_string()) } else { Self::Store(Box::new(e)) }
  }

  pub fn unauthorized() -> Self { Self::Unauthorized("sign in required".to_owned()) }
}

impl From<safario_core::Error> for ApiError {
  fn from(e: safario_core::Error) -> Self {
    use safario_core::Error as E;
    match e {
      E::InvalidTransition { .. } => Self::Conflict(e.to_string()),
      E::Invalid { .. } | E::UnknownVariant { .. } => Self::BadRequest(e.to_string()),
      E::Serialization(_) => Self::Internal(e.to_string()),
    }
  }
}

impl From<safario_functions::Error> for ApiError {
  fn from(e: safario_functions::Error) -> Self {
    use safario_functions::Error as E;
    match e {
      E::InvalidPhone(m) => Self::BadRequest(m),
      E::OtpRejected(m) => Self::Unauthorized(m.to_owned()),
      E::Store(inner) => Self::Store(inner),
      E::NotConfigured(_) | E::Http { .. } | E::Upstream { .. } | E::Malformed { .. } => {
        Self::Upstream(e.to_string())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
      ApiError::Upstream(m) | ApiError::Internal(m) => {
        (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
