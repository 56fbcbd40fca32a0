//! Error type for `safario-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] safario_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A column held text that does not decode into its domain type.
  #[error("cannot decode {column}: {reason}")]
  Decode {
    column: &'static str,
    reason: String,
  },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// A uniqueness constraint rejected the write.
  #[error("conflict: {0}")]
  Conflict(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
