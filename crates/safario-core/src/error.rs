//! Error types for `safario-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot move {entity} from {from} to {to}")]
  InvalidTransition {
    entity: &'static str,
    from:   String,
    to:     String,
  },

  #[error("invalid {field}: {reason}")]
  Invalid {
    field:  &'static str,
    reason: String,
  },

  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
