//! Error type for `safario-functions`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required credential is missing from the configuration.
  #[error("{0} not configured")]
  NotConfigured(&'static str),

  #[error("{0}")]
  InvalidPhone(String),

  /// The supplied one-time code was not accepted.
  #[error("{0}")]
  OtpRejected(&'static str),

  #[error("{service} request failed: {source}")]
  Http {
    service: &'static str,
    #[source]
    source:  reqwest::Error,
  },

  #[error("{service} responded with {status}")]
  Upstream {
    service: &'static str,
    status:  reqwest::StatusCode,
  },

  #[error("unexpected {service} response: {reason}")]
  Malformed {
    service: &'static str,
    reason:  String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
