//! Accounts, sessions, and one-time-password challenges.
//!
//! Secrets never live in these types in the clear: sessions are looked up by
//! the SHA-256 digest of the bearer token, and OTP challenges hold only the
//! digest of the code that was texted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wrong guesses tolerated before an OTP challenge is thrown away.
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// An authenticated identity. Email/password and phone/OTP sign-ins both
/// resolve to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub account_id:   Uuid,
  pub email:        Option<String>,
  pub phone_number: Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// An account together with its stored argon2 PHC string.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub account:       Account,
  pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         Option<String>,
  pub phone_number:  Option<String>,
  pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  /// Hex SHA-256 of the bearer token handed to the client.
  pub token_hash: String,
  pub account_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
  /// Normalised E.164 number; at most one open challenge per number.
  pub phone_number: String,
  /// Hex SHA-256 of the six-digit code.
  pub code_hash:    String,
  pub expires_at:   DateTime<Utc>,
  pub attempts:     u32,
}

impl OtpChallenge {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }

  pub fn is_exhausted(&self) -> bool { self.attempts >= MAX_OTP_ATTEMPTS }
}
