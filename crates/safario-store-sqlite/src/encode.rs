//! Encoding and decoding helpers between Safario domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond precision
//! in UTC, so they sort lexically in time order. Enums are stored as their
//! lowercase string form. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use safario_core::{
  account::{Account, OtpChallenge, Session},
  contact::EmergencyContact,
  geo::Coordinates,
  profile::Profile,
  report::{EmergencyAlert, FirReport, LostItem},
  role::RoleAssignment,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode { column: "timestamp", reason: e.to_string() })
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode { column: "date_of_birth", reason: e.to_string() })
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode { column, reason: format!("unknown value {s:?}") })
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

fn decode_opt_location(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
  match (lat, lng) {
    (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
    _ => None,
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `COLUMNS` constant lists the columns its `from_row` reads, in order.

pub struct RawAccount {
  pub account_id:    String,
  pub email:         Option<String>,
  pub phone_number:  Option<String>,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawAccount {
  pub const COLUMNS: &'static str = "account_id, email, phone_number, password_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:    row.get(0)?,
      email:         row.get(1)?,
      phone_number:  row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  /// Splits into the public account and its password hash.
  pub fn into_parts(self) -> Result<(Account, Option<String>)> {
    let account = Account {
      account_id:   decode_uuid(&self.account_id)?,
      email:        self.email,
      phone_number: self.phone_number,
      created_at:   decode_dt(&self.created_at)?,
    };
    Ok((account, self.password_hash))
  }
}

pub struct RawSession {
  pub token_hash: String,
  pub account_id: String,
  pub created_at: String,
  pub expires_at: String,
}

impl RawSession {
  pub const COLUMNS: &'static str = "token_hash, account_id, created_at, expires_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_hash: row.get(0)?,
      account_id: row.get(1)?,
      created_at: row.get(2)?,
      expires_at: row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token_hash: self.token_hash,
      account_id: decode_uuid(&self.account_id)?,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

pub struct RawOtpChallenge {
  pub phone_number: String,
  pub code_hash:    String,
  pub expires_at:   String,
  pub attempts:     u32,
}

impl RawOtpChallenge {
  pub const COLUMNS: &'static str = "phone_number, code_hash, expires_at, attempts";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      phone_number: row.get(0)?,
      code_hash:    row.get(1)?,
      expires_at:   row.get(2)?,
      attempts:     row.get(3)?,
    })
  }

  pub fn into_challenge(self) -> Result<OtpChallenge> {
    Ok(OtpChallenge {
      phone_number: self.phone_number,
      code_hash:    self.code_hash,
      expires_at:   decode_dt(&self.expires_at)?,
      attempts:     self.attempts,
    })
  }
}

pub struct RawRole {
  pub user_id:     String,
  pub role:        String,
  pub role_status: String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawRole {
  pub const COLUMNS: &'static str = "user_id, role, role_status, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      role:        row.get(1)?,
      role_status: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_role(self) -> Result<RoleAssignment> {
    Ok(RoleAssignment {
      user_id:     decode_uuid(&self.user_id)?,
      role:        decode_enum("role", &self.role)?,
      role_status: decode_enum("role_status", &self.role_status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawProfile {
  pub user_id:            String,
  pub full_name:          String,
  pub date_of_birth:      String,
  pub gender:             String,
  pub passport_number:    Option<String>,
  pub aadhaar_number:     Option<String>,
  pub preferred_language: String,
  pub photo_url:          Option<String>,
  pub phone_number:       Option<String>,
  pub created_at:         String,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "user_id, full_name, date_of_birth, gender, passport_number, \
                                     aadhaar_number, preferred_language, photo_url, \
                                     phone_number, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:            row.get(0)?,
      full_name:          row.get(1)?,
      date_of_birth:      row.get(2)?,
      gender:             row.get(3)?,
      passport_number:    row.get(4)?,
      aadhaar_number:     row.get(5)?,
      preferred_language: row.get(6)?,
      photo_url:          row.get(7)?,
      phone_number:       row.get(8)?,
      created_at:         row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:            decode_uuid(&self.user_id)?,
      full_name:          self.full_name,
      date_of_birth:      decode_date(&self.date_of_birth)?,
      gender:             self.gender,
      passport_number:    self.passport_number,
      aadhaar_number:     self.aadhaar_number,
      preferred_language: self.preferred_language,
      photo_url:          self.photo_url,
      phone_number:       self.phone_number,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAlert {
  pub alert_id:       String,
  pub user_id:        String,
  pub location_lat:   f64,
  pub location_lng:   f64,
  pub alert_type:     String,
  pub status:         String,
  pub responder_id:   Option<String>,
  pub response_notes: Option<String>,
  pub responded_at:   Option<String>,
  pub created_at:     String,
}

impl RawAlert {
  pub const COLUMNS: &'static str = "alert_id, user_id, location_lat, location_lng, alert_type, \
                                     status, responder_id, response_notes, responded_at, \
                                     created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:       row.get(0)?,
      user_id:        row.get(1)?,
      location_lat:   row.get(2)?,
      location_lng:   row.get(3)?,
      alert_type:     row.get(4)?,
      status:         row.get(5)?,
      responder_id:   row.get(6)?,
      response_notes: row.get(7)?,
      responded_at:   row.get(8)?,
      created_at:     row.get(9)?,
    })
  }

  pub fn into_alert(self) -> Result<EmergencyAlert> {
    Ok(EmergencyAlert {
      alert_id:       decode_uuid(&self.alert_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      location:       Coordinates::new(self.location_lat, self.location_lng),
      alert_type:     self.alert_type,
      status:         decode_enum("status", &self.status)?,
      responder_id:   decode_opt_uuid(self.responder_id)?,
      response_notes: self.response_notes,
      responded_at:   decode_opt_dt(self.responded_at)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawFir {
  pub fir_id:        String,
  pub user_id:       String,
  pub fir_number:    String,
  pub incident_type: String,
  pub description:   String,
  pub location_lat:  f64,
  pub location_lng:  f64,
  pub status:        String,
  pub created_at:    String,
}

impl RawFir {
  pub const COLUMNS: &'static str = "fir_id, user_id, fir_number, incident_type, description, \
                                     location_lat, location_lng, status, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fir_id:        row.get(0)?,
      user_id:       row.get(1)?,
      fir_number:    row.get(2)?,
      incident_type: row.get(3)?,
      description:   row.get(4)?,
      location_lat:  row.get(5)?,
      location_lng:  row.get(6)?,
      status:        row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_fir(self) -> Result<FirReport> {
    Ok(FirReport {
      fir_id:        decode_uuid(&self.fir_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      fir_number:    self.fir_number,
      incident_type: decode_enum("incident_type", &self.incident_type)?,
      description:   self.description,
      location:      Coordinates::new(self.location_lat, self.location_lng),
      status:        decode_enum("status", &self.status)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawLostItem {
  pub item_id:      String,
  pub user_id:      String,
  pub item_name:    String,
  pub description:  String,
  pub image_url:    Option<String>,
  pub location_lat: Option<f64>,
  pub location_lng: Option<f64>,
  pub status:       String,
  pub found_at:     Option<String>,
  pub fir_id:       Option<String>,
  pub created_at:   String,
}

impl RawLostItem {
  pub const COLUMNS: &'static str = "item_id, user_id, item_name, description, image_url, \
                                     location_lat, location_lng, status, found_at, fir_id, \
                                     created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:      row.get(0)?,
      user_id:      row.get(1)?,
      item_name:    row.get(2)?,
      description:  row.get(3)?,
      image_url:    row.get(4)?,
      location_lat: row.get(5)?,
      location_lng: row.get(6)?,
      status:       row.get(7)?,
      found_at:     row.get(8)?,
      fir_id:       row.get(9)?,
      created_at:   row.get(10)?,
    })
  }

  pub fn into_item(self) -> Result<LostItem> {
    Ok(LostItem {
      item_id:     decode_uuid(&self.item_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      item_name:   self.item_name,
      description: self.description,
      image_url:   self.image_url,
      location:    decode_opt_location(self.location_lat, self.location_lng),
      status:      decode_enum("status", &self.status)?,
      found_at:    decode_opt_dt(self.found_at)?,
      fir_id:      decode_opt_uuid(self.fir_id)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawContact {
  pub contact_id:   String,
  pub user_id:      String,
  pub name:         String,
  pub relationship: String,
  pub phone:        String,
  pub email:        Option<String>,
  pub created_at:   String,
}

impl RawContact {
  pub const COLUMNS: &'static str =
    "contact_id, user_id, name, relationship, phone, email, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:   row.get(0)?,
      user_id:      row.get(1)?,
      name:         row.get(2)?,
      relationship: row.get(3)?,
      phone:        row.get(4)?,
      email:        row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_contact(self) -> Result<EmergencyContact> {
    Ok(EmergencyContact {
      contact_id:   decode_uuid(&self.contact_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      name:         self.name,
      relationship: self.relationship,
      phone:        self.phone,
      email:        self.email,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use safario_core::role::Role;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = DateTime::parse_from_rfc3339("2026-03-01T10:00:05.1Z").unwrap().with_timezone(&Utc);
    let b = DateTime::parse_from_rfc3339("2026-03-01T10:00:05.123Z")
      .unwrap()
      .with_timezone(&Utc);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_enum_value_is_a_decode_error() {
    assert!(matches!(
      decode_enum::<Role>("role", "superuser"),
      Err(Error::Decode { column: "role", .. })
    ));
  }
}
