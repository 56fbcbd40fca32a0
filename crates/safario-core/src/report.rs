//! Incident records: emergency alerts, FIR reports, and lost items.
//!
//! Each record is created by its owner and afterwards only moved along its
//! status workflow by an authority. The transition rules live here so every
//! caller applies them the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, geo::Coordinates};

// ─── Emergency alerts ────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertStatus {
  Active,
  Resolved,
}

pub const DEFAULT_ALERT_TYPE: &str = "emergency";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
  pub alert_id:       Uuid,
  pub user_id:        Uuid,
  pub location:       Coordinates,
  pub alert_type:     String,
  pub status:         AlertStatus,
  pub responder_id:   Option<Uuid>,
  pub response_notes: Option<String>,
  pub responded_at:   Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
  pub user_id:    Uuid,
  pub location:   Coordinates,
  pub alert_type: String,
}

impl NewAlert {
  pub fn new(user_id: Uuid, location: Coordinates, alert_type: Option<String>) -> Self {
    let alert_type = alert_type
      .map(|t| t.trim().to_owned())
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| DEFAULT_ALERT_TYPE.to_owned());
    Self { user_id, location, alert_type }
  }
}

impl EmergencyAlert {
  /// `active` → `resolved`, recording who responded and what they did.
  pub fn resolve(&mut self, responder_id: Uuid, notes: &str, now: DateTime<Utc>) -> Result<()> {
    let notes = notes.trim();
    if notes.is_empty() {
      return Err(Error::invalid("response_notes", "must not be empty"));
    }
    if self.status != AlertStatus::Active {
      return Err(Error::InvalidTransition {
        entity: "alert",
        from:   self.status.to_string(),
        to:     AlertStatus::Resolved.to_string(),
      });
    }
    self.status = AlertStatus::Resolved;
    self.responder_id = Some(responder_id);
    self.response_notes = Some(notes.to_owned());
    self.responded_at = Some(now);
    Ok(())
  }
}

// ─── FIR reports ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentType {
  Theft,
  Assault,
  Fraud,
  LostDocuments,
  Accident,
  Harassment,
  Other,
}

/// Forward-only lifecycle: `filed` → `investigating` → `closed`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FirStatus {
  Filed,
  Investigating,
  Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirReport {
  pub fir_id:        Uuid,
  pub user_id:       Uuid,
  pub fir_number:    String,
  pub incident_type: IncidentType,
  pub description:   String,
  pub location:      Coordinates,
  pub status:        FirStatus,
  pub created_at:    DateTime<Utc>,
}

impl FirReport {
  /// Move the report strictly forward; staying put or going back is refused.
  pub fn advance(&mut self, next: FirStatus) -> Result<()> {
    if next <= self.status {
      return Err(Error::InvalidTransition {
        entity: "FIR",
        from:   self.status.to_string(),
        to:     next.to_string(),
      });
    }
    self.status = next;
    Ok(())
  }
}

/// Input to [`crate::store::SafetyStore::create_fir`]. The FIR number is
/// assigned on construction.
#[derive(Debug, Clone)]
pub struct NewFirReport {
  pub user_id:       Uuid,
  pub fir_number:    String,
  pub incident_type: IncidentType,
  pub description:   String,
  pub location:      Coordinates,
}

impl NewFirReport {
  pub fn new(
    user_id: Uuid,
    incident_type: IncidentType,
    description: &str,
    location: Coordinates,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    let description = description.trim();
    if description.is_empty() {
      return Err(Error::invalid("description", "must not be empty"));
    }
    Ok(Self {
      user_id,
      fir_number: fir_number("FIR", now),
      incident_type,
      description: description.to_owned(),
      location,
    })
  }

  /// The report filed automatically alongside a lost item.
  pub fn for_lost_item(
    user_id: Uuid,
    item_name: &str,
    item_description: &str,
    location: Coordinates,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      user_id,
      fir_number: fir_number("FIR-LOST-", now),
      incident_type: IncidentType::LostDocuments,
      description: format!(
        "Lost Item Report: {item_name}\n\nDescription: {item_description}\n\n\
         This FIR was automatically generated for a lost item report."
      ),
      location,
    }
  }
}

/// `<prefix><unix millis><0..999>`.
fn fir_number(prefix: &str, now: DateTime<Utc>) -> String {
  let salt = Uuid::new_v4().as_u128() % 1_000;
  format!("{prefix}{}{salt}", now.timestamp_millis())
}

// ─── Lost items ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LostItemStatus {
  Lost,
  Found,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostItem {
  pub item_id:     Uuid,
  pub user_id:     Uuid,
  pub item_name:   String,
  pub description: String,
  pub image_url:   Option<String>,
  pub location:    Option<Coordinates>,
  pub status:      LostItemStatus,
  pub found_at:    Option<DateTime<Utc>>,
  /// The FIR filed together with this item, if it had a location.
  pub fir_id:      Option<Uuid>,
  pub created_at:  DateTime<Utc>,
}

impl LostItem {
  /// `found` stamps `found_at`; going back to `lost` clears it.
  pub fn set_status(&mut self, status: LostItemStatus, now: DateTime<Utc>) {
    self.found_at = match status {
      LostItemStatus::Found => Some(self.found_at.unwrap_or(now)),
      LostItemStatus::Lost => None,
    };
    self.status = status;
  }
}

#[derive(Debug, Clone)]
pub struct NewLostItem {
  pub user_id:     Uuid,
  pub item_name:   String,
  pub description: String,
  pub image_url:   Option<String>,
  pub location:    Option<Coordinates>,
}

impl NewLostItem {
  pub fn new(
    user_id: Uuid,
    item_name: &str,
    description: &str,
    image_url: Option<String>,
    location: Option<Coordinates>,
  ) -> Result<Self> {
    let item_name = item_name.trim();
    if item_name.is_empty() {
      return Err(Error::invalid("item_name", "must not be empty"));
    }
    Ok(Self {
      user_id,
      item_name: item_name.to_owned(),
      description: description.trim().to_owned(),
      image_url,
      location,
    })
  }

  /// The FIR to file with this item: exactly one when a location is known,
  /// none otherwise.
  pub fn linked_fir(&self, now: DateTime<Utc>) -> Option<NewFirReport> {
    self.location.map(|location| {
      NewFirReport::for_lost_item(
        self.user_id,
        &self.item_name,
        &self.description,
        location,
        now,
      )
    })
  }
}

/// Result of filing a lost item: the item and its linked FIR, if any.
#[derive(Debug, Clone, Serialize)]
pub struct LostItemFiling {
  pub item: LostItem,
  pub fir:  Option<FirReport>,
}

#[cfg(test)]
mod tests {
  use super::*;

  const HERE: Coordinates = Coordinates::new(22.7196, 75.8577);

  fn fir(status: FirStatus) -> FirReport {
    FirReport {
      fir_id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      fir_number: "FIR1".into(),
      incident_type: IncidentType::Theft,
      description: "wallet".into(),
      location: HERE,
      status,
      created_at: Utc::now(),
    }
  }

  fn is_fir_number(s: &str, prefix: &str) -> bool {
    s.strip_prefix(prefix)
      .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
  }

  #[test]
  fn fir_moves_forward_only() {
    let mut f = fir(FirStatus::Filed);
    f.advance(FirStatus::Investigating).unwrap();
    f.advance(FirStatus::Closed).unwrap();
    assert!(f.advance(FirStatus::Investigating).is_err());
    assert!(f.advance(FirStatus::Closed).is_err());
  }

  #[test]
  fn fir_may_skip_investigation() {
    let mut f = fir(FirStatus::Filed);
    f.advance(FirStatus::Closed).unwrap();
    assert_eq!(f.status, FirStatus::Closed);
  }

  #[test]
  fn new_fir_gets_plain_number() {
    let f = NewFirReport::new(Uuid::new_v4(), IncidentType::Fraud, "scam", HERE, Utc::now())
      .unwrap();
    assert!(is_fir_number(&f.fir_number, "FIR"), "{}", f.fir_number);
  }

  #[test]
  fn new_fir_requires_description() {
    assert!(
      NewFirReport::new(Uuid::new_v4(), IncidentType::Other, "  ", HERE, Utc::now()).is_err()
    );
  }

  #[test]
  fn lost_item_with_location_links_one_lost_documents_fir() {
    let item =
      NewLostItem::new(Uuid::new_v4(), "Passport", "blue cover", None, Some(HERE)).unwrap();
    let linked = item.linked_fir(Utc::now()).expect("linked fir");
    assert_eq!(linked.incident_type, IncidentType::LostDocuments);
    assert!(is_fir_number(&linked.fir_number, "FIR-LOST-"), "{}", linked.fir_number);
    assert!(linked.description.starts_with("Lost Item Report: Passport"));
    assert_eq!(linked.user_id, item.user_id);
  }

  #[test]
  fn lost_item_without_location_links_nothing() {
    let item = NewLostItem::new(Uuid::new_v4(), "Phone", "", None, None).unwrap();
    assert!(item.linked_fir(Utc::now()).is_none());
  }

  #[test]
  fn lost_item_found_then_lost_again() {
    let mut item = LostItem {
      item_id:     Uuid::new_v4(),
      user_id:     Uuid::new_v4(),
      item_name:   "Camera".into(),
      description: String::new(),
      image_url:   None,
      location:    None,
      status:      LostItemStatus::Lost,
      found_at:    None,
      fir_id:      None,
      created_at:  Utc::now(),
    };
    item.set_status(LostItemStatus::Found, Utc::now());
    assert!(item.found_at.is_some());
    item.set_status(LostItemStatus::Lost, Utc::now());
    assert!(item.found_at.is_none());
  }

  #[test]
  fn alert_resolution_needs_notes_and_happens_once() {
    let mut alert = EmergencyAlert {
      alert_id:       Uuid::new_v4(),
      user_id:        Uuid::new_v4(),
      location:       HERE,
      alert_type:     DEFAULT_ALERT_TYPE.into(),
      status:         AlertStatus::Active,
      responder_id:   None,
      response_notes: None,
      responded_at:   None,
      created_at:     Utc::now(),
    };
    let officer = Uuid::new_v4();
    assert!(alert.resolve(officer, "   ", Utc::now()).is_err());
    alert.resolve(officer, "Patrol dispatched", Utc::now()).unwrap();
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(alert.responder_id, Some(officer));
    assert!(alert.resolve(officer, "again", Utc::now()).is_err());
  }

  #[test]
  fn blank_alert_type_defaults_to_emergency() {
    let a = NewAlert::new(Uuid::new_v4(), HERE, Some(" ".into()));
    assert_eq!(a.alert_type, "emergency");
  }
}
