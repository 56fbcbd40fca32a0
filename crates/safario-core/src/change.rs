//! Row-change events pushed to the owner of the changed record.

use serde::Serialize;
use uuid::Uuid;

use crate::report::{
  AlertStatus, EmergencyAlert, FirReport, FirStatus, LostItem, LostItemStatus,
};

/// An update to a record that its owner is subscribed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "record", rename_all = "snake_case")]
pub enum ChangeEvent {
  FirUpdated(FirReport),
  LostItemUpdated(LostItem),
  AlertUpdated(EmergencyAlert),
}

impl ChangeEvent {
  /// The user whose subscription should receive this event.
  pub fn owner(&self) -> Uuid {
    match self {
      Self::FirUpdated(r) => r.user_id,
      Self::LostItemUpdated(i) => i.user_id,
      Self::AlertUpdated(a) => a.user_id,
    }
  }

  /// Text for the owner's toast, when the change is worth announcing.
  pub fn message(&self) -> Option<String> {
    match self {
      Self::FirUpdated(r) => match r.status {
        FirStatus::Investigating => {
          Some(format!("Your FIR {} is now under investigation.", r.fir_number))
        }
        FirStatus::Closed => {
          Some(format!("Your FIR {} has been closed by authorities.", r.fir_number))
        }
        FirStatus::Filed => None,
      },
      Self::LostItemUpdated(i) if i.status == LostItemStatus::Found => {
        Some(format!("Your item \"{}\" has been marked as found!", i.item_name))
      }
      Self::LostItemUpdated(_) => None,
      Self::AlertUpdated(a) if a.status == AlertStatus::Resolved => {
        Some("Your emergency alert has been resolved by authorities.".to_owned())
      }
      Self::AlertUpdated(_) => None,
    }
  }
}
