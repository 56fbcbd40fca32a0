//! Emergency contacts, a plain list owned by each user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
  pub contact_id:   Uuid,
  pub user_id:      Uuid,
  pub name:         String,
  pub relationship: String,
  pub phone:        String,
  pub email:        Option<String>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
  #[serde(skip)]
  pub user_id:      Uuid,
  pub name:         String,
  pub relationship: String,
  pub phone:        String,
  pub email:        Option<String>,
}

impl NewContact {
  pub fn validate(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    self.phone = self.phone.trim().to_owned();
    if self.name.is_empty() {
      return Err(Error::invalid("name", "must not be empty"));
    }
    if self.phone.is_empty() {
      return Err(Error::invalid("phone", "must not be empty"));
    }
    self.email = self.email.map(|e| e.trim().to_owned()).filter(|e| !e.is_empty());
    Ok(self)
  }
}
