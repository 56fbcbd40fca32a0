//! Tourist profile and the digital ID card derived from it.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Languages offered at ID generation.
pub const LANGUAGES: [&str; 9] = [
  "English", "Hindi", "Marathi", "French", "Spanish", "Gujarati", "Tamil",
  "Telugu", "Bengali",
];

fn default_language() -> String { LANGUAGES[0].to_owned() }

/// Identity record created once per account at ID-generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:            Uuid,
  pub full_name:          String,
  pub date_of_birth:      NaiveDate,
  pub gender:             String,
  pub passport_number:    Option<String>,
  pub aadhaar_number:     Option<String>,
  pub preferred_language: String,
  pub photo_url:          Option<String>,
  pub phone_number:       Option<String>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::SafetyStore::create_profile`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
  #[serde(skip)]
  pub user_id:            Uuid,
  pub full_name:          String,
  pub date_of_birth:      NaiveDate,
  pub gender:             String,
  pub passport_number:    Option<String>,
  pub aadhaar_number:     Option<String>,
  #[serde(default = "default_language")]
  pub preferred_language: String,
  pub photo_url:          Option<String>,
  pub phone_number:       Option<String>,
}

impl NewProfile {
  /// Trim free-text fields, turn blank document numbers into `None`, and
  /// reject anything the ID card cannot show.
  pub fn validate(mut self, today: NaiveDate) -> Result<Self> {
    self.full_name = self.full_name.trim().to_owned();
    if self.full_name.is_empty() {
      return Err(Error::invalid("full_name", "must not be empty"));
    }
    if self.date_of_birth > today {
      return Err(Error::invalid("date_of_birth", "must not be in the future"));
    }
    check_language(&self.preferred_language)?;
    self.passport_number = non_blank(self.passport_number);
    self.aadhaar_number = non_blank(self.aadhaar_number);
    Ok(self)
  }
}

/// Owner-editable fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub full_name:          Option<String>,
  pub gender:             Option<String>,
  pub passport_number:    Option<String>,
  pub aadhaar_number:     Option<String>,
  pub preferred_language: Option<String>,
  pub photo_url:          Option<String>,
  pub phone_number:       Option<String>,
}

impl Profile {
  pub fn apply(&mut self, update: ProfileUpdate) -> Result<()> {
    if let Some(name) = update.full_name {
      let name = name.trim();
      if name.is_empty() {
        return Err(Error::invalid("full_name", "must not be empty"));
      }
      self.full_name = name.to_owned();
    }
    if let Some(language) = update.preferred_language {
      check_language(&language)?;
      self.preferred_language = language;
    }
    if let Some(gender) = update.gender {
      self.gender = gender;
    }
    if update.passport_number.is_some() {
      self.passport_number = non_blank(update.passport_number);
    }
    if update.aadhaar_number.is_some() {
      self.aadhaar_number = non_blank(update.aadhaar_number);
    }
    if update.photo_url.is_some() {
      self.photo_url = update.photo_url;
    }
    if update.phone_number.is_some() {
      self.phone_number = update.phone_number;
    }
    Ok(())
  }

  /// Age in whole years on `today`.
  pub fn age_on(&self, today: NaiveDate) -> u32 {
    today.years_since(self.date_of_birth).unwrap_or(0)
  }

  /// Short identifier printed on the card: the last six characters of the
  /// passport number, else of the Aadhaar number, else a mask.
  pub fn id_suffix(&self) -> String {
    self
      .passport_number
      .as_deref()
      .or(self.aadhaar_number.as_deref())
      .map(|n| {
        let chars: Vec<char> = n.chars().collect();
        chars[chars.len().saturating_sub(6)..].iter().collect()
      })
      .unwrap_or_else(|| "******".to_owned())
  }

  pub fn id_card(&self, today: NaiveDate) -> IdCard {
    IdCard {
      user_id:            self.user_id,
      full_name:          self.full_name.clone(),
      date_of_birth:      self.date_of_birth,
      age:                self.age_on(today),
      gender:             self.gender.clone(),
      passport_number:    self.passport_number.clone(),
      aadhaar_number:     self.aadhaar_number.clone(),
      preferred_language: self.preferred_language.clone(),
      photo_url:          self.photo_url.clone(),
      id_suffix:          self.id_suffix(),
      issued_year:        self.created_at.year(),
    }
  }
}

/// Read model rendered by the client as the digital ID card.
#[derive(Debug, Clone, Serialize)]
pub struct IdCard {
  pub user_id:            Uuid,
  pub full_name:          String,
  pub date_of_birth:      NaiveDate,
  pub age:                u32,
  pub gender:             String,
  pub passport_number:    Option<String>,
  pub aadhaar_number:     Option<String>,
  pub preferred_language: String,
  pub photo_url:          Option<String>,
  pub id_suffix:          String,
  pub issued_year:        i32,
}

/// Name and phone shown next to a record in the authority and admin views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
  pub full_name:    String,
  pub phone_number: String,
}

impl ProfileSummary {
  pub fn unknown() -> Self {
    Self { full_name: "Unknown".to_owned(), phone_number: String::new() }
  }
}

impl From<&Profile> for ProfileSummary {
  fn from(p: &Profile) -> Self {
    Self {
      full_name:    p.full_name.clone(),
      phone_number: p.phone_number.clone().unwrap_or_default(),
    }
  }
}

fn check_language(language: &str) -> Result<()> {
  if LANGUAGES.contains(&language) {
    Ok(())
  } else {
    Err(Error::invalid("preferred_language", format!("{language:?} is not offered")))
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}
