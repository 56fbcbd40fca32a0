//! [`SqliteStore`], the SQLite implementation of [`SafetyStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use safario_core::{
  account::{Account, Credentials, MAX_OTP_ATTEMPTS, NewAccount, OtpChallenge, Session},
  contact::{EmergencyContact, NewContact},
  profile::{NewProfile, Profile},
  report::{
    AlertStatus, EmergencyAlert, FirReport, FirStatus, LostItem, LostItemFiling,
    LostItemStatus, NewAlert, NewFirReport, NewLostItem,
  },
  role::RoleAssignment,
  store::SafetyStore,
};

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawAlert, RawContact, RawFir, RawLostItem, RawOtpChallenge, RawProfile,
    RawRole, RawSession, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Safario store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row writers ─────────────────────────────────────────────────────────────
//
// Shared by the single-record writes and the lost-item transaction.

/// `true` for UNIQUE and PRIMARY KEY violations, which surface as
/// [`Error::Conflict`].
fn is_duplicate(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// Run an insert, reporting a duplicate key as `Ok(false)`.
fn insert_unique(
  result: rusqlite::Result<usize>,
) -> std::result::Result<bool, tokio_rusqlite::Error> {
  match result {
    Ok(_) => Ok(true),
    Err(e) if is_duplicate(&e) => Ok(false),
    Err(e) => Err(e.into()),
  }
}

fn insert_fir(conn: &Connection, fir: &FirReport) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO fir_reports (
       fir_id, user_id, fir_number, incident_type, description,
       location_lat, location_lng, status, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(fir.fir_id),
      encode_uuid(fir.user_id),
      fir.fir_number,
      fir.incident_type.to_string(),
      fir.description,
      fir.location.lat,
      fir.location.lng,
      fir.status.to_string(),
      encode_dt(fir.created_at),
    ],
  )
}

fn insert_lost_item(conn: &Connection, item: &LostItem) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO lost_items (
       item_id, user_id, item_name, description, image_url,
       location_lat, location_lng, status, found_at, fir_id, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      encode_uuid(item.item_id),
      encode_uuid(item.user_id),
      item.item_name,
      item.description,
      item.image_url,
      item.location.map(|l| l.lat),
      item.location.map(|l| l.lng),
      item.status.to_string(),
      item.found_at.map(encode_dt),
      item.fir_id.map(encode_uuid),
      encode_dt(item.created_at),
    ],
  )
}

fn fir_from_new(input: NewFirReport) -> FirReport {
  FirReport {
    fir_id:        Uuid::new_v4(),
    user_id:       input.user_id,
    fir_number:    input.fir_number,
    incident_type: input.incident_type,
    description:   input.description,
    location:      input.location,
    status:        FirStatus::Filed,
    created_at:    now(),
  }
}

/// Current time at the precision the `*_at` columns keep.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// `-1` tells SQLite not to limit.
fn sql_limit(limit: Option<usize>) -> i64 {
  limit.and_then(|n| i64::try_from(n).ok()).unwrap_or(-1)
}

// ─── SafetyStore impl ────────────────────────────────────────────────────────

impl SafetyStore for SqliteStore {
  type Error = Error;

  fn is_conflict(error: &Error) -> bool { matches!(error, Error::Conflict(_)) }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let account = Account {
      account_id:   Uuid::new_v4(),
      email:        input.email,
      phone_number: input.phone_number,
      created_at:   now(),
    };

    let id_str   = encode_uuid(account.account_id);
    let email    = account.email.clone();
    let phone    = account.phone_number.clone();
    let password = input.password_hash;
    let at_str   = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        insert_unique(conn.execute(
          "INSERT INTO accounts (account_id, email, phone_number, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, email, phone, password, at_str],
        ))
      })
      .await?;

    if !inserted {
      return Err(Error::Conflict("an account with this email or phone number exists".into()));
    }
    Ok(account)
  }

  async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(account_id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM accounts WHERE account_id = ?1", RawAccount::COLUMNS),
              rusqlite::params![id_str],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_parts().map(|(account, _)| account)).transpose()
  }

  async fn find_credentials_by_email(&self, email: String) -> Result<Option<Credentials>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM accounts WHERE email = ?1", RawAccount::COLUMNS),
              rusqlite::params![email.trim()],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|r| {
        r.into_parts()
          .map(|(account, password_hash)| Credentials { account, password_hash })
      })
      .transpose()
  }

  async fn find_account_by_phone(&self, phone_number: String) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM accounts WHERE phone_number = ?1", RawAccount::COLUMNS),
              rusqlite::params![phone_number],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|r| r.into_parts().map(|(account, _)| account)).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, account_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            session.token_hash,
            encode_uuid(session.account_id),
            encode_dt(session.created_at),
            encode_dt(session.expires_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_session(&self, token_hash: String) -> Result<Option<Session>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM sessions WHERE token_hash = ?1", RawSession::COLUMNS),
              rusqlite::params![token_hash],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── OTP challenges ────────────────────────────────────────────────────────

  async fn put_otp_challenge(&self, challenge: OtpChallenge) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO otp_challenges (phone_number, code_hash, expires_at, attempts)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(phone_number) DO UPDATE SET
             code_hash  = excluded.code_hash,
             expires_at = excluded.expires_at,
             attempts   = excluded.attempts",
          rusqlite::params![
            challenge.phone_number,
            challenge.code_hash,
            encode_dt(challenge.expires_at),
            challenge.attempts,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_otp_challenge(&self, phone_number: String) -> Result<Option<OtpChallenge>> {
    let raw: Option<RawOtpChallenge> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM otp_challenges WHERE phone_number = ?1",
                RawOtpChallenge::COLUMNS
              ),
              rusqlite::params![phone_number],
              RawOtpChallenge::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawOtpChallenge::into_challenge).transpose()
  }

  async fn claim_otp_attempt(&self, phone_number: String) -> Result<Option<OtpChallenge>> {
    let raw: Option<RawOtpChallenge> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE otp_challenges SET attempts = attempts + 1
                 WHERE phone_number = ?1 AND attempts < ?2
                 RETURNING {}",
                RawOtpChallenge::COLUMNS
              ),
              rusqlite::params![phone_number, MAX_OTP_ATTEMPTS],
              RawOtpChallenge::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawOtpChallenge::into_challenge).transpose()
  }

  async fn delete_otp_challenge(&self, phone_number: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM otp_challenges WHERE phone_number = ?1",
          rusqlite::params![phone_number],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn insert_role(&self, role: RoleAssignment) -> Result<()> {
    let user_id = role.user_id;
    let inserted = self
      .conn
      .call(move |conn| {
        insert_unique(conn.execute(
          "INSERT INTO user_roles (user_id, role, role_status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            encode_uuid(role.user_id),
            role.role.to_string(),
            role.role_status.to_string(),
            encode_dt(role.created_at),
            encode_dt(role.updated_at),
          ],
        ))
      })
      .await?;

    if !inserted {
      return Err(Error::Conflict(format!("user {user_id} already has a role")));
    }
    Ok(())
  }

  async fn get_role(&self, user_id: Uuid) -> Result<Option<RoleAssignment>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM user_roles WHERE user_id = ?1", RawRole::COLUMNS),
              rusqlite::params![id_str],
              RawRole::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn update_role(&self, role: RoleAssignment) -> Result<()> {
    let user_id = role.user_id;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE user_roles SET role = ?2, role_status = ?3, updated_at = ?4
           WHERE user_id = ?1",
          rusqlite::params![
            encode_uuid(role.user_id),
            role.role.to_string(),
            role.role_status.to_string(),
            encode_dt(role.updated_at),
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound { entity: "role", id: user_id.to_string() });
    }
    Ok(())
  }

  async fn list_roles(&self) -> Result<Vec<RoleAssignment>> {
    let raws: Vec<RawRole> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM user_roles
           ORDER BY CASE role_status WHEN 'pending' THEN 0 ELSE 1 END,
                    CASE role WHEN 'admin' THEN 0 WHEN 'authority' THEN 1 ELSE 2 END,
                    created_at",
          RawRole::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_profile(&self, input: NewProfile) -> Result<Profile> {
    let profile = Profile {
      user_id:            input.user_id,
      full_name:          input.full_name,
      date_of_birth:      input.date_of_birth,
      gender:             input.gender,
      passport_number:    input.passport_number,
      aadhaar_number:     input.aadhaar_number,
      preferred_language: input.preferred_language,
      photo_url:          input.photo_url,
      phone_number:       input.phone_number,
      created_at:         now(),
    };

    let p = profile.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        insert_unique(conn.execute(
          "INSERT INTO profiles (
             user_id, full_name, date_of_birth, gender, passport_number,
             aadhaar_number, preferred_language, photo_url, phone_number, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            encode_uuid(p.user_id),
            p.full_name,
            encode_date(p.date_of_birth),
            p.gender,
            p.passport_number,
            p.aadhaar_number,
            p.preferred_language,
            p.photo_url,
            p.phone_number,
            encode_dt(p.created_at),
          ],
        ))
      })
      .await?;

    if !inserted {
      return Err(Error::Conflict(format!("user {} already has a profile", profile.user_id)));
    }
    Ok(profile)
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM profiles WHERE user_id = ?1", RawProfile::COLUMNS),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn update_profile(&self, profile: Profile) -> Result<()> {
    let user_id = profile.user_id;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET
             full_name = ?2, gender = ?3, passport_number = ?4, aadhaar_number = ?5,
             preferred_language = ?6, photo_url = ?7, phone_number = ?8
           WHERE user_id = ?1",
          rusqlite::params![
            encode_uuid(profile.user_id),
            profile.full_name,
            profile.gender,
            profile.passport_number,
            profile.aadhaar_number,
            profile.preferred_language,
            profile.photo_url,
            profile.phone_number,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound { entity: "profile", id: user_id.to_string() });
    }
    Ok(())
  }

  async fn list_profiles(&self, user_ids: Vec<Uuid>) -> Result<Vec<Profile>> {
    if user_ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<String> = user_ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM profiles WHERE user_id IN ({placeholders})",
          RawProfile::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(ids.iter()), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Emergency alerts ──────────────────────────────────────────────────────

  async fn create_alert(&self, input: NewAlert) -> Result<EmergencyAlert> {
    let alert = EmergencyAlert {
      alert_id:       Uuid::new_v4(),
      user_id:        input.user_id,
      location:       input.location,
      alert_type:     input.alert_type,
      status:         AlertStatus::Active,
      responder_id:   None,
      response_notes: None,
      responded_at:   None,
      created_at:     now(),
    };

    let a = alert.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO emergency_alerts (
             alert_id, user_id, location_lat, location_lng, alert_type, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(a.alert_id),
            encode_uuid(a.user_id),
            a.location.lat,
            a.location.lng,
            a.alert_type,
            a.status.to_string(),
            encode_dt(a.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(alert)
  }

  async fn get_alert(&self, alert_id: Uuid) -> Result<Option<EmergencyAlert>> {
    let id_str = encode_uuid(alert_id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM emergency_alerts WHERE alert_id = ?1", RawAlert::COLUMNS),
              rusqlite::params![id_str],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts(&self, owner: Option<Uuid>) -> Result<Vec<EmergencyAlert>> {
    let owner_str = owner.map(encode_uuid);

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM emergency_alerts
           WHERE ?1 IS NULL OR user_id = ?1
           ORDER BY created_at DESC, rowid DESC",
          RawAlert::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  async fn update_alert(&self, alert: EmergencyAlert) -> Result<()> {
    let alert_id = alert.alert_id;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE emergency_alerts SET
             status = ?2, responder_id = ?3, response_notes = ?4, responded_at = ?5
           WHERE alert_id = ?1",
          rusqlite::params![
            encode_uuid(alert.alert_id),
            alert.status.to_string(),
            alert.responder_id.map(encode_uuid),
            alert.response_notes,
            alert.responded_at.map(encode_dt),
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound { entity: "alert", id: alert_id.to_string() });
    }
    Ok(())
  }

  // ── FIR reports ───────────────────────────────────────────────────────────

  async fn create_fir(&self, input: NewFirReport) -> Result<FirReport> {
    let fir = fir_from_new(input);

    let row = fir.clone();
    let inserted = self
      .conn
      .call(move |conn| insert_unique(insert_fir(conn, &row)))
      .await?;

    if !inserted {
      return Err(Error::Conflict(format!("FIR number {} is taken", fir.fir_number)));
    }
    Ok(fir)
  }

  async fn get_fir(&self, fir_id: Uuid) -> Result<Option<FirReport>> {
    let id_str = encode_uuid(fir_id);

    let raw: Option<RawFir> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM fir_reports WHERE fir_id = ?1", RawFir::COLUMNS),
              rusqlite::params![id_str],
              RawFir::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFir::into_fir).transpose()
  }

  async fn list_firs(&self, owner: Option<Uuid>) -> Result<Vec<FirReport>> {
    let owner_str = owner.map(encode_uuid);

    let raws: Vec<RawFir> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM fir_reports
           WHERE ?1 IS NULL OR user_id = ?1
           ORDER BY created_at DESC, rowid DESC",
          RawFir::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawFir::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFir::into_fir).collect()
  }

  async fn update_fir(&self, report: FirReport) -> Result<()> {
    let fir_id = report.fir_id;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE fir_reports SET status = ?2 WHERE fir_id = ?1",
          rusqlite::params![encode_uuid(report.fir_id), report.status.to_string()],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound { entity: "FIR", id: fir_id.to_string() });
    }
    Ok(())
  }

  // ── Lost items ────────────────────────────────────────────────────────────

  async fn file_lost_item(
    &self,
    item: NewLostItem,
    fir: Option<NewFirReport>,
  ) -> Result<LostItemFiling> {
    let fir = fir.map(fir_from_new);
    let item = LostItem {
      item_id:     Uuid::new_v4(),
      user_id:     item.user_id,
      item_name:   item.item_name,
      description: item.description,
      image_url:   item.image_url,
      location:    item.location,
      status:      LostItemStatus::Lost,
      found_at:    None,
      fir_id:      fir.as_ref().map(|f| f.fir_id),
      created_at:  now(),
    };

    let (item_row, fir_row) = (item.clone(), fir.clone());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(f) = &fir_row {
          insert_fir(&tx, f)?;
        }
        insert_lost_item(&tx, &item_row)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(LostItemFiling { item, fir })
  }

  async fn get_lost_item(&self, item_id: Uuid) -> Result<Option<LostItem>> {
    let id_str = encode_uuid(item_id);

    let raw: Option<RawLostItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM lost_items WHERE item_id = ?1", RawLostItem::COLUMNS),
              rusqlite::params![id_str],
              RawLostItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLostItem::into_item).transpose()
  }

  async fn list_lost_items(
    &self,
    owner: Option<Uuid>,
    limit: Option<usize>,
  ) -> Result<Vec<LostItem>> {
    let owner_str = owner.map(encode_uuid);
    let limit = sql_limit(limit);

    let raws: Vec<RawLostItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM lost_items
           WHERE ?1 IS NULL OR user_id = ?1
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2",
          RawLostItem::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str, limit], RawLostItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLostItem::into_item).collect()
  }

  async fn update_lost_item(&self, item: LostItem) -> Result<()> {
    let item_id = item.item_id;
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE lost_items SET status = ?2, found_at = ?3 WHERE item_id = ?1",
          rusqlite::params![
            encode_uuid(item.item_id),
            item.status.to_string(),
            item.found_at.map(encode_dt),
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound { entity: "lost item", id: item_id.to_string() });
    }
    Ok(())
  }

  // ── Emergency contacts ────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<EmergencyContact> {
    let contact = EmergencyContact {
      contact_id:   Uuid::new_v4(),
      user_id:      input.user_id,
      name:         input.name,
      relationship: input.relationship,
      phone:        input.phone,
      email:        input.email,
      created_at:   now(),
    };

    let c = contact.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO emergency_contacts (
             contact_id, user_id, name, relationship, phone, email, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(c.contact_id),
            encode_uuid(c.user_id),
            c.name,
            c.relationship,
            c.phone,
            c.email,
            encode_dt(c.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(contact)
  }

  async fn list_contacts(&self, user_id: Uuid) -> Result<Vec<EmergencyContact>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM emergency_contacts WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC",
          RawContact::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn delete_contact(&self, user_id: Uuid, contact_id: Uuid) -> Result<bool> {
    let (user_str, contact_str) = (encode_uuid(user_id), encode_uuid(contact_id));
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM emergency_contacts WHERE contact_id = ?1 AND user_id = ?2",
          rusqlite::params![contact_str, user_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
