//! The `SafetyStore` trait.
//!
//! Implemented by storage backends (e.g. `safario-store-sqlite`). The API and
//! the proxy functions depend on this abstraction, not on a concrete backend.
//!
//! Writes of whole records (`update_*`) persist a value the caller has already
//! moved through its transition rules; the store itself does not re-check
//! workflow invariants.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, Credentials, NewAccount, OtpChallenge, Session},
  contact::{EmergencyContact, NewContact},
  profile::{NewProfile, Profile},
  report::{
    EmergencyAlert, FirReport, LostItem, LostItemFiling, NewAlert, NewFirReport, NewLostItem,
  },
  role::RoleAssignment,
};

/// Abstraction over a Safario storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SafetyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `error` reports a uniqueness violation (email, phone number, a
  /// second profile or role row) rather than a storage failure.
  fn is_conflict(error: &Self::Error) -> bool;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new account. Fails if the email or phone number is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by (case-insensitive) email.
  fn find_credentials_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn find_account_by_phone(
    &self,
    phone_number: String,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Returns `true` if a session was removed.
  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── OTP challenges ────────────────────────────────────────────────────

  /// Store a challenge, replacing any open one for the same number.
  fn put_otp_challenge(
    &self,
    challenge: OtpChallenge,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_otp_challenge(
    &self,
    phone_number: String,
  ) -> impl Future<Output = Result<Option<OtpChallenge>, Self::Error>> + Send + '_;

  /// Atomically count one verification attempt and return the challenge as
  /// it stands afterwards. `None` if there is no challenge for the number or
  /// it has already used up [`MAX_OTP_ATTEMPTS`].
  ///
  /// [`MAX_OTP_ATTEMPTS`]: crate::account::MAX_OTP_ATTEMPTS
  fn claim_otp_attempt(
    &self,
    phone_number: String,
  ) -> impl Future<Output = Result<Option<OtpChallenge>, Self::Error>> + Send + '_;

  fn delete_otp_challenge(
    &self,
    phone_number: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Roles ─────────────────────────────────────────────────────────────

  /// Insert the role row for a new account. One row per user.
  fn insert_role(
    &self,
    role: RoleAssignment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_role(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<RoleAssignment>, Self::Error>> + Send + '_;

  fn update_role(
    &self,
    role: RoleAssignment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All role rows, pending first, then by role (admin first).
  fn list_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<RoleAssignment>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn create_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  fn update_profile(
    &self,
    profile: Profile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Profiles for the given users; missing ones are simply absent.
  fn list_profiles(
    &self,
    user_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  // ── Emergency alerts ──────────────────────────────────────────────────

  fn create_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<EmergencyAlert, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    alert_id: Uuid,
  ) -> impl Future<Output = Result<Option<EmergencyAlert>, Self::Error>> + Send + '_;

  /// Newest first; `owner` restricts to one user's alerts.
  fn list_alerts(
    &self,
    owner: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<EmergencyAlert>, Self::Error>> + Send + '_;

  fn update_alert(
    &self,
    alert: EmergencyAlert,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── FIR reports ───────────────────────────────────────────────────────

  fn create_fir(
    &self,
    input: NewFirReport,
  ) -> impl Future<Output = Result<FirReport, Self::Error>> + Send + '_;

  fn get_fir(
    &self,
    fir_id: Uuid,
  ) -> impl Future<Output = Result<Option<FirReport>, Self::Error>> + Send + '_;

  /// Newest first; `owner` restricts to one user's reports.
  fn list_firs(
    &self,
    owner: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<FirReport>, Self::Error>> + Send + '_;

  fn update_fir(
    &self,
    report: FirReport,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Lost items ────────────────────────────────────────────────────────

  /// Record a lost item and, if given, its linked FIR atomically.
  fn file_lost_item(
    &self,
    item: NewLostItem,
    fir: Option<NewFirReport>,
  ) -> impl Future<Output = Result<LostItemFiling, Self::Error>> + Send + '_;

  fn get_lost_item(
    &self,
    item_id: Uuid,
  ) -> impl Future<Output = Result<Option<LostItem>, Self::Error>> + Send + '_;

  /// Newest first; `owner` restricts to one user's items.
  fn list_lost_items(
    &self,
    owner: Option<Uuid>,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<LostItem>, Self::Error>> + Send + '_;

  fn update_lost_item(
    &self,
    item: LostItem,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Emergency contacts ────────────────────────────────────────────────

  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<EmergencyContact, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_contacts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EmergencyContact>, Self::Error>> + Send + '_;

  /// Delete one of `user_id`'s contacts. Returns `false` if no such contact
  /// belongs to that user.
  fn delete_contact(
    &self,
    user_id: Uuid,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
