//! Accounts, sessions and the bearer-token extractor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | `{email, password, requested_role?}` |
//! | `POST` | `/auth/signin` | `{email, password}` |
//! | `POST` | `/auth/otp/verify` | `{phoneNumber, code, requested_role?}` |
//! | `POST` | `/auth/signout` | Ends the calling session |
//! | `GET`  | `/me` | Account, role, granted actions, profile |

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::IntoResponse,
};
use chrono::{DateTime, TimeDelta, Utc};
use rand_core::{OsRng, RngCore};
use safario_core::{
  account::{Account, NewAccount, Session},
  profile::Profile,
  role::{Action, Role, RoleAssignment},
  store::SafetyStore,
};
use safario_functions::otp::sha256_hex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const MIN_PASSWORD_LEN: usize = 6;

// ─── Passwords & tokens ──────────────────────────────────────────────────────

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

/// 32 random bytes, hex encoded.
fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The signed-in caller. Present in a handler means the request carried a
/// live session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub account:    Account,
  pub role:       RoleAssignment,
  pub token_hash: String,
}

impl CurrentUser {
  pub fn id(&self) -> Uuid { self.account.account_id }

  /// Gate an operation on the caller's role.
  pub fn require(&self, action: Action) -> Result<(), ApiError> {
    if self.role.permits(action) {
      Ok(())
    } else {
      tracing::warn!(user = %self.id(), action = %action, "permission denied");
      Err(ApiError::Forbidden(format!(
        "{} ({}) may not {action}",
        self.role.role, self.role.role_status
      )))
    }
  }
}

/// Resolve a raw bearer token to its user.
pub async fn authenticate<S>(state: &AppState<S>, token: &str) -> Result<CurrentUser, ApiError>
where
  S: SafetyStore + 'static,
{
  let token_hash = sha256_hex(token);
  let session = state
    .store
    .get_session(token_hash.clone())
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(ApiError::unauthorized)?;

  let now = Utc::now();
  if session.is_expired(now) {
    state.store.delete_session(token_hash).await.map_err(ApiError::store::<S>)?;
    return Err(ApiError::Unauthorized("session expired".to_owned()));
  }

  let account = state
    .store
    .get_account(session.account_id)
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(ApiError::unauthorized)?;

  // Accounts always get a role row at creation; fall back to plain user
  // rights if it has gone missing.
  let role = state
    .store
    .get_role(account.account_id)
    .await
    .map_err(ApiError::store::<S>)?
    .unwrap_or_else(|| RoleAssignment::requested(account.account_id, Role::User, now));

  Ok(CurrentUser { account, role, token_hash })
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: SafetyStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
    authenticate(state, token).await
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionResponse {
  pub access_token: String,
  pub token_type:   &'static str,
  pub expires_at:   DateTime<Utc>,
  pub account:      Account,
  pub role:         RoleAssignment,
}

async fn start_session<S>(
  state: &AppState<S>,
  account: Account,
  role: RoleAssignment,
) -> Result<SessionResponse, ApiError>
where
  S: SafetyStore + 'static,
{
  let token = new_token();
  let now = Utc::now();
  let session = Session {
    token_hash: sha256_hex(&token),
    account_id: account.account_id,
    created_at: now,
    expires_at: now + TimeDelta::hours(state.config.session_ttl_hours),
  };
  let expires_at = session.expires_at;
  state.store.create_session(session).await.map_err(ApiError::store::<S>)?;

  Ok(SessionResponse { access_token: token, token_type: "bearer", expires_at, account, role })
}

/// Insert the role row for a new account.
async fn assign_initial_role<S>(
  state: &AppState<S>,
  account_id: Uuid,
  requested: Option<Role>,
) -> Result<RoleAssignment, ApiError>
where
  S: SafetyStore + 'static,
{
  let role = RoleAssignment::requested(account_id, requested.unwrap_or_default(), Utc::now());
  state.store.insert_role(role.clone()).await.map_err(ApiError::store::<S>)?;
  if role.role != Role::User {
    tracing::info!(user = %account_id, role = %role.role, "privileged role requested");
  }
  Ok(role)
}

async fn role_of<S>(state: &AppState<S>, account_id: Uuid) -> Result<RoleAssignment, ApiError>
where
  S: SafetyStore + 'static,
{
  Ok(
    state
      .store
      .get_role(account_id)
      .await
      .map_err(ApiError::store::<S>)?
      .unwrap_or_else(|| RoleAssignment::requested(account_id, Role::User, Utc::now())),
  )
}

// ─── Sign-up / sign-in ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
  pub email:          String,
  pub password:       String,
  #[serde(default)]
  pub requested_role: Option<Role>,
}

/// `POST /auth/signup`
pub async fn signup<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignUpBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let email = body.email.trim().to_lowercase();
  if !email.contains('@') {
    return Err(ApiError::BadRequest("a valid email is required".to_owned()));
  }
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ApiError::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }

  let existing = state
    .store
    .find_credentials_by_email(email.clone())
    .await
    .map_err(ApiError::store::<S>)?;
  if existing.is_some() {
    return Err(ApiError::Conflict("User already registered".to_owned()));
  }

  let account = state
    .store
    .create_account(NewAccount {
      email:         Some(email),
      phone_number:  None,
      password_hash: Some(hash_password(&body.password)?),
    })
    .await
    .map_err(|e| match ApiError::store::<S>(e) {
      ApiError::Conflict(_) => ApiError::Conflict("User already registered".to_owned()),
      other => other,
    })?;
  let role = assign_initial_role(&state, account.account_id, body.requested_role).await?;

  tracing::info!(user = %account.account_id, "account created");
  let session = start_session(&state, account, role).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/signin`
pub async fn signin<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignInBody>,
) -> Result<Json<SessionResponse>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let invalid = || ApiError::Unauthorized("Invalid login credentials".to_owned());

  let creds = state
    .store
    .find_credentials_by_email(body.email.trim().to_lowercase())
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(invalid)?;

  let verified = creds
    .password_hash
    .as_deref()
    .is_some_and(|phc| verify_password(&body.password, phc));
  if !verified {
    tracing::warn!(user = %creds.account.account_id, "failed sign-in");
    return Err(invalid());
  }

  let role = role_of(&state, creds.account.account_id).await?;
  Ok(Json(start_session(&state, creds.account, role).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpBody {
  pub phone_number:   String,
  pub code:           String,
  #[serde(default, rename = "requested_role")]
  pub requested_role: Option<Role>,
}

/// `POST /auth/otp/verify`: exchange a texted code for a session, creating
/// the phone account on first use.
pub async fn verify_otp<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<VerifyOtpBody>,
) -> Result<Json<SessionResponse>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let phone = state
    .functions
    .otp
    .verify(state.store.as_ref(), &body.phone_number, &body.code, Utc::now())
    .await?;

  let existing = state
    .store
    .find_account_by_phone(phone.clone())
    .await
    .map_err(ApiError::store::<S>)?;

  let (account, role) = match existing {
    Some(account) => {
      let role = role_of(&state, account.account_id).await?;
      (account, role)
    }
    None => {
      let account = state
        .store
        .create_account(NewAccount {
          email:         None,
          phone_number:  Some(phone),
          password_hash: None,
        })
        .await
        .map_err(ApiError::store::<S>)?;
      let role = assign_initial_role(&state, account.account_id, body.requested_role).await?;
      tracing::info!(user = %account.account_id, "phone account created");
      (account, role)
    }
  };

  Ok(Json(start_session(&state, account, role).await?))
}

/// `POST /auth/signout`
pub async fn signout<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  state.store.delete_session(user.token_hash).await.map_err(ApiError::store::<S>)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Me ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Me {
  pub account: Account,
  pub role:    RoleAssignment,
  pub actions: Vec<Action>,
  pub profile: Option<Profile>,
}

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Me>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let profile = state.store.get_profile(user.id()).await.map_err(ApiError::store::<S>)?;
  Ok(Json(Me {
    actions: user.role.granted_actions(),
    account: user.account,
    role: user.role,
    profile,
  }))
}
