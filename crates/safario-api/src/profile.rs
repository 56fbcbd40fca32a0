//! Handlers for the caller's own profile and digital ID.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/profile` | 404 until an ID has been generated |
//! | `POST`  | `/profile` | Generate the ID; 409 if one exists |
//! | `PATCH` | `/profile` | Partial update |
//! | `GET`   | `/id-card` | Card view with age and ID suffix |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use safario_core::{
  profile::{IdCard, NewProfile, Profile, ProfileUpdate},
  role::Action,
  store::SafetyStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

fn no_profile() -> ApiError { ApiError::NotFound("no profile yet".to_owned()) }

async fn load<S>(state: &AppState<S>, user: &CurrentUser) -> Result<Profile, ApiError>
where
  S: SafetyStore + 'static,
{
  state
    .store
    .get_profile(user.id())
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(no_profile)
}

/// `GET /profile`
pub async fn get_own<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Profile>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  Ok(Json(load(&state, &user).await?))
}

/// `POST /profile`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(mut body): Json<NewProfile>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;

  let existing = state.store.get_profile(user.id()).await.map_err(ApiError::store::<S>)?;
  if existing.is_some() {
    return Err(ApiError::Conflict("a digital ID already exists for this account".to_owned()));
  }

  body.user_id = user.id();
  if body.phone_number.is_none() {
    body.phone_number = user.account.phone_number.clone();
  }
  let input = body.validate(Utc::now().date_naive())?;

  let profile = state.store.create_profile(input).await.map_err(ApiError::store::<S>)?;
  tracing::info!(user = %profile.user_id, "digital ID generated");
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `PATCH /profile`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let mut profile = load(&state, &user).await?;
  profile.apply(body)?;
  state.store.update_profile(profile.clone()).await.map_err(ApiError::store::<S>)?;
  Ok(Json(profile))
}

/// `GET /id-card`
pub async fn id_card<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<IdCard>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let profile = load(&state, &user).await?;
  Ok(Json(profile.id_card(Utc::now().date_naive())))
}
