//! Handlers for lost-item reports and their photos.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/lost-items/images` | Raw `image/*` body, at most 5 MiB |
//! | `GET`  | `/lost-items` | Caller's items, newest first; `?limit=` (default 10) |
//! | `POST` | `/lost-items` | Files a linked FIR when a location is given |
//! | `GET`  | `/authority/lost-items` | All items with owner details |
//! | `PUT`  | `/authority/lost-items/{id}/status` | `{status: "lost" \| "found"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use safario_core::{
  change::ChangeEvent,
  geo::Coordinates,
  report::{LostItem, LostItemStatus, NewLostItem},
  role::Action,
  store::SafetyStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::ApiError,
  reported::{Reported, with_profiles},
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_RECENT: usize = 10;
const IMAGE_DIR: &str = "lost-items";

// ─── Images ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Uploaded {
  pub url: String,
}

/// File extension for a raster image content type. Anything else, SVG
/// included, is refused since uploads are served from the API's own origin.
fn image_extension(content_type: &str) -> Option<&'static str> {
  let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
  match essence.as_str() {
    "image/png" => Some("png"),
    "image/jpeg" | "image/pjpeg" => Some("jpg"),
    "image/webp" => Some("webp"),
    "image/gif" => Some("gif"),
    _ => None,
  }
}

/// `POST /lost-items/images`
pub async fn upload_image<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;

  let ext = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .and_then(image_extension)
    .ok_or_else(|| ApiError::BadRequest("Please upload an image file".to_owned()))?;
  if body.len() > MAX_IMAGE_BYTES {
    return Err(ApiError::PayloadTooLarge("Image must be less than 5MB".to_owned()));
  }
  if body.is_empty() {
    return Err(ApiError::BadRequest("image body is empty".to_owned()));
  }

  let relative = format!("{IMAGE_DIR}/{}/{}.{ext}", user.id(), Uuid::new_v4());
  let path = state.config.storage_dir.join(&relative);
  if let Some(dir) = path.parent() {
    tokio::fs::create_dir_all(dir)
      .await
      .map_err(|e| ApiError::Internal(format!("cannot create upload directory: {e}")))?;
  }
  tokio::fs::write(&path, &body)
    .await
    .map_err(|e| ApiError::Internal(format!("cannot store image: {e}")))?;

  tracing::debug!(path = %path.display(), bytes = body.len(), "image stored");
  let url = format!(
    "{}/storage/{relative}",
    state.config.public_base_url.trim_end_matches('/')
  );
  Ok((StatusCode::CREATED, Json(Uploaded { url })))
}

// ─── Tourist ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FileBody {
  pub item_name:   String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image_url:   Option<String>,
  #[serde(default)]
  pub lat:         Option<f64>,
  #[serde(default)]
  pub lng:         Option<f64>,
}

/// `POST /lost-items`
pub async fn file<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<FileBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UseTouristFeatures)?;

  let location = match (body.lat, body.lng) {
    (Some(lat), Some(lng)) => Some(Coordinates::checked(lat, lng)?),
    (None, None) => None,
    _ => return Err(ApiError::BadRequest("lat and lng must be given together".to_owned())),
  };

  let item = NewLostItem::new(
    user.id(),
    &body.item_name,
    &body.description,
    body.image_url.filter(|u| !u.trim().is_empty()),
    location,
  )?;
  let fir = item.linked_fir(Utc::now());

  let filing = state.store.file_lost_item(item, fir).await.map_err(ApiError::store::<S>)?;
  tracing::info!(
    item = %filing.item.item_id,
    fir = filing.fir.as_ref().map(|f| f.fir_number.as_str()),
    "lost item filed"
  );
  Ok((StatusCode::CREATED, Json(filing)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /lost-items[?limit=<n>]`
pub async fn list_own<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LostItem>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  let limit = params.limit.unwrap_or(DEFAULT_RECENT);
  let items = state
    .store
    .list_lost_items(Some(user.id()), Some(limit))
    .await
    .map_err(ApiError::store::<S>)?;
  Ok(Json(items))
}

// ─── Authority ───────────────────────────────────────────────────────────────

/// `GET /authority/lost-items`
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<Reported<LostItem>>>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::ViewAuthorityPortal)?;
  let items = state.store.list_lost_items(None, None).await.map_err(ApiError::store::<S>)?;
  Ok(Json(with_profiles(&state, items, |i| i.user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: LostItemStatus,
}

/// `PUT /authority/lost-items/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<LostItem>, ApiError>
where
  S: SafetyStore + Clone + 'static,
{
  user.require(Action::UpdateLostItemStatus)?;

  let mut item = state
    .store
    .get_lost_item(id)
    .await
    .map_err(ApiError::store::<S>)?
    .ok_or_else(|| ApiError::NotFound(format!("lost item {id} not found")))?;

  item.set_status(body.status, Utc::now());
  state.store.update_lost_item(item.clone()).await.map_err(ApiError::store::<S>)?;

  tracing::info!(item = %id, status = %item.status, "lost item status updated");
  state.feed.publish(ChangeEvent::LostItemUpdated(item.clone()));
  Ok(Json(item))
}

#[cfg(test)]
mod tests {
  use super::image_extension;

  #[test]
  fn image_types_map_to_extensions() {
    assert_eq!(image_extension("image/png"), Some("png"));
    assert_eq!(image_extension("image/jpeg"), Some("jpg"));
    assert_eq!(image_extension("Image/WebP; charset=binary"), Some("webp"));
    assert_eq!(image_extension("image/gif"), Some("gif"));
  }

  #[test]
  fn non_images_are_refused() {
    assert_eq!(image_extension("application/pdf"), None);
    assert_eq!(image_extension("text/plain"), None);
    assert_eq!(image_extension("image/"), None);
    assert_eq!(image_extension("image/svg+xml"), None);
    assert_eq!(image_extension("image/x-icon"), None);
  }
}
