//! Owner details attached to records in the authority and admin views.

use std::collections::HashMap;

use safario_core::{profile::ProfileSummary, store::SafetyStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// A record plus its owner's name and phone, `"Unknown"` when the owner has
/// no profile.
#[derive(Debug, Clone, Serialize)]
pub struct Reported<T> {
  #[serde(flatten)]
  pub record:   T,
  pub profiles: ProfileSummary,
}

/// Pair each record with the profile of the user `owner` names, fetching all
/// profiles in one query.
pub async fn with_profiles<S, T>(
  state: &AppState<S>,
  records: Vec<T>,
  owner: impl Fn(&T) -> Uuid,
) -> Result<Vec<Reported<T>>, ApiError>
where
  S: SafetyStore + 'static,
{
  let mut ids: Vec<Uuid> = records.iter().map(&owner).collect();
  ids.sort_unstable();
  ids.dedup();

  let profiles: HashMap<Uuid, ProfileSummary> = state
    .store
    .list_profiles(ids)
    .await
    .map_err(ApiError::store::<S>)?
    .iter()
    .map(|p| (p.user_id, ProfileSummary::from(p)))
    .collect();

  Ok(
    records
      .into_iter()
      .map(|record| {
        let profiles =
          profiles.get(&owner(&record)).cloned().unwrap_or_else(ProfileSummary::unknown);
        Reported { record, profiles }
      })
      .collect(),
  )
}
