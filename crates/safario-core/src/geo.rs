//! Spherical geometry helpers.
//!
//! Membership and distance questions are answered with the haversine formula
//! on a spherical Earth. The flat 111,320 m/° approximation is only used to
//! turn a radius in metres into degree offsets when drawing a zone outline;
//! its error grows with the radius and towards the poles, so it is never used
//! to decide whether a point lies inside a zone.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Length of one degree of latitude (and of longitude at the equator) in the
/// flat approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Vertex count of the regular polygon that stands in for a circular zone.
pub const CIRCLE_VERTICES: usize = 64;

// ─── Coordinates ─────────────────────────────────────────────────────────────

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinates {
  pub const fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

  /// Build a position, rejecting non-finite or out-of-range values.
  pub fn checked(lat: f64, lng: f64) -> Result<Self> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
      return Err(Error::invalid("latitude", format!("{lat} is outside [-90, 90]")));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
      return Err(Error::invalid("longitude", format!("{lng} is outside [-180, 180]")));
    }
    Ok(Self { lat, lng })
  }

  /// Great-circle distance to `other` in metres.
  pub fn distance_m(&self, other: &Coordinates) -> f64 { haversine_m(self, other) }

  /// Shift by `north_m` / `east_m` metres using the flat approximation.
  pub fn offset_m(&self, north_m: f64, east_m: f64) -> Coordinates {
    let dlat = north_m / METERS_PER_DEGREE;
    let dlng = east_m / (METERS_PER_DEGREE * self.lat.to_radians().cos());
    Coordinates::new(self.lat + dlat, self.lng + dlng)
  }

  /// GeoJSON position order: `[longitude, latitude]`.
  pub fn to_lng_lat(&self) -> [f64; 2] { [self.lng, self.lat] }
}

// ─── Distance ────────────────────────────────────────────────────────────────

/// Haversine distance between two positions in metres.
pub fn haversine_m(a: &Coordinates, b: &Coordinates) -> f64 {
  let lat1 = a.lat * PI / 180.0;
  let lat2 = b.lat * PI / 180.0;
  let dlat = (b.lat - a.lat) * PI / 180.0;
  let dlng = (b.lng - a.lng) * PI / 180.0;

  let h = (dlat / 2.0).sin().powi(2)
    + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
  let c = 2.0 * h.sqrt().min(1.0).asin();

  EARTH_RADIUS_M * c
}

/// Human-readable distance: whole metres below one kilometre, otherwise
/// kilometres with one decimal (`"850m"`, `"12.3km"`).
pub fn format_distance(meters: f64) -> String {
  if meters < 1_000.0 {
    format!("{}m", meters.round() as i64)
  } else {
    format!("{:.1}km", meters / 1_000.0)
  }
}

// ─── Polygons ────────────────────────────────────────────────────────────────

/// Approximate a circle with a regular polygon of `vertices` corners.
///
/// The ring is closed: the first vertex is repeated at the end, as GeoJSON
/// requires. Longitude offsets are scaled by `cos(latitude)` of the centre.
pub fn circle_polygon(
  center: &Coordinates,
  radius_m: f64,
  vertices: usize,
) -> Vec<Coordinates> {
  let vertices = vertices.max(3);
  let dlat = radius_m / METERS_PER_DEGREE;
  let dlng = radius_m / (METERS_PER_DEGREE * center.lat.to_radians().cos());

  let mut ring: Vec<Coordinates> = (0..vertices)
    .map(|i| {
      let theta = (i as f64 / vertices as f64) * 2.0 * PI;
      Coordinates::new(
        center.lat + dlat * theta.sin(),
        center.lng + dlng * theta.cos(),
      )
    })
    .collect();
  ring.push(ring[0]);
  ring
}
