//! Geofencing: safe-perimeter and danger-zone evaluation.
//!
//! A [`GeofenceMonitor`] is fed successive positions and reports zone
//! *transitions*. Each zone keeps its last inside/outside state, so a user
//! lingering in a danger zone is notified once, and notified again only after
//! leaving and re-entering.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::geo::{CIRCLE_VERTICES, Coordinates, circle_polygon};

// ─── Zones ───────────────────────────────────────────────────────────────────

/// A named circular area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
  pub name:     String,
  pub center:   Coordinates,
  pub radius_m: f64,
}

impl Zone {
  pub fn new(name: impl Into<String>, center: Coordinates, radius_m: f64) -> Self {
    Self { name: name.into(), center, radius_m }
  }

  /// Haversine distance from the zone centre to `position`.
  pub fn distance_m(&self, position: &Coordinates) -> f64 {
    self.center.distance_m(position)
  }

  /// `true` iff `position` lies within `radius_m` of the centre (boundary
  /// inclusive).
  pub fn contains(&self, position: &Coordinates) -> bool {
    self.distance_m(position) <= self.radius_m
  }

  /// Closed outline ring for map rendering.
  pub fn polygon(&self) -> Vec<Coordinates> {
    circle_polygon(&self.center, self.radius_m, CIRCLE_VERTICES)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
  SafePerimeter,
  Danger,
}

/// One safe perimeter plus any number of danger zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
  pub safe_perimeter: Zone,
  #[serde(default)]
  pub danger_zones:   Vec<Zone>,
}

impl Geofence {
  /// A safe perimeter of `radius_m` around `start`, named after the place the
  /// user set out from.
  pub fn around(start: Coordinates, radius_m: f64, danger_zones: Vec<Zone>) -> Self {
    Self {
      safe_perimeter: Zone::new("Tourist Safe Zone", start, radius_m),
      danger_zones,
    }
  }

  /// GeoJSON `FeatureCollection` with one polygon per zone and, when given,
  /// a point for the user's current position.
  pub fn to_geojson(&self, user: Option<&Coordinates>) -> serde_json::Value {
    let zones = std::iter::once((ZoneKind::SafePerimeter, &self.safe_perimeter))
      .chain(self.danger_zones.iter().map(|z| (ZoneKind::Danger, z)));

    let mut features: Vec<serde_json::Value> = zones
      .map(|(kind, zone)| {
        let ring: Vec<[f64; 2]> =
          zone.polygon().iter().map(Coordinates::to_lng_lat).collect();
        json!({
          "type": "Feature",
          "properties": {
            "name": zone.name,
            "kind": kind,
            "radius_m": zone.radius_m,
          },
          "geometry": { "type": "Polygon", "coordinates": [ring] },
        })
      })
      .collect();

    if let Some(position) = user {
      features.push(json!({
        "type": "Feature",
        "properties": { "name": "Your Location", "kind": "user" },
        "geometry": { "type": "Point", "coordinates": position.to_lng_lat() },
      }));
    }

    json!({ "type": "FeatureCollection", "features": features })
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A zone boundary crossing detected between two observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GeofenceEvent {
  LeftSafePerimeter { zone: String, distance_m: f64 },
  ReturnedToSafePerimeter { zone: String, distance_m: f64 },
  EnteredDangerZone { zone: String, distance_m: f64 },
  LeftDangerZone { zone: String, distance_m: f64 },
}

/// A user-facing notification derived from a [`GeofenceEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body:  String,
}

impl GeofenceEvent {
  pub fn zone(&self) -> &str {
    match self {
      Self::LeftSafePerimeter { zone, .. }
      | Self::ReturnedToSafePerimeter { zone, .. }
      | Self::EnteredDangerZone { zone, .. }
      | Self::LeftDangerZone { zone, .. } => zone,
    }
  }

  /// Only leaving the safe perimeter and entering a danger zone notify.
  pub fn notification(&self) -> Option<Notification> {
    match self {
      Self::LeftSafePerimeter { zone, .. } => Some(Notification {
        title: "Safe Zone Alert".to_owned(),
        body:  format!("You have left the {zone}. Please stay cautious."),
      }),
      Self::EnteredDangerZone { zone, .. } => Some(Notification {
        title: "Danger Zone Alert".to_owned(),
        body:  format!("You have entered {zone}. Move to a safer area if possible."),
      }),
      Self::ReturnedToSafePerimeter { .. } | Self::LeftDangerZone { .. } => None,
    }
  }
}

// ─── Monitor ─────────────────────────────────────────────────────────────────

/// Edge-triggered evaluator over a [`Geofence`].
#[derive(Debug, Clone)]
pub struct GeofenceMonitor {
  fence:         Geofence,
  inside_safe:   bool,
  inside_danger: Vec<bool>,
  last_position: Option<Coordinates>,
}

impl GeofenceMonitor {
  pub fn new(fence: Geofence) -> Self {
    let inside_danger = vec![false; fence.danger_zones.len()];
    Self { fence, inside_safe: true, inside_danger, last_position: None }
  }

  pub fn geofence(&self) -> &Geofence { &self.fence }

  pub fn last_position(&self) -> Option<&Coordinates> { self.last_position.as_ref() }

  pub fn inside_safe_perimeter(&self) -> bool { self.inside_safe }

  /// Names of the danger zones the last observed position fell in.
  pub fn active_danger_zones(&self) -> Vec<&str> {
    self
      .fence
      .danger_zones
      .iter()
      .zip(&self.inside_danger)
      .filter(|(_, inside)| **inside)
      .map(|(zone, _)| zone.name.as_str())
      .collect()
  }

  /// Forget all per-zone state, as if monitoring had just started.
  pub fn reset(&mut self) {
    self.inside_safe = true;
    self.inside_danger.iter_mut().for_each(|s| *s = false);
    self.last_position = None;
  }

  /// Evaluate `position` and return the transitions it caused, safe
  /// perimeter first, then danger zones in configuration order.
  pub fn observe(&mut self, position: Coordinates) -> Vec<GeofenceEvent> {
    let mut events = Vec::new();

    let safe = &self.fence.safe_perimeter;
    let distance_m = safe.distance_m(&position);
    let inside = distance_m <= safe.radius_m;
    if inside != self.inside_safe {
      let zone = safe.name.clone();
      events.push(if inside {
        GeofenceEvent::ReturnedToSafePerimeter { zone, distance_m }
      } else {
        GeofenceEvent::LeftSafePerimeter { zone, distance_m }
      });
      self.inside_safe = inside;
    }

    for (zone, was_inside) in self.fence.danger_zones.iter().zip(self.inside_danger.iter_mut()) {
      let distance_m = zone.distance_m(&position);
      let inside = distance_m <= zone.radius_m;
      if inside != *was_inside {
        let name = zone.name.clone();
        events.push(if inside {
          GeofenceEvent::EnteredDangerZone { zone: name, distance_m }
        } else {
          GeofenceEvent::LeftDangerZone { zone: name, distance_m }
        });
        *was_inside = inside;
      }
    }

    self.last_position = Some(position);
    events
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const START: Coordinates = Coordinates::new(23.0225, 72.5714);

  fn fence() -> Geofence {
    Geofence::around(
      START,
      1_000.0,
      vec![Zone::new("High Crime Area", START.offset_m(400.0, 400.0), 150.0)],
    )
  }

  #[test]
  fn membership_matches_haversine_radius() {
    let zone = Zone::new("z", Coordinates::new(0.0, 0.0), 1_113.0);
    assert!(zone.contains(&Coordinates::new(0.0, 0.01)));
    let tight = Zone::new("z", Coordinates::new(0.0, 0.0), 1_100.0);
    assert!(!tight.contains(&Coordinates::new(0.0, 0.01)));
  }

  #[test]
  fn staying_home_is_silent() {
    let mut monitor = GeofenceMonitor::new(fence());
    assert!(monitor.observe(START).is_empty());
    assert!(monitor.observe(START.offset_m(100.0, 0.0)).is_empty());
  }

  #[test]
  fn leaving_the_perimeter_notifies_once() {
    let mut monitor = GeofenceMonitor::new(fence());
    let away = START.offset_m(-2_000.0, 0.0);

    let events = monitor.observe(away);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], GeofenceEvent::LeftSafePerimeter { .. }));
    assert!(events[0].notification().is_some());

    assert!(monitor.observe(away.offset_m(-50.0, 0.0)).is_empty());
    assert!(!monitor.inside_safe_perimeter());
  }

  #[test]
  fn returning_rearms_the_perimeter() {
    let mut monitor = GeofenceMonitor::new(fence());
    let away = START.offset_m(-2_000.0, 0.0);

    monitor.observe(away);
    let back = monitor.observe(START);
    assert_eq!(back.len(), 1);
    assert!(matches!(back[0], GeofenceEvent::ReturnedToSafePerimeter { .. }));
    assert!(back[0].notification().is_none());

    let again = monitor.observe(away);
    assert!(matches!(again[0], GeofenceEvent::LeftSafePerimeter { .. }));
  }

  #[test]
  fn danger_zone_is_edge_triggered() {
    let mut monitor = GeofenceMonitor::new(fence());
    let hotspot = START.offset_m(400.0, 400.0);

    let entered = monitor.observe(hotspot);
    assert_eq!(entered.len(), 1);
    assert_eq!(entered[0].zone(), "High Crime Area");
    assert!(entered[0].notification().is_some());
    assert_eq!(monitor.active_danger_zones(), vec!["High Crime Area"]);

    // Lingering does not re-fire.
    assert!(monitor.observe(hotspot.offset_m(10.0, 0.0)).is_empty());

    let left = monitor.observe(START);
    assert!(matches!(left[0], GeofenceEvent::LeftDangerZone { .. }));

    let reentered = monitor.observe(hotspot);
    assert!(matches!(reentered[0], GeofenceEvent::EnteredDangerZone { .. }));
  }

  #[test]
  fn first_fix_inside_danger_zone_notifies() {
    let mut monitor = GeofenceMonitor::new(fence());
    let events = monitor.observe(START.offset_m(400.0, 400.0));
    assert!(events.iter().any(|e| e.notification().is_some()));
  }

  #[test]
  fn reset_forgets_state() {
    let mut monitor = GeofenceMonitor::new(fence());
    monitor.observe(START.offset_m(400.0, 400.0));
    monitor.reset();
    assert!(monitor.active_danger_zones().is_empty());
    assert!(monitor.last_position().is_none());
    assert_eq!(monitor.observe(START.offset_m(400.0, 400.0)).len(), 1);
  }

  #[test]
  fn geojson_has_one_feature_per_zone_plus_user() {
    let geojson = fence().to_geojson(Some(&START));
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(features[0]["properties"]["kind"], "safe_perimeter");
    assert_eq!(features[1]["properties"]["kind"], "danger");
    assert_eq!(features[2]["geometry"]["type"], "Point");
    let ring = features[0]["geometry"]["coordinates"][0].as_array().unwrap();
    assert_eq!(ring.len(), CIRCLE_VERTICES + 1);
  }
}
