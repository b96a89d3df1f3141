//! Geographic points and the distance procedure used by radius rules and
//! zone detection.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

impl GeoPoint {
  pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }
}

/// Great-circle distance between two points, in metres (haversine).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
  let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lng = (b.lng - a.lng).to_radians();

  let h = (d_lat / 2.0).sin().powi(2)
    + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
  2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
