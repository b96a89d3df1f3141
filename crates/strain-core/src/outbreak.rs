//! Outbreak zones, outbreak events and tag drops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A circular hot area that boosts infections inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutbreakZone {
  pub zone_id:    Uuid,
  pub region_id:  String,
  pub zone_type:  String,
  pub center:     GeoPoint,
  pub radius_m:   f64,
  pub multiplier: f64,
}

/// What the zone detector reports for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneHit {
  pub zone_type:  String,
  pub multiplier: f64,
  pub region_id:  String,
}

impl Default for ZoneHit {
  /// Outside every zone.
  fn default() -> Self {
    Self {
      zone_type:  "general".to_owned(),
      multiplier: 1.0,
      region_id:  "unknown".to_owned(),
    }
  }
}

/// Input to [`crate::store::InfectionStore::create_outbreak_event`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutbreakEvent {
  pub region_id:  String,
  pub strain_id:  Uuid,
  pub user_id:    Uuid,
  pub multiplier: f64,
  pub zone_type:  String,
  pub location:   GeoPoint,
  pub tag_count:  u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutbreakEvent {
  pub outbreak_id: Uuid,
  #[serde(flatten)]
  pub details:     NewOutbreakEvent,
  pub created_at:  DateTime<Utc>,
}

/// A geo-placed infection anyone may claim once before it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDrop {
  pub drop_id:    Uuid,
  pub creator_id: Uuid,
  pub location:   GeoPoint,
  pub expires_at: DateTime<Utc>,
  pub claimed_by: Vec<Uuid>,
}

impl TagDrop {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at < now }

  pub fn is_claimed_by(&self, user_id: Uuid) -> bool {
    self.claimed_by.contains(&user_id)
  }
}
