//! Players and their position in a lineage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A player. Lineage fields are overwritten each time the player is infected;
/// `tags_given` and the location move each time they infect someone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:            Uuid,
  pub username:           String,
  pub current_strain_id:  Option<Uuid>,
  pub current_variant_id: Option<Uuid>,
  /// Origin of the lineage this player belongs to.
  pub root_user_id:       Option<Uuid>,
  /// Whoever infected this player most recently.
  pub parent_user_id:     Option<Uuid>,
  /// Hop count from the strain's origin.
  pub generation:         u32,
  pub tags_given:         u32,
  pub tags_received:      u32,
  /// Credit for carried tags this player originated, one per new carrier.
  pub direct_score:       f64,
  /// Decayed credit for the same spread (`0.5^depth` per new carrier).
  pub indirect_score:     f64,
  pub last_location:      Option<GeoPoint>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::InfectionStore::create_user`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub username:           String,
  #[serde(default)]
  pub current_variant_id: Option<Uuid>,
  #[serde(default)]
  pub last_location:      Option<GeoPoint>,
}

impl NewUser {
  pub fn new(username: impl Into<String>) -> Self {
    Self {
      username:           username.into(),
      current_variant_id: None,
      last_location:      None,
    }
  }

  pub fn at(mut self, location: GeoPoint) -> Self {
    self.last_location = Some(location);
    self
  }
}
