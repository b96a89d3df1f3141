//! Mutation skill-tree nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Modifiers granted by an unlocked node. Absent fields have no effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationBoost {
  /// Multiplied into the infector's mutation boost.
  #[serde(default)]
  pub spread_multiplier: Option<f64>,
  /// Metres added to the active variant's radius for the request.
  #[serde(default)]
  pub radius_boost:      Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationNode {
  pub node_id: Uuid,
  pub name:    String,
  pub boost:   MutationBoost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMutationUnlock {
  pub user_id:     Uuid,
  pub node_id:     Uuid,
  pub unlocked_at: DateTime<Utc>,
}
