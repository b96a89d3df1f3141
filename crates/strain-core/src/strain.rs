//! Strains: one lineage tree per origin player, owning the aggregate
//! counters every infection along the lineage feeds into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strain {
  pub strain_id:           Uuid,
  pub origin_user_id:      Uuid,
  /// Tag rows created directly on this strain.
  pub direct_infections:   u32,
  /// Decayed credit received from descendants via the ancestor climb.
  pub indirect_infections: f64,
  /// Weighted total; the value milestones and unlocks are measured against.
  pub total_infections:    f64,
  /// Deepest generation reached on this strain.
  pub depth:               u32,
  pub mutation_points:     u32,
  pub outbreak_count:      u32,
  /// Longest same-variant chain seen on this strain.
  pub variant_chain_depth: u32,
  pub countries:           Vec<String>,
  pub created_at:          DateTime<Utc>,
}
