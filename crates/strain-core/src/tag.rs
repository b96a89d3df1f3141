//! Tags, infection events and carried-tag memberships.
//!
//! Tags form a forest: every non-root tag has exactly one parent, and each
//! player owns one root tag (`tagger == target == origin`, generation 0).
//! Carried-tag memberships ([`UserTag`]) are a separate, append-only set per
//! player that grows by propagation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{geo::GeoPoint, method::InfectionMethod};

// ─── Score snapshot ──────────────────────────────────────────────────────────

/// Multipliers frozen onto a tag when it is created. The ancestor climb reads
/// these rather than recomputing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
  pub outbreak_multiplier: f64,
  pub region_multiplier:   f64,
  pub mutation_boost:      f64,
  pub variant_chain_bonus: f64,
  pub final_score:         f64,
}

impl Default for ScoreSnapshot {
  fn default() -> Self {
    Self {
      outbreak_multiplier: 1.0,
      region_multiplier:   1.0,
      mutation_boost:      1.0,
      variant_chain_bonus: 0.0,
      final_score:         1.0,
    }
  }
}

// ─── Tag ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:             Uuid,
  pub tagger_id:          Uuid,
  pub target_id:          Uuid,
  pub strain_id:          Uuid,
  pub variant_id:         Option<Uuid>,
  /// `None` for root tags.
  pub parent_tag_id:      Option<Uuid>,
  pub root_user_id:       Uuid,
  pub origin_user_id:     Uuid,
  pub generation:         u32,
  pub snapshot:           ScoreSnapshot,
  /// `None` for root tags, which are bootstrapped rather than delivered.
  pub infection_method:   Option<InfectionMethod>,
  /// Back-reference filled in once the event row exists.
  pub infection_event_id: Option<Uuid>,
  pub location:           Option<GeoPoint>,
  pub created_at:         DateTime<Utc>,
}

impl Tag {
  pub fn is_root(&self) -> bool { self.parent_tag_id.is_none() }
}

/// Input for a tag row; ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTag {
  pub tagger_id:        Uuid,
  pub target_id:        Uuid,
  pub strain_id:        Uuid,
  pub variant_id:       Option<Uuid>,
  pub parent_tag_id:    Option<Uuid>,
  pub root_user_id:     Uuid,
  pub origin_user_id:   Uuid,
  pub generation:       u32,
  pub snapshot:         ScoreSnapshot,
  pub infection_method: Option<InfectionMethod>,
  pub location:         Option<GeoPoint>,
}

impl NewTag {
  /// The generation-0 self tag a player's lineage hangs from.
  pub fn root(user_id: Uuid, strain_id: Uuid) -> Self {
    Self {
      tagger_id: user_id,
      target_id: user_id,
      strain_id,
      variant_id: None,
      parent_tag_id: None,
      root_user_id: user_id,
      origin_user_id: user_id,
      generation: 0,
      snapshot: ScoreSnapshot::default(),
      infection_method: None,
      location: None,
    }
  }

  /// Materialise with a fresh id.
  pub fn into_tag(self, created_at: DateTime<Utc>) -> Tag {
    Tag {
      tag_id: Uuid::new_v4(),
      tagger_id: self.tagger_id,
      target_id: self.target_id,
      strain_id: self.strain_id,
      variant_id: self.variant_id,
      parent_tag_id: self.parent_tag_id,
      root_user_id: self.root_user_id,
      origin_user_id: self.origin_user_id,
      generation: self.generation,
      snapshot: self.snapshot,
      infection_method: self.infection_method,
      infection_event_id: None,
      location: self.location,
      created_at,
    }
  }
}

// ─── Infection event ─────────────────────────────────────────────────────────

/// Immutable record of one infection transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfectionEvent {
  pub event_id:    Uuid,
  pub infector_id: Uuid,
  pub infected_id: Uuid,
  pub tag_ids:     Vec<Uuid>,
  pub method:      InfectionMethod,
  pub location:    GeoPoint,
  /// 0 for a direct infection.
  pub tier:        u32,
  pub created_at:  DateTime<Utc>,
}

// ─── Carried tags ────────────────────────────────────────────────────────────

/// Membership of a tag in a player's carried set. Unique per
/// `(user_id, tag_id)`; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTag {
  pub user_id:          Uuid,
  pub tag_id:           Uuid,
  /// The tag's origin, not necessarily whoever passed it on.
  pub origin_user_id:   Uuid,
  /// Propagation hops, independent of the tag's own generation.
  pub generation_depth: u32,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserTag {
  pub user_id:          Uuid,
  pub tag_id:           Uuid,
  pub origin_user_id:   Uuid,
  pub generation_depth: u32,
}
