//! The `InfectionStore` trait and the commit payload for one infection.
//!
//! The trait is implemented by storage backends (e.g. `strain-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! Counter updates are expressed as increments so a backend can apply them
//! atomically (`SET x = x + n`) instead of read-modify-write from the caller.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  geo::GeoPoint,
  method::InfectionMethod,
  mutation::MutationNode,
  outbreak::{NewOutbreakEvent, OutbreakEvent, TagDrop, ZoneHit},
  strain::Strain,
  tag::{InfectionEvent, NewTag, NewUserTag, Tag, UserTag},
  user::{NewUser, User},
  variant::Variant,
};

// ─── Commit payload ──────────────────────────────────────────────────────────

/// Everything the lineage writer persists for one infection. A backend must
/// apply all of it or none of it.
#[derive(Debug, Clone)]
pub struct InfectionCommit {
  /// Template for each of the `tag_count` identical tag rows.
  pub tag:                   NewTag,
  pub tag_count:             u32,
  pub infector_id:           Uuid,
  pub infected_id:           Uuid,
  pub method:                InfectionMethod,
  pub location:              GeoPoint,
  /// The infected player's new `root_user_id`.
  pub infected_root_user_id: Uuid,
  /// Added to the strain's `total_infections`.
  pub enhanced_score:        f64,
  /// Tag drop to mark as claimed by the infected player.
  pub claim_drop:            Option<Uuid>,
}

/// What [`InfectionStore::commit_infection`] wrote.
#[derive(Debug, Clone)]
pub struct CommittedInfection {
  pub event:  InfectionEvent,
  /// Created tags, with `infection_event_id` already back-filled.
  pub tags:   Vec<Tag>,
  /// The strain row as it stands after the aggregate update.
  pub strain: Strain,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store backing the game.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait InfectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Add to a player's propagation scores.
  fn add_user_scores(
    &self,
    user_id: Uuid,
    direct: f64,
    indirect: f64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Strains ───────────────────────────────────────────────────────────

  /// Create the strain originating at `origin_user_id` and make it that
  /// player's current strain.
  fn create_strain(
    &self,
    origin_user_id: Uuid,
  ) -> impl Future<Output = Result<Strain, Self::Error>> + Send + '_;

  fn get_strain(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Strain>, Self::Error>> + Send + '_;

  /// Add `contribution` to both `indirect_infections` and `total_infections`.
  /// Returns the new total, or `None` if the strain does not exist.
  fn add_strain_score(
    &self,
    strain_id: Uuid,
    contribution: f64,
  ) -> impl Future<Output = Result<Option<f64>, Self::Error>> + Send + '_;

  fn award_mutation_points(
    &self,
    strain_id: Uuid,
    points: u32,
    reason: &'static str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Raise the strain's recorded variant-chain depth to at least `depth`.
  fn update_variant_chain_depth(
    &self,
    strain_id: Uuid,
    depth: u32,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Infection tags (not root tags) created on the strain since `since`.
  fn count_recent_strain_tags(
    &self,
    strain_id: Uuid,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Tags on the strain carrying `variant_id`, capped at `cap`.
  fn count_variant_chain(
    &self,
    strain_id: Uuid,
    variant_id: Uuid,
    cap: u32,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  // ── Outbreaks ─────────────────────────────────────────────────────────

  /// Zones that contain `point`, searched within `radius_m` of it, strongest
  /// multiplier first.
  fn detect_outbreak_zones(
    &self,
    point: GeoPoint,
    radius_m: f64,
  ) -> impl Future<Output = Result<Vec<ZoneHit>, Self::Error>> + Send + '_;

  fn region_modifier<'a>(
    &'a self,
    region_id: &'a str,
  ) -> impl Future<Output = Result<Option<f64>, Self::Error>> + Send + 'a;

  fn create_outbreak_event(
    &self,
    input: NewOutbreakEvent,
  ) -> impl Future<Output = Result<OutbreakEvent, Self::Error>> + Send + '_;

  fn increment_outbreak_count(
    &self,
    strain_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_tag_drop(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TagDrop>, Self::Error>> + Send + '_;

  // ── Tags ──────────────────────────────────────────────────────────────

  fn get_tag(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// The player's `(origin = tagger = target = self)` root tag, if any.
  fn find_root_tag(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// The most recent tag whose target is `user_id`.
  fn latest_inbound_tag(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  fn insert_tag(
    &self,
    input: NewTag,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  /// Persist a whole infection atomically. See [`InfectionCommit`].
  fn commit_infection(
    &self,
    commit: InfectionCommit,
  ) -> impl Future<Output = Result<CommittedInfection, Self::Error>> + Send + '_;

  // ── Carried tags ──────────────────────────────────────────────────────

  fn list_user_tags(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<UserTag>, Self::Error>> + Send + '_;

  /// Insert memberships, skipping pairs that already exist. Returns only the
  /// rows actually inserted.
  fn insert_user_tags(
    &self,
    input: Vec<NewUserTag>,
  ) -> impl Future<Output = Result<Vec<UserTag>, Self::Error>> + Send + '_;

  // ── Variants and mutations ────────────────────────────────────────────

  fn get_variant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Variant>, Self::Error>> + Send + '_;

  fn list_variants(
    &self,
  ) -> impl Future<Output = Result<Vec<Variant>, Self::Error>> + Send + '_;

  fn unlocked_variant_ids(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Record an unlock. Returns `false` if it already existed.
  fn unlock_variant(
    &self,
    user_id: Uuid,
    variant_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn unlocked_mutations(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MutationNode>, Self::Error>> + Send + '_;
}
