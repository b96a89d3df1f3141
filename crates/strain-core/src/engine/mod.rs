//! The infection processing engine.
//!
//! One call to [`InfectionEngine::process_infection`] runs a linear sequence:
//!
//! 1. validation and the cooldown claim ([`validate`])
//! 2. user/strain/variant lookups, variant rules and multipliers ([`multiplier`])
//! 3. root-tag bootstrap and the atomic lineage commit ([`lineage`])
//! 4. carried-tag propagation ([`propagation`])
//! 5. mutation-point milestones, outbreak detection ([`milestone`])
//! 6. the decayed ancestor climb for every created tag ([`ancestry`])
//! 7. variant unlocks ([`unlock`])
//! 8. best-effort notification
//!
//! Steps 1–2 write nothing. A failure in steps 2–3 releases the cooldown
//! claim; once the commit has landed the claim is kept.

pub mod ancestry;
pub mod lineage;
pub mod milestone;
pub mod multiplier;
pub mod propagation;
pub mod unlock;
pub mod validate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  config::EngineConfig,
  cooldown::CooldownStore,
  geo::GeoPoint,
  method::InfectionMethod,
  notify::{InfectionNotice, Notifier},
  store::InfectionStore,
  Error, Result,
};

pub use multiplier::Multipliers;
pub use propagation::{OriginScore, PropagationOutcome};

use validate::CooldownClaim;

// ─── Request / outcome ───────────────────────────────────────────────────────

/// Method-specific extras supplied by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfectionMetadata {
  /// Received signal strength for `proximity` infections, in dBm.
  #[serde(default)]
  pub signal_strength: Option<i32>,
  /// The drop being claimed, for `tag_drop` infections.
  #[serde(default)]
  pub drop_id:         Option<Uuid>,
}

/// A proposed infection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfectionRequest {
  pub infector_id: Uuid,
  pub infected_id: Uuid,
  pub location:    GeoPoint,
  pub method:      InfectionMethod,
  /// Overrides the infector's active variant for this request.
  #[serde(default)]
  pub variant_id:  Option<Uuid>,
  /// Explicit tags; one tag row is written per entry (at least one).
  #[serde(default)]
  pub tag_ids:     Vec<Uuid>,
  #[serde(default)]
  pub metadata:    InfectionMetadata,
}

impl InfectionRequest {
  pub fn new(
    infector_id: Uuid,
    infected_id: Uuid,
    location: GeoPoint,
    method: InfectionMethod,
  ) -> Self {
    Self {
      infector_id,
      infected_id,
      location,
      method,
      variant_id: None,
      tag_ids: Vec::new(),
      metadata: InfectionMetadata::default(),
    }
  }
}

/// The result of a recorded infection.
#[derive(Debug, Clone, Serialize)]
pub struct InfectionOutcome {
  pub success:            bool,
  pub infection_event_id: Uuid,
  pub tag_ids:            Vec<Uuid>,
  /// The enhanced score added to the strain total.
  pub score:              f64,
  pub multipliers:        Multipliers,
  pub propagation:        PropagationOutcome,
  pub mp_awarded:         u32,
  pub outbreak_triggered: bool,
  pub unlocked_variants:  Vec<Uuid>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Processes infections against a store, an optional cooldown/leaderboard
/// store and a notifier. Holds no per-request state.
pub struct InfectionEngine<S, C, N> {
  store:     Arc<S>,
  cooldowns: Option<Arc<C>>,
  notifier:  Arc<N>,
  config:    EngineConfig,
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  pub fn new(
    store: Arc<S>,
    cooldowns: Option<Arc<C>>,
    notifier: Arc<N>,
    config: EngineConfig,
  ) -> Self {
    Self { store, cooldowns, notifier, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// Validate, score and record one infection, then run every side effect.
  pub async fn process_infection(
    &self,
    request: InfectionRequest,
  ) -> Result<InfectionOutcome> {
    let claim = self.validate(&request).await?;

    let prepared = self.compute_multipliers(&request).await;
    let prepared = self.or_release(&claim, prepared).await?;
    debug!(
      multipliers = ?prepared.pricing.multipliers,
      enhanced_score = prepared.enhanced_score(),
      "infection priced"
    );

    let written = self.write_lineage(&request, &prepared).await;
    let written = self.or_release(&claim, written).await?;
    let committed = &written.committed;
    let strain_id = committed.strain.strain_id;
    let multipliers = prepared.pricing.multipliers;

    let propagation = self
      .propagate_tags(request.infector_id, request.infected_id)
      .await?;

    let mp_awarded = self
      .award_milestones(
        &written.strain_before,
        &committed.strain,
        written.generation,
        multipliers.outbreak,
      )
      .await?;

    let outbreak_triggered = self
      .check_outbreak(
        strain_id,
        request.infector_id,
        &prepared.pricing.zone,
        request.location,
      )
      .await?;

    if prepared.pricing.variant_chain_depth > 0 {
      self
        .store
        .update_variant_chain_depth(
          strain_id,
          prepared.pricing.variant_chain_depth,
        )
        .await
        .map_err(Error::store)?;
    }

    for tag in &committed.tags {
      self.update_ancestor_scores(tag).await?;
    }

    let total = self
      .store
      .get_strain(strain_id)
      .await
      .map_err(Error::store)?
      .map_or(committed.strain.total_infections, |s| s.total_infections);
    let unlocked_variants =
      self.unlock_variants(request.infector_id, total).await?;

    let outcome = InfectionOutcome {
      success: true,
      infection_event_id: committed.event.event_id,
      tag_ids: committed.tags.iter().map(|t| t.tag_id).collect(),
      score: prepared.enhanced_score(),
      multipliers,
      propagation,
      mp_awarded,
      outbreak_triggered,
      unlocked_variants,
    };

    info!(
      event = %outcome.infection_event_id,
      infector = %request.infector_id,
      infected = %request.infected_id,
      method = %request.method,
      strain = %strain_id,
      score = outcome.score,
      transmitted = outcome.propagation.transmitted,
      "infection recorded"
    );

    self.dispatch_notice(&request, &outcome).await;
    Ok(outcome)
  }

  async fn or_release<T>(
    &self,
    claim: &Option<CooldownClaim>,
    result: Result<T>,
  ) -> Result<T> {
    if result.is_err() {
      self.release_cooldown(claim).await;
    }
    result
  }

  async fn dispatch_notice(
    &self,
    request: &InfectionRequest,
    outcome: &InfectionOutcome,
  ) {
    let notice = InfectionNotice {
      infection_event_id: outcome.infection_event_id,
      infector_id:        request.infector_id,
      infected_id:        request.infected_id,
      method:             request.method,
      score:              outcome.score,
      outbreak_triggered: outcome.outbreak_triggered,
      unlocked_variants:  outcome.unlocked_variants.clone(),
    };
    if let Err(e) = self.notifier.notify_infection(&notice).await {
      warn!(error = %e, event = %notice.infection_event_id, "notification failed");
    }
  }
}
