//! Mutation-point milestones and outbreak detection.

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
  config::EngineConfig,
  cooldown::CooldownStore,
  geo::GeoPoint,
  notify::Notifier,
  outbreak::{NewOutbreakEvent, ZoneHit},
  store::InfectionStore,
  strain::Strain,
  Error, Result,
};

use super::InfectionEngine;

pub const MILESTONE_REASON: &str = "infection_milestone";

/// `(total_infections threshold, points)`.
const TOTAL_MILESTONES: [(f64, u32); 3] = [(100.0, 5), (500.0, 10), (1000.0, 20)];

/// `(generation threshold, points)`.
const GENERATION_MILESTONES: [(u32, u32); 3] = [(10, 5), (20, 10), (50, 25)];

const HOT_ZONE_MULTIPLIER: f64 = 2.0;
const HOT_ZONE_POINTS: u32 = 2;

/// Points earned by one infection. Thresholds pay out only on the transition
/// from below to at-or-above.
pub fn milestone_points(
  total_before: f64,
  total_after: f64,
  depth_before: u32,
  generation: u32,
  outbreak_multiplier: f64,
) -> u32 {
  let totals: u32 = TOTAL_MILESTONES
    .iter()
    .filter(|(t, _)| total_before < *t && total_after >= *t)
    .map(|(_, p)| p)
    .sum();

  let depths: u32 = GENERATION_MILESTONES
    .iter()
    .filter(|(g, _)| depth_before < *g && generation >= *g)
    .map(|(_, p)| p)
    .sum();

  let hot = if outbreak_multiplier > HOT_ZONE_MULTIPLIER {
    HOT_ZONE_POINTS
  } else {
    0
  };

  totals + depths + hot
}

/// Whether a zone multiplier and recent activity amount to an outbreak.
pub fn is_outbreak(
  multiplier: f64,
  recent_tags: u32,
  config: &EngineConfig,
) -> bool {
  multiplier > config.outbreak_multiplier_trigger
    && recent_tags >= config.outbreak_tag_threshold
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  /// Award milestone points for the move from `before` to `after`. Returns
  /// the number of points awarded.
  pub(super) async fn award_milestones(
    &self,
    before: &Strain,
    after: &Strain,
    generation: u32,
    outbreak_multiplier: f64,
  ) -> Result<u32> {
    let points = milestone_points(
      before.total_infections,
      after.total_infections,
      before.depth,
      generation,
      outbreak_multiplier,
    );
    if points > 0 {
      self
        .store
        .award_mutation_points(after.strain_id, points, MILESTONE_REASON)
        .await
        .map_err(Error::store)?;
      info!(strain = %after.strain_id, points, "mutation points awarded");
    }
    Ok(points)
  }

  /// Emit an outbreak event when a hot zone sees a burst of infections on
  /// the strain.
  pub(super) async fn check_outbreak(
    &self,
    strain_id: Uuid,
    user_id: Uuid,
    zone: &ZoneHit,
    location: GeoPoint,
  ) -> Result<bool> {
    if zone.multiplier <= self.config.outbreak_multiplier_trigger {
      return Ok(false);
    }

    let since = Utc::now() - Duration::minutes(self.config.outbreak_window_minutes);
    let recent = self
      .store
      .count_recent_strain_tags(strain_id, since)
      .await
      .map_err(Error::store)?;
    if !is_outbreak(zone.multiplier, recent, &self.config) {
      return Ok(false);
    }

    self
      .store
      .create_outbreak_event(NewOutbreakEvent {
        region_id: zone.region_id.clone(),
        strain_id,
        user_id,
        multiplier: zone.multiplier,
        zone_type: zone.zone_type.clone(),
        location,
        tag_count: recent,
      })
      .await
      .map_err(Error::store)?;
    self
      .store
      .increment_outbreak_count(strain_id)
      .await
      .map_err(Error::store)?;

    info!(
      strain = %strain_id,
      region = %zone.region_id,
      tags = recent,
      "outbreak triggered"
    );
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_threshold_pays_once() {
    assert_eq!(milestone_points(95.0, 105.0, 0, 1, 1.0), 5);
    assert_eq!(milestone_points(105.0, 110.0, 0, 1, 1.0), 0);
  }

  #[test]
  fn landing_exactly_on_threshold_counts() {
    assert_eq!(milestone_points(99.0, 100.0, 0, 1, 1.0), 5);
    assert_eq!(milestone_points(100.0, 101.0, 0, 1, 1.0), 0);
  }

  #[test]
  fn several_thresholds_in_one_jump() {
    assert_eq!(milestone_points(90.0, 1200.0, 0, 1, 1.0), 35);
  }

  #[test]
  fn generation_thresholds() {
    assert_eq!(milestone_points(0.0, 1.0, 9, 10, 1.0), 5);
    assert_eq!(milestone_points(0.0, 1.0, 10, 11, 1.0), 0);
    assert_eq!(milestone_points(0.0, 1.0, 0, 50, 1.0), 40);
  }

  #[test]
  fn hot_zone_bonus() {
    assert_eq!(milestone_points(0.0, 1.0, 0, 1, 2.0), 0);
    assert_eq!(milestone_points(0.0, 1.0, 0, 1, 2.5), 2);
  }

  #[test]
  fn outbreak_needs_multiplier_and_burst() {
    let config = EngineConfig::default();
    assert!(!is_outbreak(6.0, 4, &config));
    assert!(is_outbreak(6.0, 5, &config));
    assert!(!is_outbreak(5.0, 50, &config));
  }
}
