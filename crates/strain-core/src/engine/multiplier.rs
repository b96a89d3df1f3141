//! Lookups, variant rule enforcement and the five score factors.
//!
//! ```text
//! score = base_tag_count * outbreak * region * mutation * method + variant_chain
//! ```
//!
//! The variant-chain bonus is additive. Each tag row freezes the same
//! factors with `base_tag_count = 1`.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  geo::distance_m,
  method::InfectionMethod,
  mutation::MutationNode,
  notify::Notifier,
  outbreak::ZoneHit,
  store::InfectionStore,
  strain::Strain,
  tag::ScoreSnapshot,
  user::User,
  variant::{Variant, VariantRules},
  Error, Rejection, Result,
};

use super::{InfectionEngine, InfectionRequest};

/// Bonus per link in a same-variant chain.
const VARIANT_CHAIN_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
  pub outbreak:      f64,
  pub region:        f64,
  pub mutation:      f64,
  /// Additive, not multiplicative.
  pub variant_chain: f64,
  pub method:        f64,
}

impl Default for Multipliers {
  fn default() -> Self {
    Self {
      outbreak:      1.0,
      region:        1.0,
      mutation:      1.0,
      variant_chain: 0.0,
      method:        1.0,
    }
  }
}

impl Multipliers {
  pub fn score(&self, base_tag_count: u32) -> f64 {
    f64::from(base_tag_count)
      * self.outbreak
      * self.region
      * self.mutation
      * self.method
      + self.variant_chain
  }

  /// The per-tag snapshot frozen at creation.
  pub fn snapshot(&self) -> ScoreSnapshot {
    ScoreSnapshot {
      outbreak_multiplier: self.outbreak,
      region_multiplier:   self.region,
      mutation_boost:      self.mutation,
      variant_chain_bonus: self.variant_chain,
      final_score:         self.score(1),
    }
  }
}

/// `max(1, len(tag_ids))`.
pub fn base_tag_count(tag_ids: &[Uuid]) -> u32 {
  u32::try_from(tag_ids.len().max(1)).unwrap_or(u32::MAX)
}

/// Product of the nodes' spread multipliers. Radius boosts are added to
/// `rules.radius` when the variant has a radius rule.
pub fn mutation_boost(
  nodes: &[MutationNode],
  mut rules: Option<&mut VariantRules>,
) -> f64 {
  let mut product = 1.0;
  for node in nodes {
    if let Some(m) = node.boost.spread_multiplier {
      product *= m;
    }
    if let Some(extra) = node.boost.radius_boost
      && let Some(radius) =
        rules.as_deref_mut().and_then(|r| r.radius.as_mut())
    {
      *radius += extra;
    }
  }
  product
}

/// `(depth, bonus)` for `count` existing same-variant tags.
pub fn variant_chain(count: u32, cap: u32) -> (u32, f64) {
  let depth = count.min(cap) + 1;
  (depth, f64::from(depth) * VARIANT_CHAIN_STEP)
}

/// Enforce the active variant's rules. `local_hhmm` is the current local
/// wall-clock time as `"HH:MM"`.
pub fn check_variant_rules(
  rules: &VariantRules,
  infector: &User,
  infected: &User,
  method: InfectionMethod,
  local_hhmm: &str,
) -> Result<(), Rejection> {
  if let Some(limit) = rules.tag_limit
    && infector.tags_given >= limit
  {
    return Err(Rejection::TagLimitReached { limit });
  }

  if let Some(window) = &rules.time_restriction
    && !window.contains(local_hhmm)
  {
    return Err(Rejection::TimeRestricted {
      start: window.start.clone(),
      end:   window.end.clone(),
    });
  }

  if let Some(radius_m) = rules.radius
    && !method.bypasses_radius()
    && let (Some(a), Some(b)) = (infector.last_location, infected.last_location)
  {
    let distance_m = distance_m(a, b);
    if distance_m > radius_m {
      return Err(Rejection::OutOfRange { distance_m, radius_m });
    }
  }

  Ok(())
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pricing {
  pub multipliers:         Multipliers,
  /// 0 when no variant is active.
  pub variant_chain_depth: u32,
  pub zone:                ZoneHit,
}

/// Everything read and computed before the first write.
#[derive(Debug, Clone)]
pub struct Prepared {
  pub infector:       User,
  pub infected:       User,
  /// `None` when the infector has not started a strain yet.
  pub strain:         Option<Strain>,
  /// The active variant, with mutation radius boosts applied.
  pub variant:        Option<Variant>,
  pub base_tag_count: u32,
  pub pricing:        Pricing,
}

impl Prepared {
  pub fn enhanced_score(&self) -> f64 {
    self.pricing.multipliers.score(self.base_tag_count)
  }
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  pub(super) async fn compute_multipliers(
    &self,
    request: &InfectionRequest,
  ) -> Result<Prepared> {
    let infector = self.require_user(request.infector_id).await?;
    let infected = self.require_user(request.infected_id).await?;

    let strain = match infector.current_strain_id {
      Some(id) => Some(
        self
          .store
          .get_strain(id)
          .await
          .map_err(Error::store)?
          .ok_or(Error::StrainNotFound(id))?,
      ),
      None => None,
    };

    let mut variant = match request.variant_id.or(infector.current_variant_id) {
      Some(id) => Some(
        self
          .store
          .get_variant(id)
          .await
          .map_err(Error::store)?
          .ok_or(Error::VariantNotFound(id))?,
      ),
      None => None,
    };

    let pricing = self
      .price(request, &infector, &infected, strain.as_ref(), variant.as_mut())
      .await?;

    Ok(Prepared {
      infector,
      infected,
      strain,
      variant,
      base_tag_count: base_tag_count(&request.tag_ids),
      pricing,
    })
  }

  async fn require_user(&self, id: Uuid) -> Result<User> {
    self
      .store
      .get_user(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(id))
  }

  async fn price(
    &self,
    request: &InfectionRequest,
    infector: &User,
    infected: &User,
    strain: Option<&Strain>,
    mut variant: Option<&mut Variant>,
  ) -> Result<Pricing> {
    let zone = self
      .store
      .detect_outbreak_zones(request.location, self.config.zone_radius_m)
      .await
      .map_err(Error::store)?
      .into_iter()
      .next()
      .unwrap_or_default();

    let region = self
      .store
      .region_modifier(&zone.region_id)
      .await
      .map_err(Error::store)?
      .unwrap_or(1.0);

    let nodes = self
      .store
      .unlocked_mutations(infector.user_id)
      .await
      .map_err(Error::store)?;
    let mutation = mutation_boost(
      &nodes,
      variant.as_deref_mut().map(|v| &mut v.rules),
    );

    let (variant_chain_depth, chain_bonus) = match variant.as_deref() {
      Some(v) => {
        let local_hhmm = chrono::Local::now().format("%H:%M").to_string();
        check_variant_rules(
          &v.rules,
          infector,
          infected,
          request.method,
          &local_hhmm,
        )?;

        let count = match strain {
          Some(s) => self
            .store
            .count_variant_chain(
              s.strain_id,
              v.variant_id,
              self.config.variant_chain_cap,
            )
            .await
            .map_err(Error::store)?,
          None => 0,
        };
        variant_chain(count, self.config.variant_chain_cap)
      }
      None => (0, 0.0),
    };

    debug!(
      zone = %zone.zone_type,
      region_id = %zone.region_id,
      nodes = nodes.len(),
      variant_chain_depth,
      "multipliers resolved"
    );

    Ok(Pricing {
      multipliers: Multipliers {
        outbreak: zone.multiplier,
        region,
        mutation,
        variant_chain: chain_bonus,
        method: request.method.multiplier(),
      },
      variant_chain_depth,
      zone,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    geo::GeoPoint, mutation::MutationBoost, variant::TimeWindow,
  };

  fn user(tags_given: u32, location: Option<GeoPoint>) -> User {
    User {
      user_id: Uuid::new_v4(),
      username: "p".into(),
      current_strain_id: None,
      current_variant_id: None,
      root_user_id: None,
      parent_user_id: None,
      generation: 0,
      tags_given,
      tags_received: 0,
      direct_score: 0.0,
      indirect_score: 0.0,
      last_location: location,
      created_at: Utc::now(),
    }
  }

  fn node(spread: Option<f64>, radius: Option<f64>) -> MutationNode {
    MutationNode {
      node_id: Uuid::new_v4(),
      name:    "n".into(),
      boost:   MutationBoost {
        spread_multiplier: spread,
        radius_boost:      radius,
      },
    }
  }

  #[test]
  fn enhanced_score_example() {
    let m = Multipliers {
      outbreak: 2.0,
      region: 1.5,
      ..Multipliers::default()
    };
    assert_eq!(m.score(1), 3.0);
  }

  #[test]
  fn chain_bonus_is_additive() {
    let m = Multipliers {
      outbreak: 2.0,
      variant_chain: 1.5,
      ..Multipliers::default()
    };
    assert_eq!(m.score(3), 7.5);
    assert_eq!(m.snapshot().final_score, 3.5);
  }

  #[test]
  fn base_tag_count_is_at_least_one() {
    assert_eq!(base_tag_count(&[]), 1);
    assert_eq!(base_tag_count(&[Uuid::new_v4(), Uuid::new_v4()]), 2);
  }

  #[test]
  fn mutation_product_and_radius_boost() {
    let mut rules = VariantRules { radius: Some(100.0), ..Default::default() };
    let nodes = [
      node(Some(1.5), None),
      node(None, Some(50.0)),
      node(Some(2.0), Some(25.0)),
    ];
    let boost = mutation_boost(&nodes, Some(&mut rules));
    assert_eq!(boost, 3.0);
    assert_eq!(rules.radius, Some(175.0));
  }

  #[test]
  fn radius_boost_without_radius_rule_is_ignored() {
    let mut rules = VariantRules::default();
    mutation_boost(&[node(None, Some(50.0))], Some(&mut rules));
    assert_eq!(rules.radius, None);
  }

  #[test]
  fn variant_chain_caps_count() {
    assert_eq!(variant_chain(0, 10), (1, 0.5));
    assert_eq!(variant_chain(4, 10), (5, 2.5));
    assert_eq!(variant_chain(25, 10), (11, 5.5));
  }

  #[test]
  fn tag_limit_rule() {
    let rules = VariantRules { tag_limit: Some(3), ..Default::default() };
    let target = user(0, None);
    assert!(
      check_variant_rules(&rules, &user(2, None), &target, InfectionMethod::Direct, "12:00")
        .is_ok()
    );
    assert_eq!(
      check_variant_rules(&rules, &user(3, None), &target, InfectionMethod::Direct, "12:00"),
      Err(Rejection::TagLimitReached { limit: 3 })
    );
  }

  #[test]
  fn time_window_rule() {
    let rules = VariantRules {
      time_restriction: Some(TimeWindow {
        start: "20:00".into(),
        end:   "23:59".into(),
      }),
      ..Default::default()
    };
    let (a, b) = (user(0, None), user(0, None));
    assert!(
      check_variant_rules(&rules, &a, &b, InfectionMethod::Direct, "21:30").is_ok()
    );
    assert!(matches!(
      check_variant_rules(&rules, &a, &b, InfectionMethod::Direct, "08:00"),
      Err(Rejection::TimeRestricted { .. })
    ));
  }

  #[test]
  fn radius_rule_respects_bypass_family() {
    let rules = VariantRules { radius: Some(500.0), ..Default::default() };
    // ~1.1 km apart
    let a = user(0, Some(GeoPoint::new(0.0, 0.0)));
    let b = user(0, Some(GeoPoint::new(0.01, 0.0)));

    assert!(matches!(
      check_variant_rules(&rules, &a, &b, InfectionMethod::Direct, "12:00"),
      Err(Rejection::OutOfRange { .. })
    ));
    assert!(
      check_variant_rules(&rules, &a, &b, InfectionMethod::Qr, "12:00").is_ok()
    );
  }

  #[test]
  fn radius_rule_skipped_without_locations() {
    let rules = VariantRules { radius: Some(1.0), ..Default::default() };
    let a = user(0, Some(GeoPoint::new(0.0, 0.0)));
    let b = user(0, None);
    assert!(
      check_variant_rules(&rules, &a, &b, InfectionMethod::Direct, "12:00").is_ok()
    );
  }
}
