//! Carried-tag propagation.
//!
//! Every tag the infector carries spreads to the infected player one hop
//! deeper. Each new carrier earns the tag's origin one point of direct score
//! and `0.5^depth` of indirect score.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  notify::Notifier,
  store::InfectionStore,
  tag::{NewUserTag, UserTag},
  Error, Result,
};

use super::InfectionEngine;

/// Score credited to one origin by a single propagation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginScore {
  pub origin_user_id:     Uuid,
  pub direct_increment:   u32,
  pub indirect_increment: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PropagationOutcome {
  /// Memberships actually inserted.
  pub transmitted:     u32,
  /// Size of the infected player's carried set afterwards.
  pub final_tag_count: u32,
  pub new_tags:        Vec<UserTag>,
  pub score_summary:   Vec<OriginScore>,
}

/// Memberships the infected player is missing, one hop deeper than the
/// infector's copy.
pub fn missing_tags(
  infected_id: Uuid,
  infector_tags: &[UserTag],
  infected_tags: &[UserTag],
) -> Vec<NewUserTag> {
  let mut seen: HashSet<Uuid> =
    infected_tags.iter().map(|ut| ut.tag_id).collect();

  infector_tags
    .iter()
    .filter(|ut| seen.insert(ut.tag_id))
    .map(|ut| NewUserTag {
      user_id:          infected_id,
      tag_id:           ut.tag_id,
      origin_user_id:   ut.origin_user_id,
      generation_depth: ut.generation_depth + 1,
    })
    .collect()
}

/// Group inserted memberships by origin. Ordered by origin id.
pub fn score_summary(inserted: &[UserTag]) -> Vec<OriginScore> {
  let mut by_origin: BTreeMap<Uuid, (u32, f64)> = BTreeMap::new();
  for ut in inserted {
    let entry = by_origin.entry(ut.origin_user_id).or_default();
    entry.0 += 1;
    entry.1 += decay(ut.generation_depth);
  }
  by_origin
    .into_iter()
    .map(|(origin_user_id, (direct, indirect))| OriginScore {
      origin_user_id,
      direct_increment: direct,
      indirect_increment: indirect,
    })
    .collect()
}

fn decay(depth: u32) -> f64 {
  0.5_f64.powi(i32::try_from(depth).unwrap_or(i32::MAX))
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  pub async fn propagate_tags(
    &self,
    infector_id: Uuid,
    infected_id: Uuid,
  ) -> Result<PropagationOutcome> {
    let infector_tags = self
      .store
      .list_user_tags(infector_id)
      .await
      .map_err(Error::store)?;
    let infected_tags = self
      .store
      .list_user_tags(infected_id)
      .await
      .map_err(Error::store)?;

    let missing = missing_tags(infected_id, &infector_tags, &infected_tags);
    let inserted = if missing.is_empty() {
      Vec::new()
    } else {
      self
        .store
        .insert_user_tags(missing)
        .await
        .map_err(Error::store)?
    };

    let summary = score_summary(&inserted);
    for origin in &summary {
      self
        .store
        .add_user_scores(
          origin.origin_user_id,
          f64::from(origin.direct_increment),
          origin.indirect_increment,
        )
        .await
        .map_err(Error::store)?;
    }

    let transmitted = u32::try_from(inserted.len()).unwrap_or(u32::MAX);
    let held = u32::try_from(infected_tags.len()).unwrap_or(u32::MAX);

    Ok(PropagationOutcome {
      transmitted,
      final_tag_count: held.saturating_add(transmitted),
      new_tags: inserted,
      score_summary: summary,
    })
  }
}
