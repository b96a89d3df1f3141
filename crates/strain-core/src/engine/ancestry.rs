//! Ancestor score updater.
//!
//! Climbs the `parent_tag_id` chain from a new tag to its root, crediting
//! each parent's strain with a contribution decayed by generation distance
//! and scaled by the child's frozen multipliers:
//!
//! ```text
//! contribution = 0.5^(child.gen - parent.gen)
//!              * child.outbreak * child.region * child.mutation
//!              + child.variant_chain_bonus
//! ```

use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  notify::Notifier,
  store::InfectionStore,
  tag::Tag,
  Error, Result,
};

use super::InfectionEngine;

/// Credit applied to one ancestor's strain.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorCredit {
  pub tag_id:       Uuid,
  pub strain_id:    Uuid,
  pub contribution: f64,
  pub new_total:    f64,
}

/// The contribution a child tag passes to its parent.
pub fn contribution(child: &Tag, parent: &Tag) -> f64 {
  let diff = child.generation.saturating_sub(parent.generation);
  let decay = 0.5_f64.powi(i32::try_from(diff).unwrap_or(i32::MAX));
  let s = &child.snapshot;
  decay * s.outbreak_multiplier * s.region_multiplier * s.mutation_boost
    + s.variant_chain_bonus
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  /// Walk from `tag` to its root, crediting every ancestor. Stops early on a
  /// missing parent or a cycle.
  pub async fn update_ancestor_scores(
    &self,
    tag: &Tag,
  ) -> Result<Vec<AncestorCredit>> {
    let mut credits = Vec::new();
    let mut visited = HashSet::from([tag.tag_id]);
    let mut child = tag.clone();

    while let Some(parent_id) = child.parent_tag_id {
      if !visited.insert(parent_id) {
        warn!(tag = %tag.tag_id, at = %parent_id, "cycle in tag lineage");
        break;
      }

      let Some(parent) =
        self.store.get_tag(parent_id).await.map_err(Error::store)?
      else {
        warn!(tag = %child.tag_id, parent = %parent_id, "dangling parent tag");
        break;
      };

      let contribution = contribution(&child, &parent);
      let new_total = self
        .store
        .add_strain_score(parent.strain_id, contribution)
        .await
        .map_err(Error::store)?
        .ok_or(Error::StrainNotFound(parent.strain_id))?;

      self.push_leaderboard(parent.strain_id, new_total).await;

      credits.push(AncestorCredit {
        tag_id: parent.tag_id,
        strain_id: parent.strain_id,
        contribution,
        new_total,
      });
      child = parent;
    }

    debug!(tag = %tag.tag_id, hops = credits.len(), "ancestor scores updated");
    Ok(credits)
  }

  async fn push_leaderboard(&self, strain_id: Uuid, total: f64) {
    let Some(board) = &self.cooldowns else {
      return;
    };
    let member = strain_id.to_string();
    if let Err(e) = board
      .zadd(&self.config.leaderboard_key, total, &member)
      .await
    {
      warn!(error = %e, strain = %strain_id, "leaderboard push failed");
    }
  }
}
