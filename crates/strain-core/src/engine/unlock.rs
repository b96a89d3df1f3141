//! Variant unlocks driven by strain progress.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  notify::Notifier,
  store::InfectionStore,
  variant::{rarity_threshold, Variant},
  Error, Result,
};

use super::InfectionEngine;

/// Variants not yet in `unlocked` whose rarity threshold `total` meets.
pub fn newly_unlockable(
  variants: &[Variant],
  unlocked: &HashSet<Uuid>,
  total: f64,
) -> Vec<Uuid> {
  variants
    .iter()
    .filter(|v| !unlocked.contains(&v.variant_id))
    .filter(|v| rarity_threshold(v.rarity).is_some_and(|t| total >= t))
    .map(|v| v.variant_id)
    .collect()
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  /// Unlock every variant `user_id` now qualifies for. Returns the ids that
  /// were newly unlocked.
  pub async fn unlock_variants(
    &self,
    user_id: Uuid,
    strain_total: f64,
  ) -> Result<Vec<Uuid>> {
    let variants = self.store.list_variants().await.map_err(Error::store)?;
    let unlocked: HashSet<Uuid> = self
      .store
      .unlocked_variant_ids(user_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();

    let mut fresh = Vec::new();
    for variant_id in newly_unlockable(&variants, &unlocked, strain_total) {
      let inserted = self
        .store
        .unlock_variant(user_id, variant_id)
        .await
        .map_err(Error::store)?;
      if inserted {
        fresh.push(variant_id);
      }
    }

    if !fresh.is_empty() {
      info!(user = %user_id, count = fresh.len(), "variants unlocked");
    }
    Ok(fresh)
  }
}
