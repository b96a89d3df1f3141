//! Lineage writer: root-tag bootstrap and the infection commit.

use tracing::debug;
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  method::InfectionMethod,
  notify::Notifier,
  store::{CommittedInfection, InfectionCommit, InfectionStore},
  strain::Strain,
  tag::{NewTag, NewUserTag, Tag},
  user::User,
  Error, Result,
};

use super::{multiplier::Prepared, InfectionEngine, InfectionRequest};

/// Output of [`InfectionEngine::write_lineage`].
#[derive(Debug, Clone)]
pub struct LineageWrite {
  /// The strain as it stood before this infection.
  pub strain_before: Strain,
  pub committed:     CommittedInfection,
  /// Generation assigned to the infected player and the new tags.
  pub generation:    u32,
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  /// Make sure `user` has a root tag and carries it at depth 0. Safe to call
  /// repeatedly; later calls change nothing.
  ///
  /// A new root tag is stamped with the user's own strain, or
  /// `fallback_strain_id` if they have none.
  pub async fn ensure_root_tag(
    &self,
    user: &User,
    fallback_strain_id: Uuid,
  ) -> Result<Tag> {
    let existing = self
      .store
      .find_root_tag(user.user_id)
      .await
      .map_err(Error::store)?;

    let tag = match existing {
      Some(tag) => tag,
      None => {
        let strain_id = user.current_strain_id.unwrap_or(fallback_strain_id);
        let tag = self
          .store
          .insert_tag(NewTag::root(user.user_id, strain_id))
          .await
          .map_err(Error::store)?;
        debug!(user = %user.user_id, tag = %tag.tag_id, "root tag created");
        tag
      }
    };

    self
      .store
      .insert_user_tags(vec![NewUserTag {
        user_id:          user.user_id,
        tag_id:           tag.tag_id,
        origin_user_id:   user.user_id,
        generation_depth: 0,
      }])
      .await
      .map_err(Error::store)?;

    Ok(tag)
  }

  pub(super) async fn write_lineage(
    &self,
    request: &InfectionRequest,
    prepared: &Prepared,
  ) -> Result<LineageWrite> {
    let infector = &prepared.infector;
    let infected = &prepared.infected;

    let strain_before = match &prepared.strain {
      Some(strain) => strain.clone(),
      None => {
        let strain = self
          .store
          .create_strain(infector.user_id)
          .await
          .map_err(Error::store)?;
        debug!(strain = %strain.strain_id, origin = %infector.user_id, "strain created");
        strain
      }
    };
    let strain_id = strain_before.strain_id;

    self.ensure_root_tag(infector, strain_id).await?;
    self.ensure_root_tag(infected, strain_id).await?;

    let parent = self
      .store
      .latest_inbound_tag(infector.user_id)
      .await
      .map_err(Error::store)?;

    let generation = infector.generation + 1;
    let root_user_id = infector.root_user_id.unwrap_or(infector.user_id);

    let commit = InfectionCommit {
      tag: NewTag {
        tagger_id: infector.user_id,
        target_id: infected.user_id,
        strain_id,
        variant_id: prepared.variant.as_ref().map(|v| v.variant_id),
        parent_tag_id: parent.map(|t| t.tag_id),
        root_user_id,
        origin_user_id: infector.user_id,
        generation,
        snapshot: prepared.pricing.multipliers.snapshot(),
        infection_method: Some(request.method),
        location: Some(request.location),
      },
      tag_count: prepared.base_tag_count,
      infector_id: infector.user_id,
      infected_id: infected.user_id,
      method: request.method,
      location: request.location,
      infected_root_user_id: infected.root_user_id.unwrap_or(root_user_id),
      enhanced_score: prepared.enhanced_score(),
      claim_drop: match request.method {
        InfectionMethod::TagDrop => request.metadata.drop_id,
        _ => None,
      },
    };

    let committed = self
      .store
      .commit_infection(commit)
      .await
      .map_err(Error::store)?;

    Ok(LineageWrite { strain_before, committed, generation })
  }
}
