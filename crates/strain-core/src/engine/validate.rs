//! Validation: rejects malformed or disallowed attempts before any write.
//!
//! Checks run in a fixed order: self-infection, then the cooldown, then the
//! method-specific preconditions. The cooldown is claimed with a single
//! set-if-absent call, so two concurrent requests for the same
//! `(infector, method)` cannot both pass. A method check that fails after the
//! claim releases it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  cooldown::CooldownStore,
  method::InfectionMethod,
  notify::Notifier,
  outbreak::TagDrop,
  store::InfectionStore,
  Error, Rejection, Result,
};

use super::{InfectionEngine, InfectionRequest};

/// A held cooldown key; released if the request is rejected later on.
#[derive(Debug)]
pub struct CooldownClaim {
  key: String,
}

pub fn cooldown_key(infector_id: Uuid, method: InfectionMethod) -> String {
  format!("cooldown:infection:{infector_id}:{method}")
}

pub fn check_participants(request: &InfectionRequest) -> Result<(), Rejection> {
  if request.infector_id == request.infected_id {
    return Err(Rejection::SelfInfection);
  }
  Ok(())
}

/// Proximity infections need a usable radio signal. A missing reading passes.
pub fn check_signal(
  request: &InfectionRequest,
  min_signal_dbm: i32,
) -> Result<(), Rejection> {
  if request.method == InfectionMethod::Proximity
    && let Some(dbm) = request.metadata.signal_strength
    && dbm < min_signal_dbm
  {
    return Err(Rejection::WeakSignal { dbm });
  }
  Ok(())
}

pub fn check_tag_drop(
  drop_id: Uuid,
  drop: Option<&TagDrop>,
  infected_id: Uuid,
  now: DateTime<Utc>,
) -> Result<(), Rejection> {
  let drop = drop.ok_or(Rejection::DropNotFound(drop_id))?;
  if drop.is_expired(now) {
    return Err(Rejection::DropExpired(drop_id));
  }
  if drop.is_claimed_by(infected_id) {
    return Err(Rejection::DropAlreadyClaimed(drop_id));
  }
  Ok(())
}

impl<S, C, N> InfectionEngine<S, C, N>
where
  S: InfectionStore,
  C: CooldownStore,
  N: Notifier,
{
  /// Run every pre-write check and claim the cooldown.
  pub async fn validate(
    &self,
    request: &InfectionRequest,
  ) -> Result<Option<CooldownClaim>> {
    check_participants(request)?;

    let claim = self.claim_cooldown(request).await?;
    if let Err(e) = self.check_method(request).await {
      self.release_cooldown(&claim).await;
      return Err(e);
    }
    Ok(claim)
  }

  async fn check_method(&self, request: &InfectionRequest) -> Result<()> {
    check_signal(request, self.config.min_signal_dbm)?;

    if request.method == InfectionMethod::TagDrop {
      let drop_id = request.metadata.drop_id.ok_or(Rejection::MissingDropId)?;
      let drop = self
        .store
        .get_tag_drop(drop_id)
        .await
        .map_err(Error::store)?;
      check_tag_drop(drop_id, drop.as_ref(), request.infected_id, Utc::now())?;
    }
    Ok(())
  }

  async fn claim_cooldown(
    &self,
    request: &InfectionRequest,
  ) -> Result<Option<CooldownClaim>> {
    let Some(cooldowns) = &self.cooldowns else {
      return Ok(None);
    };

    let key = cooldown_key(request.infector_id, request.method);
    let ttl = Duration::from_secs(self.config.cooldown_seconds);
    let stamp = Utc::now().to_rfc3339();

    match cooldowns.set_nx_ex(&key, ttl, &stamp).await {
      Ok(true) => Ok(Some(CooldownClaim { key })),
      Ok(false) => {
        Err(Rejection::CooldownActive { method: request.method }.into())
      }
      Err(e) => {
        warn!(error = %e, %key, "cooldown store unavailable, not enforcing");
        Ok(None)
      }
    }
  }

  pub(super) async fn release_cooldown(&self, claim: &Option<CooldownClaim>) {
    let (Some(cooldowns), Some(claim)) = (&self.cooldowns, claim) else {
      return;
    };
    debug!(key = %claim.key, "releasing cooldown after rejection");
    if let Err(e) = cooldowns.delete(&claim.key).await {
      warn!(error = %e, key = %claim.key, "failed to release cooldown");
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration as ChronoDuration;

  use super::*;
  use crate::geo::GeoPoint;

  fn request(method: InfectionMethod) -> InfectionRequest {
    InfectionRequest::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      GeoPoint::new(0.0, 0.0),
      method,
    )
  }

  fn drop(expires_in: ChronoDuration, claimed_by: Vec<Uuid>) -> TagDrop {
    TagDrop {
      drop_id: Uuid::new_v4(),
      creator_id: Uuid::new_v4(),
      location: GeoPoint::new(0.0, 0.0),
      expires_at: Utc::now() + expires_in,
      claimed_by,
    }
  }

  #[test]
  fn rejects_self_infection() {
    let mut req = request(InfectionMethod::Direct);
    req.infected_id = req.infector_id;
    assert_eq!(check_participants(&req), Err(Rejection::SelfInfection));
  }

  #[test]
  fn proximity_signal_threshold() {
    let mut req = request(InfectionMethod::Proximity);
    req.metadata.signal_strength = Some(-81);
    assert_eq!(
      check_signal(&req, -80),
      Err(Rejection::WeakSignal { dbm: -81 })
    );

    req.metadata.signal_strength = Some(-80);
    assert!(check_signal(&req, -80).is_ok());

    req.metadata.signal_strength = None;
    assert!(check_signal(&req, -80).is_ok());
  }

  #[test]
  fn signal_ignored_for_other_methods() {
    let mut req = request(InfectionMethod::Qr);
    req.metadata.signal_strength = Some(-120);
    assert!(check_signal(&req, -80).is_ok());
  }

  #[test]
  fn tag_drop_checks() {
    let infected = Uuid::new_v4();
    let id = Uuid::new_v4();
    let now = Utc::now();

    assert_eq!(
      check_tag_drop(id, None, infected, now),
      Err(Rejection::DropNotFound(id))
    );

    let expired = drop(ChronoDuration::minutes(-1), vec![]);
    assert_eq!(
      check_tag_drop(id, Some(&expired), infected, now),
      Err(Rejection::DropExpired(id))
    );

    let claimed = drop(ChronoDuration::hours(1), vec![infected]);
    assert_eq!(
      check_tag_drop(id, Some(&claimed), infected, now),
      Err(Rejection::DropAlreadyClaimed(id))
    );

    let open = drop(ChronoDuration::hours(1), vec![Uuid::new_v4()]);
    assert!(check_tag_drop(id, Some(&open), infected, now).is_ok());
  }

  #[test]
  fn cooldown_key_format() {
    let id = Uuid::nil();
    assert_eq!(
      cooldown_key(id, InfectionMethod::ChainReaction),
      "cooldown:infection:00000000-0000-0000-0000-000000000000:chain_reaction"
    );
  }
}
