//! Error types for `strain-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::method::InfectionMethod;

/// Why an infection attempt was turned away before anything was written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
  #[error("self-infection is not allowed")]
  SelfInfection,

  #[error("cooldown active for method {method}")]
  CooldownActive { method: InfectionMethod },

  #[error("signal too weak: {dbm} dBm")]
  WeakSignal { dbm: i32 },

  #[error("tag drop id is required")]
  MissingDropId,

  #[error("tag drop not found: {0}")]
  DropNotFound(Uuid),

  #[error("tag drop {0} has expired")]
  DropExpired(Uuid),

  #[error("tag drop {0} already claimed by this user")]
  DropAlreadyClaimed(Uuid),

  #[error("variant tag limit reached ({limit})")]
  TagLimitReached { limit: u32 },

  #[error("variant only active between {start} and {end}")]
  TimeRestricted { start: String, end: String },

  #[error("target out of range: {distance_m:.0}m > {radius_m:.0}m")]
  OutOfRange { distance_m: f64, radius_m: f64 },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("infection rejected: {0}")]
  Rejected(#[from] Rejection),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("strain not found: {0}")]
  StrainNotFound(Uuid),

  #[error("variant not found: {0}")]
  VariantNotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn is_rejection(&self) -> bool { matches!(self, Self::Rejected(_)) }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::UserNotFound(_)
        | Self::StrainNotFound(_)
        | Self::VariantNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
