//! Best-effort notification of completed infections.

use std::{convert::Infallible, future::Future};

use serde::Serialize;
use uuid::Uuid;

use crate::method::InfectionMethod;

/// Summary handed to the notifier once an infection is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct InfectionNotice {
  pub infection_event_id: Uuid,
  pub infector_id:        Uuid,
  pub infected_id:        Uuid,
  pub method:             InfectionMethod,
  pub score:              f64,
  pub outbreak_triggered: bool,
  pub unlocked_variants:  Vec<Uuid>,
}

/// Delivers notices to players. Failures are logged by the engine and never
/// reach the caller.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify_infection<'a>(
    &'a self,
    notice: &'a InfectionNotice,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Writes each notice to the `strain::notify` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn notify_infection(
    &self,
    notice: &InfectionNotice,
  ) -> Result<(), Infallible> {
    tracing::info!(
      target: "strain::notify",
      event = %notice.infection_event_id,
      infector = %notice.infector_id,
      infected = %notice.infected_id,
      method = %notice.method,
      score = notice.score,
      "you've been infected"
    );
    Ok(())
  }
}
