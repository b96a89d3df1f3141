//! Handler for `POST /infections`.
//!
//! The body is an [`InfectionRequest`]:
//!
//! ```json
//! {
//!   "infector_id": "…",
//!   "infected_id": "…",
//!   "location": { "lat": 51.5, "lng": -0.12 },
//!   "method": "proximity",
//!   "metadata": { "signal_strength": -70 }
//! }
//! ```
//!
//! Rejections answer 422 (429 for an active cooldown); a recorded infection
//! answers 201 with the [`strain_core::InfectionOutcome`].

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use strain_core::{
  InfectionEngine, InfectionRequest, cooldown::CooldownStore, notify::Notifier,
  store::InfectionStore,
};

use crate::error::ApiError;

/// `POST /infections`
pub async fn create<S, C, N>(
  State(engine): State<Arc<InfectionEngine<S, C, N>>>,
  Json(request): Json<InfectionRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InfectionStore + 'static,
  C: CooldownStore + 'static,
  N: Notifier + 'static,
{
  let outcome = engine.process_infection(request).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}
