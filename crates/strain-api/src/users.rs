//! Handler for `POST /users`.
//!
//! Body: `{"username":"alice","last_location":{"lat":51.5,"lng":-0.12}}`.
//! Responds `201 Created` with the stored user.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use strain_core::{
  InfectionEngine, cooldown::CooldownStore, notify::Notifier,
  store::InfectionStore, user::NewUser,
};

use crate::error::ApiError;

/// `POST /users`
pub async fn create<S, C, N>(
  State(engine): State<Arc<InfectionEngine<S, C, N>>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InfectionStore + 'static,
  C: CooldownStore + 'static,
  N: Notifier + 'static,
{
  let user = engine
    .store()
    .create_user(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}
