//! JSON HTTP surface for the strain infection engine.
//!
//! Exposes an axum [`Router`] backed by an [`InfectionEngine`]. Auth, TLS and
//! real-time delivery are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", strain_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod infections;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::post};
use serde::Deserialize;
use strain_core::{
  EngineConfig, InfectionEngine, cooldown::CooldownStore, notify::Notifier,
  store::InfectionStore,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
pub fn api_router<S, C, N>(engine: Arc<InfectionEngine<S, C, N>>) -> Router<()>
where
  S: InfectionStore + 'static,
  C: CooldownStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    .route("/infections", post(infections::create::<S, C, N>))
    .route("/users",      post(users::create::<S, C, N>))
    .with_state(engine)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use strain_core::{cooldown::MemoryCooldownStore, notify::LogNotifier};
  use strain_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  type Engine = InfectionEngine<SqliteStore, MemoryCooldownStore, LogNotifier>;

  async fn make_engine() -> Arc<Engine> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    Arc::new(InfectionEngine::new(
      Arc::new(store),
      Some(Arc::new(MemoryCooldownStore::new())),
      Arc::new(LogNotifier),
      EngineConfig::default(),
    ))
  }

  async fn send(
    engine: &Arc<Engine>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(engine.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn register(engine: &Arc<Engine>, name: &str) -> String {
    let resp = send(
      engine,
      "POST",
      "/users",
      Some(json!({ "username": name, "last_location": { "lat": 51.5, "lng": -0.12 } })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["user_id"].as_str().unwrap().to_owned()
  }

  fn infection(infector: &str, infected: &str, method: &str) -> Value {
    json!({
      "infector_id": infector,
      "infected_id": infected,
      "location": { "lat": 51.5, "lng": -0.12 },
      "method": method,
    })
  }

  // ── Users ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_user() {
    let engine = make_engine().await;
    let id = register(&engine, "alice").await;

    let id: Uuid = id.parse().unwrap();
    let user = engine.store().get_user(id).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.generation, 0);
  }

  // ── Infections ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn infection_is_recorded() {
    let engine = make_engine().await;
    let a = register(&engine, "alice").await;
    let b = register(&engine, "bob").await;

    let resp = send(&engine, "POST", "/infections", Some(infection(&a, &b, "direct"))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let outcome = json_body(resp).await;
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["tag_ids"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["propagation"]["transmitted"], 1);

    let store = engine.store();
    let b: Uuid = b.parse().unwrap();
    assert_eq!(store.list_user_tags(b).await.unwrap().len(), 2);

    let strain_id = store.get_user(b).await.unwrap().unwrap().current_strain_id.unwrap();
    let strain = store.get_strain(strain_id).await.unwrap().unwrap();
    assert_eq!(strain.direct_infections, 1);
  }

  #[tokio::test]
  async fn infection_without_method_is_422() {
    let engine = make_engine().await;
    let a = register(&engine, "alice").await;
    let b = register(&engine, "bob").await;

    let mut body = infection(&a, &b, "direct");
    body.as_object_mut().unwrap().remove("method");
    let resp = send(&engine, "POST", "/infections", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let b: Uuid = b.parse().unwrap();
    assert!(engine.store().list_user_tags(b).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn self_infection_is_422() {
    let engine = make_engine().await;
    let a = register(&engine, "alice").await;

    let resp = send(&engine, "POST", "/infections", Some(infection(&a, &a, "qr"))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(resp).await["error"].is_string());
  }

  #[tokio::test]
  async fn cooldown_is_429() {
    let engine = make_engine().await;
    let a = register(&engine, "alice").await;
    let b = register(&engine, "bob").await;
    let c = register(&engine, "carol").await;

    let first = send(&engine, "POST", "/infections", Some(infection(&a, &b, "share_card"))).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = send(&engine, "POST", "/infections", Some(infection(&a, &c, "share_card"))).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
  }

  #[tokio::test]
  async fn infection_with_unknown_target_is_404() {
    let engine = make_engine().await;
    let a = register(&engine, "alice").await;
    let ghost = Uuid::new_v4().to_string();

    let resp = send(&engine, "POST", "/infections", Some(infection(&a, &ghost, "direct"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(json_body(resp).await["error"].is_string());
  }
}
