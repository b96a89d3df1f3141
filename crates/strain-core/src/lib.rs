//! Core types, collaborator traits and the infection processing engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::InfectionStore`]; the engine in
//! [`engine`] drives a single infection through validation, scoring, lineage
//! writes, tag propagation and the milestone side effects.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod geo;
pub mod method;
pub mod mutation;
pub mod notify;
pub mod outbreak;
pub mod store;
pub mod strain;
pub mod tag;
pub mod user;
pub mod variant;

pub use config::EngineConfig;
pub use engine::{InfectionEngine, InfectionOutcome, InfectionRequest};
pub use error::{Error, Rejection, Result};
pub use method::InfectionMethod;
