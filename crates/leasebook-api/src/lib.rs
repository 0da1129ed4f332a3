//! JSON REST API for Leasebook.
//!
//! Exposes an axum [`Router`] backed by any
//! [`leasebook_core::store::ContractDirectory`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", leasebook_api::api_router(state.clone()))
//! ```

pub mod contracts;
pub mod error;
pub mod history;
pub mod retry;
pub mod sweep;

use std::sync::Arc;

use axum::{
  Router, middleware,
  routing::{get, post},
};
use leasebook_core::{StatusService, clock::Clock, store::ContractDirectory};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub service:          StatusService<S, Arc<dyn Clock>>,
  /// Run an expiry sweep before every request.
  pub sweep_on_request: bool,
}

impl<S: ContractDirectory> ApiState<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, sweep_on_request: bool) -> Self {
    Self { service: StatusService::with_clock(store, clock), sweep_on_request }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: Arc<ApiState<S>>) -> Router<()>
where
  S: ContractDirectory + 'static,
{
  let router = Router::new()
    // Contracts
    .route("/contracts", get(contracts::list::<S>).post(contracts::create::<S>))
    .route("/contracts/{id}", get(contracts::get_one::<S>))
    // Status
    .route("/contracts/{id}/status", get(history::current::<S>).post(history::set::<S>))
    .route("/contracts/{id}/terminate", post(history::terminate::<S>))
    .route("/contracts/{id}/history", get(history::list::<S>))
    // Sweep
    .route("/sweep", post(sweep::run::<S>));

  let router = if state.sweep_on_request {
    router.route_layer(middleware::from_fn_with_state(state.clone(), sweep::refresh_before::<S>))
  } else {
    router
  };

  router.with_state(state)
}
