//! Agora forum kernel library.
//!
//! The request gate and the services around it. The main entry point for
//! running the server is the `agora` binary.

pub mod cache;
pub mod config;
pub mod config_storage;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod notice;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod users;
pub mod version;

pub use config::Config;
pub use gate::{Gate, GateError, GateOutcome, GateRequest, Verdict};
pub use state::AppState;

use axum::Router;

/// Build the forum router with the gate in front of every page.
///
/// The caller adds the session layer, which must wrap the gate.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::forum::router())
        .merge(routes::admin::router())
        .merge(routes::health::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::forum_gate,
        ))
        .with_state(state)
}
