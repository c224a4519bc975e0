//! WebSocket layer: the upgrade endpoint and per-connection lifecycle.
//!
//! `GET /api/openContractEvent` (also mounted at `/ws`) upgrades to a
//! push channel. Each accepted socket is registered with the
//! [`crate::domain::ConnectionRegistry`] and receives every broadcast
//! until it closes.

pub mod connection;
pub mod handler;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Push-channel routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/openContractEvent", get(handler::ws_handler))
        .route("/ws", get(handler::ws_handler))
}
