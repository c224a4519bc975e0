//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::UPGRADE;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};
use crate::watcher::Network;

/// Body returned to plain HTTP requests on the upgrade endpoint.
pub const GREETING: &str =
    "Hello from openContractEvent. Connect via WebSocket for real-time updates.";

/// Query parameters of the upgrade endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamQuery {
    /// `mainnet` or `sepolia`. Defaults to `sepolia`.
    pub network: Option<String>,
}

/// Static status payload for non-upgrade requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusMessage {
    /// Human-readable hint.
    pub message: String,
}

/// `GET /api/openContractEvent` — Upgrade to the live event stream.
///
/// Requests without an `Upgrade: websocket` header get a JSON hint
/// instead of a protocol switch.
///
/// # Errors
///
/// Returns [`RelayError::Config`] when no node provider key is configured,
/// [`RelayError::InvalidNetwork`] for an unknown `network`, and
/// [`RelayError::InvalidRequest`] for a malformed WebSocket handshake.
/// The key is checked first.
#[utoipa::path(
    get,
    path = "/api/openContractEvent",
    tag = "Events",
    summary = "Live contract event stream",
    description = "Upgrades to a WebSocket that receives every relayed `PathzChoosed` event as JSON. Without an upgrade header, returns a status message.",
    params(StreamQuery),
    responses(
        (status = 101, description = "Switched to WebSocket"),
        (status = 200, description = "Not an upgrade request", body = StatusMessage),
        (status = 400, description = "Invalid network or handshake", body = ErrorResponse),
        (status = 500, description = "Node provider key missing", body = ErrorResponse),
    )
)]
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> Result<Response, RelayError> {
    if state.config.api_key.is_none() {
        return Err(RelayError::Config("ALCHEMY_API_KEY missing".to_string()));
    }

    let network = match query.network.as_deref() {
        Some(name) => name.parse::<Network>()?,
        None => Network::default(),
    };

    if !wants_websocket(&headers) {
        let body = StatusMessage {
            message: GREETING.to_string(),
        };
        return Ok(Json(body).into_response());
    }

    let upgrade = upgrade.map_err(|rejection| RelayError::InvalidRequest(rejection.body_text()))?;
    let registry = Arc::clone(&state.registry);
    let capacity = state.config.connection_queue_capacity;
    let send_timeout = state.config.send_timeout;
    tracing::debug!(%network, "accepting push-channel upgrade");

    Ok(upgrade
        .on_upgrade(move |socket| run_connection(socket, registry, capacity, send_timeout))
        .into_response())
}

/// Returns `true` if the request declares `Upgrade: websocket`.
fn wants_websocket(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::RelayConfig;

    fn app(api_key: Option<&str>) -> Router {
        let config = RelayConfig {
            api_key: api_key.map(str::to_string),
            ..RelayConfig::default()
        };
        crate::api::build_app(AppState::new(config))
    }

    async fn get(app: Router, uri: &str, upgrade: bool) -> Response {
        let mut builder = Request::builder().uri(uri);
        if upgrade {
            builder = builder.header(UPGRADE, "websocket");
        }
        let Ok(req) = builder.body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app.oneshot(req).await else {
            panic!("router failed");
        };
        response
    }

    #[test]
    fn detects_upgrade_header_case_insensitively() {
        let mut headers = HeaderMap::new();
        assert!(!wants_websocket(&headers));
        headers.insert(UPGRADE, axum::http::HeaderValue::from_static("WebSocket"));
        assert!(wants_websocket(&headers));
    }

    #[tokio::test]
    async fn plain_get_returns_greeting() {
        let response = get(app(Some("key")), "/api/openContractEvent", false).await;
        assert_eq!(response.status(), StatusCode::OK);

        let Ok(bytes) = to_bytes(response.into_body(), 4096).await else {
            panic!("failed to read body");
        };
        let Ok(body) = serde_json::from_slice::<StatusMessage>(&bytes) else {
            panic!("unexpected body");
        };
        assert_eq!(body.message, GREETING);
    }

    #[tokio::test]
    async fn explicit_mainnet_is_accepted() {
        let response = get(app(Some("key")), "/ws?network=mainnet", false).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_network_is_rejected() {
        let response = get(app(Some("key")), "/api/openContractEvent?network=goerli", false).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_api_key_is_server_error() {
        let response = get(app(None), "/api/openContractEvent", false).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_api_key_wins_over_unknown_network() {
        let response = get(app(None), "/api/openContractEvent?network=goerli", false).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_handshake_is_bad_request() {
        let response = get(app(Some("key")), "/api/openContractEvent", true).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
