//! HTTP surface: routes, CORS policy, and router composition.
//!
//! The push-channel endpoint lives in [`crate::ws`]; this module wires it
//! together with the system routes and the cross-cutting layers.

pub mod cors;
pub mod handlers;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the relay's HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "pathz-relay", description = "Contract event relay over WebSocket"),
    paths(handlers::system::health_handler, crate::ws::handler::ws_handler),
    tags(
        (name = "System", description = "Service status"),
        (name = "Events", description = "Live contract event stream"),
    )
)]
pub struct ApiDoc;

/// Builds the router with every endpoint, without layers or state.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::system::routes())
        .merge(crate::ws::routes());
    with_docs(router)
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}

/// Builds the complete application: routes, tracing, CORS and state.
pub fn build_app(state: AppState) -> Router {
    let cors_layer = state.config.allowed_origins.layer();
    build_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(middleware::from_fn(cors::preflight_no_content))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::RelayConfig;

    fn app() -> Router {
        let config = RelayConfig {
            api_key: Some("test-key".to_string()),
            ..RelayConfig::default()
        };
        build_app(AppState::new(config))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("failed to read body");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body is not JSON");
        };
        value
    }

    fn request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    #[tokio::test]
    async fn health_reports_zero_connections() {
        let Ok(req) = request("GET", "/health").body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(req).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["connections"], 0);
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_is_no_content() {
        let Ok(req) = request("OPTIONS", "/api/openContractEvent")
            .header(header::ORIGIN, "https://dapp.pathz.xyz")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
        else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(req).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("https://dapp.pathz.xyz")
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );
    }

    #[tokio::test]
    async fn preflight_from_unknown_origin_gets_no_grant() {
        let Ok(req) = request("OPTIONS", "/api/openContractEvent")
            .header(header::ORIGIN, "https://evil.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
        else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(req).await else {
            panic!("router failed");
        };
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[test]
    fn openapi_lists_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/openContractEvent"));
    }
}
