//! HTTP surface: playback intents, routing-config CRUD, health, and the
//! Server-Sent Events push channel.

mod config;
mod control;
mod error;
mod events;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use casparlink_core::{HealthReport, Manager};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Manager,
    /// Cancelled when the server starts draining; ends open event streams.
    pub shutdown: CancellationToken,
}

pub fn router(manager: Manager, shutdown: CancellationToken) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Playback
        .route("/api/play", post(control::play))
        .route("/api/stop", post(control::stop))
        .route("/api/clear", post(control::clear))
        .route("/api/loadbg", post(control::load_background))
        .route("/api/route", post(control::route))
        // Routing config
        .route("/api/config", get(config::snapshot))
        .route("/api/config/inputs", get(config::list_inputs))
        .route("/api/config/outputs", get(config::list_outputs))
        .route("/api/config/input", post(config::create_input))
        .route(
            "/api/config/input/{id}",
            put(config::update_input).delete(config::delete_input),
        )
        .route("/api/config/output", post(config::create_output))
        .route(
            "/api/config/output/{id}",
            put(config::update_output).delete(config::delete_output),
        )
        // Status
        .route("/api/health", get(health))
        .route("/api/events", get(events::stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { manager, shutdown })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.manager.health())
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use tower::ServiceExt;

    use super::test_support::{app, call, offline_manager};

    #[tokio::test]
    async fn health_reports_a_disconnected_device() {
        let manager = offline_manager();
        let (status, json) = call(&app(&manager), Method::GET, "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["device_connected"], false);
        assert_eq!(json["device"], "127.0.0.1:1");
        assert_eq!(json["session"]["state"], "disconnected");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let manager = offline_manager();
        let response = app(&manager)
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://control-room.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let manager = offline_manager();
        let (status, _) = call(&app(&manager), Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
