// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{sessions, test_config},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges the test catalog and session sub-routers.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (answer keys and session registry).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", post(sessions::create_session))
        .route("/submit", post(sessions::submit_session))
        .route("/{id}", get(sessions::get_session))
        .route("/{id}/result", get(sessions::get_result));

    Router::new()
        .route("/api/health", get(test_config::health))
        .route("/api/tests", get(test_config::list_tests))
        .route("/api/test-config", get(test_config::get_test_config))
        .nest("/api/sessions", session_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
