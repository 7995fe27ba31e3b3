//! Axum router configuration with middleware.
//!
//! Middleware: CORS for the single configured origin (credentials allowed,
//! methods and headers mirrored from the preflight), request tracing.

use axum::Router;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use parley_core::repository::turn::TurnRepository;
use parley_types::error::ChatError;

use crate::http::error::AppError;
use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
///
/// Fails if the configured origin is not a valid header value.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(state.config.server.allowed_origin.trim())?;

    // Wildcards are not allowed together with credentials, so methods and
    // headers are echoed back from the request instead.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let router = Router::new()
        .route("/session", get(handlers::session::issue_session))
        .route("/session/{id}/turns", get(handlers::session::get_turns))
        .route("/chat", post(handlers::chat::chat))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// GET /health - Liveness plus a store round-trip.
async fn health_check(
    State(state): State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    let turns = state
        .store
        .count_turns()
        .await
        .map_err(ChatError::StoreUnavailable)?;

    Ok(axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.store.backend().as_str(),
        "turns": turns,
    })))
}
