//! Route definitions for the DeviceHub session gateway.
//!
//! REST endpoints are mounted under `/api`; the live channel and the
//! liveness probes sit at the root.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(device_routes())
        .merge(user_routes())
        .route("/health/detailed", get(handlers::health::health_detailed));

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ws/{device_id}", get(handlers::ws::ws_upgrade))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Device login lifecycle
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/force-logout", post(handlers::auth::force_logout))
        .route("/auth/logout", post(handlers::auth::logout))
}

fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/devices/active", get(handlers::devices::active))
        .route("/devices/check/{device_id}", get(handlers::devices::check))
}

fn user_routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(handlers::user::profile))
}
