use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Contacts
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::add_contact),
        )
        .route("/contacts/:id", delete(handlers::remove_contact))
        // Emergency control
        .route("/emergency/activate", post(handlers::activate))
        .route("/emergency/deactivate", post(handlers::deactivate))
        .route("/emergency/status", get(handlers::status))
        .route("/emergency/answer", post(handlers::answer))
        // Capabilities
        .route("/permissions", get(handlers::permissions))
        .route("/permissions/refresh", post(handlers::refresh_permissions))
        .route("/location/refresh", post(handlers::refresh_location))
        .route("/location/map", get(handlers::location_map))
        // Directory and data
        .route("/services", get(handlers::services))
        .route("/reset", post(handlers::reset))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
