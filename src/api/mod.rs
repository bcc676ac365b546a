//! API module - HTTP handlers and routes

pub mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::integration::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Sensors
        .route("/api/sensors", get(handlers::list_sensors))
        .route("/api/sensors/:unique_id", get(handlers::get_sensor))
        // Config entries
        .route("/api/entries", get(handlers::list_entries))
        .route("/api/entries", post(handlers::create_entry))
        .route("/api/entries/:id", delete(handlers::delete_entry))
        .route("/api/entries/:id/options", put(handlers::update_options))
        .route("/api/entries/:id/refresh", post(handlers::refresh_entry))
        .route("/api/entries/:id/reload", post(handlers::reload_entry))
        // Advisories
        .route("/api/issues", get(handlers::list_issues))
        .route("/api/issues/:domain/:issue_id", get(handlers::get_issue))
}
