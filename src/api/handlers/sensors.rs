//! Sensor handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::integration::AppState;

/// GET /api/sensors - All sensor states across loaded entries
pub async fn list_sensors(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sensor_states().await)
}

/// GET /api/sensors/:unique_id - One sensor state
pub async fn get_sensor(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sensor_state(&unique_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Sensor {} not found", unique_id)))
}
