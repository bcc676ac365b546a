//! Advisory handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::integration::AppState;

/// GET /api/issues - Raised advisories
pub async fn list_issues(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.issues.list().await)
}

/// GET /api/issues/:domain/:issue_id
pub async fn get_issue(
    State(state): State<AppState>,
    Path((domain, issue_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .issues
        .get(&domain, &issue_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Issue {}.{} not found", domain, issue_id)))
}
