//! Config entry handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::flow::{AbortReason, FlowResult};
use crate::integration::AppState;
use crate::models::{AccountCredentials, AccountOptions, CreateEntryRequest, UpdateOptionsRequest};

use super::SuccessResponse;

/// GET /api/entries - List config entries
pub async fn list_entries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut views = Vec::new();
    for entry in state.entries.list().await {
        views.push(state.entry_view(&entry).await);
    }
    Ok(Json(views))
}

/// POST /api/entries - Add an account (user flow)
pub async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let credentials = AccountCredentials {
        username: payload.username.trim().to_string(),
        password: payload.password,
    };
    let options = AccountOptions {
        show_archived: payload.show_archived,
        show_delivered: payload.show_delivered,
    };

    match state.create_entry(credentials, options).await? {
        FlowResult::CreateEntry(entry) => {
            Ok((StatusCode::CREATED, Json(state.entry_view(&entry).await)))
        }
        FlowResult::Abort(reason) => Err(match reason {
            AbortReason::AlreadyConfigured => AppError::Conflict(reason.to_string()),
            AbortReason::InvalidAuth => AppError::BadRequest(reason.to_string()),
            AbortReason::CannotConnect => AppError::Upstream(reason.to_string()),
        }),
    }
}

/// DELETE /api/entries/:id - Unload and remove an entry
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    match state.remove_entry(&id).await? {
        Some(entry) => {
            tracing::info!("Removed entry {} ({})", entry.entry_id, entry.title);
            Ok(Json(SuccessResponse::with_id("Entry removed", entry.entry_id)))
        }
        None => Err(AppError::NotFound(format!("Entry {} not found", id))),
    }
}

/// PUT /api/entries/:id/options - Change display preferences
pub async fn update_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOptionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = state
        .entries
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", id)))?;

    let options = payload.apply(current.options);
    let updated = state
        .update_options(&id, options)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", id)))?;

    Ok(Json(state.entry_view(&updated).await))
}

/// POST /api/entries/:id/refresh - Poll now
pub async fn refresh_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let coordinator = state
        .coordinator(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Entry {} not loaded", id)))?;

    coordinator
        .refresh()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(SuccessResponse::with_id("Summary refreshed", id)))
}

/// POST /api/entries/:id/reload - Set an entry up again
pub async fn reload_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.reload_entry(&id).await?;
    Ok(Json(SuccessResponse::new("Entry reloaded")))
}
