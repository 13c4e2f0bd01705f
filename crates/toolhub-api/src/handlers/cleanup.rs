//! Cleanup administration handlers.

use axum::Json;
use axum::extract::{Query, State};

use toolhub_core::error::AppError;
use toolhub_worker::cleanup::{CleanupPreview, CleanupStats, OrphanReport};

use crate::dto::request::{CleanupMode, CleanupRequest, EMERGENCY_CONFIRMATION, PreviewQuery};
use crate::dto::response::{ApiResponse, CleanupOutcome, CleanupRunResponse};
use crate::error::ApiResult;
use crate::extractors::Caller;
use crate::state::AppState;

/// GET /api/admin/cleanup/stats
pub async fn stats(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<ApiResponse<CleanupStats>>> {
    let stats = state.cleanup.get_cleanup_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/admin/cleanup/orphans
pub async fn orphans(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<ApiResponse<OrphanReport>>> {
    let report = state.cleanup.find_orphans().await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/admin/cleanup/preview
pub async fn preview(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<ApiResponse<CleanupPreview>>> {
    let max_age_hours = query
        .max_age_hours
        .unwrap_or(state.config.cleanup.max_age_hours);
    let preview = state.cleanup.preview(max_age_hours).await?;
    Ok(Json(ApiResponse::ok(preview)))
}

/// POST /api/admin/cleanup
pub async fn run(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CleanupRequest>,
) -> ApiResult<Json<CleanupRunResponse>> {
    let max_age_hours = req
        .max_age_hours
        .unwrap_or(state.config.cleanup.max_age_hours);

    tracing::info!(mode = %req.mode, max_age_hours, user_id = %caller.user_id, "Cleanup requested");

    if req.deletes_everything(max_age_hours) {
        if !req.is_confirmed() {
            return Err(AppError::validation(format!(
                "Cleanup mode '{}' with max_age_hours = {max_age_hours} deletes every temporary file; \
                 set confirm to \"{EMERGENCY_CONFIRMATION}\"",
                req.mode
            ))
            .into());
        }
        tracing::warn!(mode = %req.mode, user_id = %caller.user_id, "Delete-everything cleanup confirmed");
    }

    let result = match req.mode {
        CleanupMode::Time => CleanupOutcome::Pass(state.cleanup.cleanup_old_files(max_age_hours).await),
        CleanupMode::Commands => CleanupOutcome::Pass(state.cleanup.cleanup_by_command_status().await),
        CleanupMode::Full => CleanupOutcome::Full(state.cleanup.full_cleanup(max_age_hours).await),
        CleanupMode::Emergency => CleanupOutcome::Pass(state.cleanup.emergency_cleanup().await),
    };

    Ok(Json(CleanupRunResponse {
        success: result.success(),
        mode: req.mode,
        result,
    }))
}
