//! Command status handlers.

use axum::Json;
use axum::extract::{Path, State};

use crate::dto::response::{ApiResponse, CommandView};
use crate::error::ApiResult;
use crate::extractors::Caller;
use crate::state::AppState;

/// GET /api/commands/{id}
pub async fn get_command(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<CommandView>> {
    let job = state.dispatcher.get_status(&id).await?;
    Ok(Json(CommandView::from(job)))
}

/// GET /api/commands
pub async fn list_commands(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<ApiResponse<Vec<CommandView>>>> {
    let jobs = state.dispatcher.list_jobs().await?;
    Ok(Json(ApiResponse::ok(
        jobs.into_iter().map(CommandView::from).collect(),
    )))
}
