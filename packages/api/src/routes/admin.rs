use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use crate::{error::ApiError, middleware::auth::AdminUser, state::AppState};
use arbiter::models::responses::AbortOutcome;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/abort/{id}", post(abort_match))
}

async fn abort_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    admin: AdminUser,
) -> Result<Json<AbortOutcome>, ApiError> {
    info!(match_id = %match_id, admin_id = %admin.user_id, "Admin abort requested");
    let outcome = state.admin_service.abort(&match_id).await?;
    Ok(Json(outcome))
}
