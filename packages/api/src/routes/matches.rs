use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use arbiter::models::requests::{MoveSubmission, ResignRequest};
use arbiter::models::responses::{
    ClaimOutcome, EventPage, ResignOutcome, ResumeSnapshot, SubmitOutcome,
};
use arbiter::models::Side;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/match/join", post(join_match))
        .route("/v1/match/{id}/append", post(append_move))
        .route("/v1/match/{id}/resign", post(resign))
        .route("/v1/match/{id}/claim-timeout", post(claim_timeout))
        .route("/v1/match/{id}/resume", post(resume))
        .route("/v1/match/{id}/events", get(events))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub join_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub match_id: String,
    pub side: Side,
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub after: u64,
}

/// Moves are authenticated by the match key signature, not by a bearer token.
async fn append_move(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(submission): Json<MoveSubmission>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    let outcome = state.referee_service.submit(&match_id, &submission).await?;
    Ok(Json(outcome))
}

async fn resign(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(request): Json<ResignRequest>,
) -> Result<Json<ResignOutcome>, ApiError> {
    let outcome = state.referee_service.resign(&match_id, &request).await?;
    Ok(Json(outcome))
}

async fn claim_timeout(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<ClaimOutcome>, ApiError> {
    let outcome = state
        .referee_service
        .claim_timeout(&match_id, &authenticated_user.user_id)
        .await?;
    Ok(Json(outcome))
}

async fn resume(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    authenticated_user: AuthenticatedUser,
) -> Result<Json<ResumeSnapshot>, ApiError> {
    let snapshot = state
        .resume_service
        .resume(&match_id, &authenticated_user.user_id)
        .await?;
    debug!(match_id = %match_id, user_id = %authenticated_user.user_id, "Match resumed");
    Ok(Json(snapshot))
}

async fn events(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<EventsQuery>,
    _authenticated_user: AuthenticatedUser,
) -> Result<Json<EventPage>, ApiError> {
    let page = state
        .resume_service
        .events_since(&match_id, query.after)
        .await?;
    Ok(Json(page))
}

async fn join_match(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let claims = state.token_service.verify_join_token(&request.join_token)?;
    if claims.sub != authenticated_user.user_id {
        warn!(
            match_id = %claims.match_id,
            user_id = %authenticated_user.user_id,
            "Join token presented by another user"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(Json(JoinResponse {
        match_id: claims.match_id,
        side: claims.side,
        player_id: claims.sub,
    }))
}
