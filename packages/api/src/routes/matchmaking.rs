use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::{debug, error};

use crate::{error::ApiError, middleware::auth::AuthenticatedUser, state::AppState};
use arbiter::models::queue::requests::QuickplayRequest;
use arbiter::models::queue::{QueueKey, TimeControl};
use arbiter::models::responses::{LeaveOutcome, QuickplayOutcome, Sides};
use arbiter::models::MatchKey;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/match/quick", post(quickplay))
        .route("/v1/match/leave", post(leave_queue))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuickplayResponse {
    Waiting {
        status: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Matched {
        match_id: String,
        sides: Sides,
        match_key: MatchKey,
        join_token: String,
    },
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub status: LeaveOutcome,
}

async fn quickplay(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<QuickplayRequest>,
) -> Result<Json<QuickplayResponse>, ApiError> {
    let player_id = authenticated_user.user_id;

    let outcome = state
        .matchmaking_service
        .quickplay(&player_id, &payload.tc, payload.rated)
        .await
        .map_err(|e| {
            error!(player_id = %player_id, error = %e, "Quickplay failed");
            ApiError::from(e)
        })?;

    let response = match outcome {
        QuickplayOutcome::Waiting => QuickplayResponse::Waiting { status: "waiting" },
        QuickplayOutcome::Matched(created) => {
            let join_token = created
                .join_token_for(&player_id)
                .map(str::to_string)
                .ok_or(ApiError::Forbidden)?;
            QuickplayResponse::Matched {
                match_id: created.match_id,
                sides: created.sides,
                match_key: created.match_key,
                join_token,
            }
        }
    };

    debug!(player_id = %player_id, tc = %payload.tc, "Quickplay handled");
    Ok(Json(response))
}

async fn leave_queue(
    State(state): State<AppState>,
    authenticated_user: AuthenticatedUser,
    Json(payload): Json<QuickplayRequest>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let time_control = payload
        .tc
        .parse::<TimeControl>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let key = QueueKey::new(time_control, payload.rated);

    let status = state
        .matchmaking_service
        .leave(key, &authenticated_user.user_id)
        .await?;

    Ok(Json(LeaveResponse { status }))
}
