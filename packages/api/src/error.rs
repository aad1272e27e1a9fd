use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use arbiter::services::errors::{
    match_service_errors::MatchServiceError, matchmaking_service_errors::MatchmakingServiceError,
    token_service_errors::TokenServiceError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    MatchmakingService(MatchmakingServiceError),
    MatchService(MatchServiceError),
    TokenService(TokenServiceError),
    BadRequest(String),
    Unauthorized,
    Forbidden,
}

impl From<MatchmakingServiceError> for ApiError {
    fn from(error: MatchmakingServiceError) -> Self {
        ApiError::MatchmakingService(error)
    }
}

impl From<MatchServiceError> for ApiError {
    fn from(error: MatchServiceError) -> Self {
        ApiError::MatchService(error)
    }
}

impl From<TokenServiceError> for ApiError {
    fn from(error: TokenServiceError) -> Self {
        ApiError::TokenService(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MatchmakingService(MatchmakingServiceError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MatchmakingService(
                MatchmakingServiceError::CorruptQueueEntry(_)
                | MatchmakingServiceError::RepositoryError(_)
                | MatchmakingServiceError::TokenError(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,

            ApiError::MatchService(MatchServiceError::MatchNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::MatchService(MatchServiceError::NotAParticipant { .. }) => {
                StatusCode::FORBIDDEN
            }
            ApiError::MatchService(
                MatchServiceError::MatchBusy(_) | MatchServiceError::RepositoryError(_),
            ) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MatchService(
                MatchServiceError::CorruptLog { .. } | MatchServiceError::RulesError(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,

            ApiError::TokenService(TokenServiceError::JwtError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::TokenService(
                TokenServiceError::InvalidToken
                | TokenServiceError::ExpiredToken
                | TokenServiceError::WrongTokenKind,
            ) => StatusCode::UNAUTHORIZED,

            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MatchmakingService(e) => e.to_string(),
            ApiError::MatchService(e) => e.to_string(),
            ApiError::TokenService(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Unauthorized => "Missing or invalid bearer token".to_string(),
            ApiError::Forbidden => "Not allowed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.message(), "Request failed");
        }

        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.message()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
