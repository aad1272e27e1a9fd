use crate::models::queue::TimeControlParseError;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;
use crate::services::errors::token_service_errors::TokenServiceError;

#[derive(Debug)]
pub enum MatchmakingServiceError {
    ValidationError(String),
    /// A popped queue entry held something other than a player id.
    CorruptQueueEntry(String),
    RepositoryError(String),
    TokenError(TokenServiceError),
}

impl std::fmt::Display for MatchmakingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchmakingServiceError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
            MatchmakingServiceError::CorruptQueueEntry(msg) => {
                write!(f, "Corrupt queue entry: {}", msg)
            }
            MatchmakingServiceError::RepositoryError(msg) => {
                write!(f, "Repository error: {}", msg)
            }
            MatchmakingServiceError::TokenError(err) => write!(f, "Token error: {}", err),
        }
    }
}

impl std::error::Error for MatchmakingServiceError {}

impl From<QueueRepositoryError> for MatchmakingServiceError {
    fn from(err: QueueRepositoryError) -> Self {
        MatchmakingServiceError::RepositoryError(err.to_string())
    }
}

impl From<MatchRepositoryError> for MatchmakingServiceError {
    fn from(err: MatchRepositoryError) -> Self {
        MatchmakingServiceError::RepositoryError(err.to_string())
    }
}

impl From<TimeControlParseError> for MatchmakingServiceError {
    fn from(err: TimeControlParseError) -> Self {
        MatchmakingServiceError::ValidationError(err.to_string())
    }
}

impl From<TokenServiceError> for MatchmakingServiceError {
    fn from(err: TokenServiceError) -> Self {
        MatchmakingServiceError::TokenError(err)
    }
}
