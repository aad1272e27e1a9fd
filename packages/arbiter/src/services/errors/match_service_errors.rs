use crate::repositories::errors::event_repository_errors::EventRepositoryError;
use crate::repositories::errors::lock_repository_errors::LockRepositoryError;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::services::errors::rules_engine_errors::RulesEngineError;

/// Failures of the referee, resume, recovery and admin services. Rejected moves
/// are not errors; they come back as outcomes.
#[derive(Debug)]
pub enum MatchServiceError {
    MatchNotFound(String),
    /// The per-match lease stayed taken for every attempt. Safe to retry.
    MatchBusy(String),
    NotAParticipant { match_id: String, player_id: String },
    /// The stored log cannot be replayed onto the row.
    CorruptLog { match_id: String, detail: String },
    RulesError(RulesEngineError),
    RepositoryError(String),
}

impl std::fmt::Display for MatchServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchServiceError::MatchNotFound(id) => write!(f, "Match {} not found", id),
            MatchServiceError::MatchBusy(id) => write!(f, "Match {} is busy, retry", id),
            MatchServiceError::NotAParticipant { match_id, player_id } => {
                write!(f, "Player {} is not part of match {}", player_id, match_id)
            }
            MatchServiceError::CorruptLog { match_id, detail } => {
                write!(f, "Event log of match {} is corrupt: {}", match_id, detail)
            }
            MatchServiceError::RulesError(err) => write!(f, "Rules error: {}", err),
            MatchServiceError::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
        }
    }
}

impl std::error::Error for MatchServiceError {}

impl From<MatchRepositoryError> for MatchServiceError {
    fn from(err: MatchRepositoryError) -> Self {
        MatchServiceError::RepositoryError(err.to_string())
    }
}

impl From<EventRepositoryError> for MatchServiceError {
    fn from(err: EventRepositoryError) -> Self {
        MatchServiceError::RepositoryError(err.to_string())
    }
}

impl From<LockRepositoryError> for MatchServiceError {
    fn from(err: LockRepositoryError) -> Self {
        MatchServiceError::RepositoryError(err.to_string())
    }
}

impl From<RulesEngineError> for MatchServiceError {
    fn from(err: RulesEngineError) -> Self {
        MatchServiceError::RulesError(err)
    }
}
