#[derive(Debug)]
pub enum MatchRepositoryError {
    AlreadyExists,
    Conflict {
        match_id: String,
        expected_sequence: u64,
    },
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for MatchRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRepositoryError::AlreadyExists => write!(f, "Match already exists"),
            MatchRepositoryError::Conflict {
                match_id,
                expected_sequence,
            } => write!(
                f,
                "Match {} moved past sequence {} concurrently",
                match_id, expected_sequence
            ),
            MatchRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            MatchRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for MatchRepositoryError {}
