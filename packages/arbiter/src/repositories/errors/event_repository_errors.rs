#[derive(Debug)]
pub enum EventRepositoryError {
    Duplicate { match_id: String, sequence: u64 },
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for EventRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventRepositoryError::Duplicate { match_id, sequence } => {
                write!(f, "Event {} of match {} already exists", sequence, match_id)
            }
            EventRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            EventRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for EventRepositoryError {}
