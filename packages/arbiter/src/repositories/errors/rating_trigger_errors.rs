#[derive(Debug)]
pub enum RatingTriggerError {
    Serialization(String),
    DynamoDb(String),
    Unavailable(String),
}

impl std::fmt::Display for RatingTriggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingTriggerError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RatingTriggerError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            RatingTriggerError::Unavailable(msg) => write!(f, "Rating service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for RatingTriggerError {}
