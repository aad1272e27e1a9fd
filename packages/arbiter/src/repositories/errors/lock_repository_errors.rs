#[derive(Debug)]
pub enum LockRepositoryError {
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for LockRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            LockRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for LockRepositoryError {}
