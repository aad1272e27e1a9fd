#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesEngineError {
    InvalidPosition(String),
    IllegalMove(String),
}

impl std::fmt::Display for RulesEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesEngineError::InvalidPosition(msg) => write!(f, "Invalid position: {}", msg),
            RulesEngineError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
        }
    }
}

impl std::error::Error for RulesEngineError {}
