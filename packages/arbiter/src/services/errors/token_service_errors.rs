use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenServiceError {
    JwtError(String),
    InvalidToken,
    ExpiredToken,
    WrongTokenKind,
}

impl fmt::Display for TokenServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenServiceError::JwtError(msg) => write!(f, "JWT error: {}", msg),
            TokenServiceError::InvalidToken => write!(f, "Invalid token"),
            TokenServiceError::ExpiredToken => write!(f, "Token has expired"),
            TokenServiceError::WrongTokenKind => write!(f, "Token is not valid for this use"),
        }
    }
}

impl std::error::Error for TokenServiceError {}
