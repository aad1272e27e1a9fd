use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::match_state::MatchOutcome;
use super::side::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchEventKind {
    Move,
    Timeout,
    Resignation,
    Abort,
}

/// One immutable entry of a match's log. Sequence numbers start at 1 and have no gaps.
///
/// `white_clock_ms`/`black_clock_ms` are the server's figures after arbitration;
/// the `claimed_*` fields keep what the client sent for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub match_id: String,
    pub sequence: u64,
    pub kind: MatchEventKind,
    pub side: Option<Side>,
    pub move_uci: Option<String>,
    pub position_before: String,
    pub position_after: String,
    pub claimed_white_clock_ms: Option<i64>,
    pub claimed_black_clock_ms: Option<i64>,
    pub white_clock_ms: i64,
    pub black_clock_ms: i64,
    pub client_timestamp: Option<DateTime<Utc>>,
    pub server_timestamp: DateTime<Utc>,
    pub signature: Option<String>,
    pub valid: bool,
    pub fingerprint: String,
    pub outcome: Option<MatchOutcome>,
}

impl MatchEvent {
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Audit fingerprint of a position: hex SHA-256 of its FEN.
/// Stored for forensics only; nothing compares it.
pub fn position_fingerprint(position: &str) -> String {
    hex::encode(Sha256::digest(position.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_fingerprint_is_stable_sha256() {
        let fingerprint = position_fingerprint("");
        assert_eq!(
            fingerprint,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(
            position_fingerprint("8/8/8/8/8/8/8/K6k w - - 0 1"),
            position_fingerprint("8/8/8/8/8/8/8/K6k b - - 0 1")
        );
    }
}
