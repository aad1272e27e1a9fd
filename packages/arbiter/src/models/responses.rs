use std::fmt;

use serde::Serialize;

use super::match_event::MatchEvent;
use super::match_key::MatchKey;
use super::match_state::{MatchOutcome, MatchStatus};
use super::side::Side;

/// Why a submission was refused. Rejections leave no trace in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "camelCase")]
pub enum RejectionReason {
    BadSignature,
    SequenceConflict { expected: u64, received: u64 },
    NotYourTurn,
    IllegalMove { detail: String },
    MatchNotLive,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::BadSignature => write!(f, "bad signature"),
            RejectionReason::SequenceConflict { expected, received } => {
                write!(f, "sequence conflict: expected {}, got {}", expected, received)
            }
            RejectionReason::NotYourTurn => write!(f, "not your turn"),
            RejectionReason::IllegalMove { detail } => write!(f, "illegal move: {}", detail),
            RejectionReason::MatchNotLive => write!(f, "match is not live"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAccepted {
    pub sequence: u64,
    pub position: String,
    pub white_clock_ms: i64,
    pub black_clock_ms: i64,
    pub side_to_move: Side,
    /// Server minus client timestamp. Informational only.
    pub drift_ms: i64,
    pub outcome: Option<MatchOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubmitOutcome {
    Accepted(MoveAccepted),
    Rejected { reason: RejectionReason },
    Timeout { side: Side, outcome: MatchOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResignOutcome {
    Resigned { sequence: u64, outcome: MatchOutcome },
    Rejected { reason: RejectionReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ClaimOutcome {
    Timeout { side: Side, outcome: MatchOutcome },
    #[serde(rename_all = "camelCase")]
    Running { side: Side, remaining_ms: i64 },
    Rejected { reason: RejectionReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AbortOutcome {
    Aborted { sequence: u64 },
    Rejected { reason: RejectionReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnqueueOutcome {
    Queued,
    AlreadyQueued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaveOutcome {
    Left,
    NotQueued,
}

/// Two distinct players drained from one queue, white first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingResult {
    pub white_id: String,
    pub black_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    PairFound(PairingResult),
    NoPairAvailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sides {
    pub white: String,
    pub black: String,
}

/// Everything both players need to start. `match_key` redacts itself in `Debug`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCreated {
    pub match_id: String,
    pub sides: Sides,
    pub match_key: MatchKey,
    #[serde(skip)]
    pub white_join_token: String,
    #[serde(skip)]
    pub black_join_token: String,
}

impl MatchCreated {
    pub fn join_token_for(&self, player_id: &str) -> Option<&str> {
        if self.sides.white == player_id {
            Some(&self.white_join_token)
        } else if self.sides.black == player_id {
            Some(&self.black_join_token)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub enum QuickplayOutcome {
    Waiting,
    Matched(MatchCreated),
}

/// What a reconnecting client needs to pick the game back up.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSnapshot {
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(rename = "last_seq")]
    pub last_sequence: u64,
    pub fen: String,
    #[serde(rename = "msW")]
    pub white_clock_ms: i64,
    #[serde(rename = "msB")]
    pub black_clock_ms: i64,
    pub side_to_move: Side,
    pub status: MatchStatus,
    pub outcome: Option<MatchOutcome>,
    #[serde(rename = "matchKey_new", skip_serializing_if = "Option::is_none")]
    pub new_match_key: Option<MatchKey>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub match_id: String,
    pub events: Vec<MatchEvent>,
}
