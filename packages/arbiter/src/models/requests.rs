use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::side::Side;

/// A signed move as sent by the side to move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveSubmission {
    #[serde(rename = "seq")]
    pub sequence: u64,
    pub uci: String,
    pub fen: String,
    #[serde(rename = "msWhite")]
    pub white_clock_ms: i64,
    #[serde(rename = "msBlack")]
    pub black_clock_ms: i64,
    #[serde(rename = "tsClient")]
    pub client_timestamp: DateTime<FixedOffset>,
    pub side: Side,
    #[serde(rename = "sig")]
    pub signature: String,
}

impl MoveSubmission {
    /// `seq|uci|fen|msWhite|msBlack`, the bytes covered by the signature.
    pub fn canonical_payload(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.sequence, self.uci, self.fen, self.white_clock_ms, self.black_clock_ms
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResignRequest {
    #[serde(rename = "seq")]
    pub sequence: u64,
    pub side: Side,
    #[serde(rename = "sig")]
    pub signature: String,
}

impl ResignRequest {
    pub fn canonical_payload(&self) -> String {
        format!("{}|resign|{}", self.sequence, self.side)
    }
}
