use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::clock_state::ClockState;
use super::match_event::{MatchEvent, MatchEventKind};
use super::match_key::MatchKey;
use super::queue::TimeControl;
use super::side::Side;

pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Live,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchResult {
    WhiteWins,
    BlackWins,
    Draw,
    Aborted,
}

impl MatchResult {
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => MatchResult::WhiteWins,
            Side::Black => MatchResult::BlackWins,
        }
    }

    /// PGN-style score, "*" for aborted games.
    pub fn score(&self) -> &'static str {
        match self {
            MatchResult::WhiteWins => "1-0",
            MatchResult::BlackWins => "0-1",
            MatchResult::Draw => "1/2-1/2",
            MatchResult::Aborted => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    Checkmate,
    Resignation,
    Timeout,
    DrawAgreed,
    AdminAction,
    RuleDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub result: MatchResult,
    pub reason: TerminationReason,
}

impl MatchOutcome {
    pub fn win(side: Side, reason: TerminationReason) -> Self {
        MatchOutcome {
            result: MatchResult::win_for(side),
            reason,
        }
    }

    pub fn draw(reason: TerminationReason) -> Self {
        MatchOutcome {
            result: MatchResult::Draw,
            reason,
        }
    }

    pub fn aborted() -> Self {
        MatchOutcome {
            result: MatchResult::Aborted,
            reason: TerminationReason::AdminAction,
        }
    }
}

/// Durable match row. The event log is authoritative; this row is a checkpoint of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: String,
    pub white_id: String,
    pub black_id: String,
    pub time_control: TimeControl,
    pub rated: bool,
    pub status: MatchStatus,
    pub side_to_move: Side,
    pub last_sequence: u64,
    pub last_position: String,
    pub white_clock_ms: i64,
    pub black_clock_ms: i64,
    pub last_tick_white: DateTime<Utc>,
    pub last_tick_black: DateTime<Utc>,
    pub result: Option<MatchResult>,
    pub termination: Option<TerminationReason>,
    pub match_key: MatchKey,
    pub previous_key: Option<MatchKey>,
    pub previous_key_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(
        match_id: String,
        white_id: &str,
        black_id: &str,
        time_control: TimeControl,
        rated: bool,
        match_key: MatchKey,
        created_at: DateTime<Utc>,
    ) -> Self {
        Match {
            match_id,
            white_id: white_id.to_string(),
            black_id: black_id.to_string(),
            time_control,
            rated,
            status: MatchStatus::Live,
            side_to_move: Side::White,
            last_sequence: 0,
            last_position: STARTING_POSITION.to_string(),
            white_clock_ms: time_control.base_ms,
            black_clock_ms: time_control.base_ms,
            last_tick_white: created_at,
            last_tick_black: created_at,
            result: None,
            termination: None,
            match_key,
            previous_key: None,
            previous_key_expires_at: None,
            created_at,
            finished_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }

    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white_id,
            Side::Black => &self.black_id,
        }
    }

    pub fn side_of(&self, player_id: &str) -> Option<Side> {
        if self.white_id == player_id {
            Some(Side::White)
        } else if self.black_id == player_id {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn clock_state(&self) -> ClockState {
        ClockState {
            white_ms: self.white_clock_ms,
            black_ms: self.black_clock_ms,
            last_tick_white: self.last_tick_white,
            last_tick_black: self.last_tick_black,
            increment_ms: self.time_control.increment_ms,
            delay_ms: self.time_control.delay_ms,
            side_to_move: self.side_to_move,
        }
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        match (self.result, self.termination) {
            (Some(result), Some(reason)) => Some(MatchOutcome { result, reason }),
            _ => None,
        }
    }

    /// Accepts signatures made with the current key, or with the previous key
    /// until its grace window closes.
    pub fn verify_signature(&self, payload: &str, signature: &str, now: DateTime<Utc>) -> bool {
        if self.match_key.verify(payload, signature) {
            return true;
        }
        match (&self.previous_key, self.previous_key_expires_at) {
            (Some(previous), Some(expires_at)) if now < expires_at => {
                previous.verify(payload, signature)
            }
            _ => false,
        }
    }

    /// Installs `new_key`; the outgoing key stays valid for `grace`. A key that was
    /// already in its grace window is dropped immediately.
    pub fn rotate_key(&mut self, new_key: MatchKey, now: DateTime<Utc>, grace: Duration) {
        let outgoing = std::mem::replace(&mut self.match_key, new_key);
        self.previous_key = Some(outgoing);
        self.previous_key_expires_at = Some(now + grace);
    }

    /// Folds one log entry into the row. Live commits and crash recovery both go
    /// through here so the row is always a pure function of the log.
    pub fn apply_event(&mut self, event: &MatchEvent) {
        self.last_sequence = event.sequence;

        match event.kind {
            MatchEventKind::Move if event.valid => {
                self.last_position = event.position_after.clone();
                self.white_clock_ms = event.white_clock_ms;
                self.black_clock_ms = event.black_clock_ms;
                if let Some(side) = event.side {
                    match side {
                        Side::White => self.last_tick_white = event.server_timestamp,
                        Side::Black => self.last_tick_black = event.server_timestamp,
                    }
                    self.side_to_move = side.opponent();
                }
            }
            MatchEventKind::Timeout => {
                self.white_clock_ms = event.white_clock_ms;
                self.black_clock_ms = event.black_clock_ms;
            }
            _ => {}
        }

        if let Some(outcome) = event.outcome {
            self.result = Some(outcome.result);
            self.termination = Some(outcome.reason);
            self.status = match outcome.result {
                MatchResult::Aborted => MatchStatus::Aborted,
                _ => MatchStatus::Finished,
            };
            self.finished_at = Some(event.server_timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_event::position_fingerprint;

    fn new_match() -> Match {
        Match::new(
            "match-1".to_string(),
            "white-player",
            "black-player",
            TimeControl::new(300_000, 3_000, 0),
            true,
            MatchKey::generate(),
            Utc::now(),
        )
    }

    fn move_event(sequence: u64, side: Side, at: DateTime<Utc>) -> MatchEvent {
        MatchEvent {
            match_id: "match-1".to_string(),
            sequence,
            kind: MatchEventKind::Move,
            side: Some(side),
            move_uci: Some("e2e4".to_string()),
            position_before: STARTING_POSITION.to_string(),
            position_after: "after".to_string(),
            claimed_white_clock_ms: Some(300_000),
            claimed_black_clock_ms: Some(300_000),
            white_clock_ms: 301_000,
            black_clock_ms: 300_000,
            client_timestamp: Some(at),
            server_timestamp: at,
            signature: Some("sig".to_string()),
            valid: true,
            fingerprint: position_fingerprint("after"),
            outcome: None,
        }
    }

    #[test]
    fn test_new_match_fields() {
        let m = new_match();

        assert_eq!(m.status, MatchStatus::Live);
        assert_eq!(m.side_to_move, Side::White);
        assert_eq!(m.last_sequence, 0);
        assert_eq!(m.last_position, STARTING_POSITION);
        assert_eq!(m.white_clock_ms, 300_000);
        assert_eq!(m.black_clock_ms, 300_000);
        assert_eq!(m.last_tick_white, m.created_at);
        assert_eq!(m.last_tick_black, m.created_at);
        assert!(m.outcome().is_none());
        assert_eq!(m.side_of("black-player"), Some(Side::Black));
        assert_eq!(m.side_of("someone-else"), None);
    }

    #[test]
    fn test_apply_move_event_advances_row() {
        let mut m = new_match();
        let at = m.created_at + Duration::milliseconds(2_000);

        m.apply_event(&move_event(1, Side::White, at));

        assert_eq!(m.last_sequence, 1);
        assert_eq!(m.last_position, "after");
        assert_eq!(m.white_clock_ms, 301_000);
        assert_eq!(m.last_tick_white, at);
        assert_eq!(m.last_tick_black, m.created_at);
        assert_eq!(m.side_to_move, Side::Black);
        assert!(m.is_live());
    }

    #[test]
    fn test_apply_terminal_event_closes_match() {
        let mut m = new_match();
        let at = m.created_at + Duration::seconds(1);
        let mut event = move_event(1, Side::White, at);
        event.outcome = Some(MatchOutcome::win(Side::White, TerminationReason::Checkmate));

        m.apply_event(&event);

        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.result, Some(MatchResult::WhiteWins));
        assert_eq!(m.termination, Some(TerminationReason::Checkmate));
        assert_eq!(m.finished_at, Some(at));
    }

    #[test]
    fn test_apply_abort_event_marks_aborted() {
        let mut m = new_match();
        let at = m.created_at + Duration::seconds(1);
        let event = MatchEvent {
            kind: MatchEventKind::Abort,
            side: None,
            move_uci: None,
            position_after: STARTING_POSITION.to_string(),
            valid: true,
            outcome: Some(MatchOutcome::aborted()),
            ..move_event(1, Side::White, at)
        };

        m.apply_event(&event);

        assert_eq!(m.status, MatchStatus::Aborted);
        assert_eq!(m.result, Some(MatchResult::Aborted));
        assert_eq!(m.last_position, STARTING_POSITION);
        assert_eq!(m.side_to_move, Side::White);
    }

    #[test]
    fn test_previous_key_valid_only_inside_grace_window() {
        let mut m = new_match();
        let old_key = m.match_key.clone();
        let payload = "1|e2e4|fen|300000|300000";
        let old_signature = old_key.sign(payload).unwrap();
        let now = m.created_at;

        m.rotate_key(MatchKey::generate(), now, Duration::seconds(30));

        assert_ne!(m.match_key, old_key);
        assert!(m.verify_signature(payload, &old_signature, now + Duration::seconds(29)));
        assert!(!m.verify_signature(payload, &old_signature, now + Duration::seconds(30)));

        let new_signature = m.match_key.sign(payload).unwrap();
        assert!(m.verify_signature(payload, &new_signature, now + Duration::hours(1)));
    }

    #[test]
    fn test_match_serialization_keeps_key_encoded() {
        let m = new_match();
        let serialized = serde_json::to_string(&m).unwrap();

        assert!(serialized.contains(&m.match_key.to_base64()));
        assert!(serialized.contains("\"status\":\"live\""));

        let deserialized: Match = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.match_key, m.match_key);
        assert_eq!(deserialized.time_control, m.time_control);
    }
}
