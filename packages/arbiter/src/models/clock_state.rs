use chrono::{DateTime, Utc};

use super::side::Side;

/// Clock checkpoint of one match.
///
/// `last_tick_*` is the server time at which that side last completed a move
/// (or match creation). The side to move has been running since the later of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    pub white_ms: i64,
    pub black_ms: i64,
    pub last_tick_white: DateTime<Utc>,
    pub last_tick_black: DateTime<Utc>,
    pub increment_ms: i64,
    pub delay_ms: i64,
    pub side_to_move: Side,
}

impl ClockState {
    pub fn remaining(&self, side: Side) -> i64 {
        match side {
            Side::White => self.white_ms,
            Side::Black => self.black_ms,
        }
    }

    pub fn set_remaining(&mut self, side: Side, remaining_ms: i64) {
        match side {
            Side::White => self.white_ms = remaining_ms,
            Side::Black => self.black_ms = remaining_ms,
        }
    }

    pub fn last_tick(&self, side: Side) -> DateTime<Utc> {
        match side {
            Side::White => self.last_tick_white,
            Side::Black => self.last_tick_black,
        }
    }

    pub fn set_last_tick(&mut self, side: Side, at: DateTime<Utc>) {
        match side {
            Side::White => self.last_tick_white = at,
            Side::Black => self.last_tick_black = at,
        }
    }

    /// The mover's clock runs from the end of the opponent's turn, the later of the
    /// two ticks, not from the mover's own previous tick.
    pub fn turn_started_at(&self) -> DateTime<Utc> {
        self.last_tick_white.max(self.last_tick_black)
    }
}
