use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::clock_state::ClockState;
use crate::models::side::Side;

pub const DRIFT_TOLERANCE_MS: i64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The move was made in time. `drift_ms` is server minus client time.
    Updated { clock: ClockState, drift_ms: i64 },
    /// The mover flagged. `clock` shows the mover at zero; nothing else moved.
    Timeout { side: Side, clock: ClockState },
}

/// Pure clock arithmetic. The server timestamp is always the one that counts;
/// the client timestamp only feeds the drift diagnostic.
#[derive(Debug, Clone, Copy)]
pub struct ClockAuthority {
    drift_tolerance_ms: i64,
}

impl Default for ClockAuthority {
    fn default() -> Self {
        ClockAuthority::new(DRIFT_TOLERANCE_MS)
    }
}

impl ClockAuthority {
    pub fn new(drift_tolerance_ms: i64) -> Self {
        ClockAuthority { drift_tolerance_ms }
    }

    /// Milliseconds billed to the side to move if it moved at `at`: time since its
    /// turn began, less the delay, never negative.
    pub fn chargeable_elapsed(&self, clock: &ClockState, at: DateTime<Utc>) -> i64 {
        let elapsed = (at - clock.turn_started_at()).num_milliseconds().max(0);
        (elapsed - clock.delay_ms.max(0)).max(0)
    }

    pub fn remaining_at(&self, clock: &ClockState, side: Side, now: DateTime<Utc>) -> i64 {
        if side == clock.side_to_move {
            clock.remaining(side) - self.chargeable_elapsed(clock, now)
        } else {
            clock.remaining(side)
        }
    }

    pub fn tick(
        &self,
        clock: &ClockState,
        mover: Side,
        server_ts: DateTime<Utc>,
        client_ts: Option<DateTime<Utc>>,
    ) -> TickOutcome {
        let drift_ms = client_ts
            .map(|client| (server_ts - client).num_milliseconds())
            .unwrap_or(0);
        if drift_ms.abs() > self.drift_tolerance_ms {
            warn!(
                side = %mover,
                drift_ms,
                tolerance_ms = self.drift_tolerance_ms,
                "Client clock drift beyond tolerance, using server time"
            );
        }

        let mut next = *clock;
        let remaining = clock.remaining(mover) - self.chargeable_elapsed(clock, server_ts);

        if remaining <= 0 {
            next.set_remaining(mover, 0);
            return TickOutcome::Timeout {
                side: mover,
                clock: next,
            };
        }

        next.set_remaining(mover, remaining + clock.increment_ms);
        next.set_last_tick(mover, server_ts);
        next.side_to_move = mover.opponent();

        TickOutcome::Updated {
            clock: next,
            drift_ms,
        }
    }
}
