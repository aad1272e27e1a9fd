pub mod requests;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::side::Side;

/// Base allotment, Fischer increment and per-move delay, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeControl {
    pub base_ms: i64,
    pub increment_ms: i64,
    pub delay_ms: i64,
}

impl TimeControl {
    pub fn new(base_ms: i64, increment_ms: i64, delay_ms: i64) -> Self {
        TimeControl {
            base_ms,
            increment_ms,
            delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeControlParseError(pub String);

impl fmt::Display for TimeControlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid time control: {}", self.0)
    }
}

impl std::error::Error for TimeControlParseError {}

/// Parses a descriptor of the form `minutes+seconds` or `minutes+seconds+delay_seconds`,
/// e.g. "5+3" or "3+0+2".
impl FromStr for TimeControl {
    type Err = TimeControlParseError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = descriptor.trim().split('+').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(TimeControlParseError(descriptor.to_string()));
        }

        let mut values = Vec::with_capacity(3);
        for part in &parts {
            let value: u32 = part
                .trim()
                .parse()
                .map_err(|_| TimeControlParseError(descriptor.to_string()))?;
            values.push(i64::from(value));
        }

        let base_ms = values[0] * 60_000;
        if base_ms == 0 {
            return Err(TimeControlParseError(format!(
                "{} (base time must be positive)",
                descriptor
            )));
        }

        Ok(TimeControl {
            base_ms,
            increment_ms: values[1] * 1_000,
            delay_ms: values.get(2).copied().unwrap_or(0) * 1_000,
        })
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}+{}", self.base_ms, self.increment_ms, self.delay_ms)
    }
}

/// A waiting list is addressed by time control and rated flag together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub time_control: TimeControl,
    pub rated: bool,
}

impl QueueKey {
    pub fn new(time_control: TimeControl, rated: bool) -> Self {
        QueueKey {
            time_control,
            rated,
        }
    }

    /// Partition key used by the queue store, e.g. "300000+3000+0#rated".
    pub fn partition_key(&self) -> String {
        let pool = if self.rated { "rated" } else { "casual" };
        format!("{}#{}", self.time_control, pool)
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.partition_key())
    }
}

/// A player waiting in one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub key: QueueKey,
    pub player_id: String,
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(key: QueueKey, player_id: &str, joined_at: DateTime<Utc>) -> Self {
        QueueEntry {
            key,
            player_id: player_id.to_string(),
            joined_at,
        }
    }
}

/// Where a paired player was placed. Kept until the match ends so a player who
/// was waiting when the pair formed can still pick up their seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAssignment {
    pub player_id: String,
    pub match_id: String,
    pub side: Side,
    pub assigned_at: DateTime<Utc>,
}

impl PendingAssignment {
    pub fn new(player_id: &str, match_id: &str, side: Side, assigned_at: DateTime<Utc>) -> Self {
        PendingAssignment {
            player_id: player_id.to_string(),
            match_id: match_id.to_string(),
            side,
            assigned_at,
        }
    }
}
