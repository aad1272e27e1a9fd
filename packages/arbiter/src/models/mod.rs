pub mod clock_state;
pub mod match_event;
pub mod match_key;
pub mod match_state;
pub mod queue;
pub mod requests;
pub mod responses;
pub mod side;
pub mod tokens;

pub use clock_state::ClockState;
pub use match_event::{MatchEvent, MatchEventKind};
pub use match_key::MatchKey;
pub use match_state::{
    Match, MatchOutcome, MatchResult, MatchStatus, TerminationReason, STARTING_POSITION,
};
pub use queue::{PendingAssignment, QueueEntry, QueueKey, TimeControl};
pub use side::Side;
