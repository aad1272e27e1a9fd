pub mod errors;
pub mod event_repository;
pub mod lock_repository;
pub mod match_repository;
pub mod memory;
pub mod queue_repository;
pub mod rating_trigger;

pub use event_repository::{DynamoDbEventRepository, EventRepository};
pub use lock_repository::{DynamoDbLockRepository, LockRepository, MatchLease};
pub use match_repository::{DynamoDbMatchRepository, MatchRepository};
pub use queue_repository::{DynamoDbQueueRepository, QueueRepository};
pub use rating_trigger::{DynamoDbRatingTrigger, RatingJob, RatingTrigger};
