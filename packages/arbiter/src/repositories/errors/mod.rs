pub mod event_repository_errors;
pub mod lock_repository_errors;
pub mod match_repository_errors;
pub mod queue_repository_errors;
pub mod rating_trigger_errors;
