pub mod match_service_errors;
pub mod matchmaking_service_errors;
pub mod rules_engine_errors;
pub mod token_service_errors;
