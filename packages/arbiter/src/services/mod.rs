pub mod admin_service;
pub mod clock;
pub mod errors;
pub mod match_lock;
pub mod matchmaking_service;
pub mod recovery_service;
pub mod referee_service;
pub mod resume_service;
pub mod rules_engine;
pub mod time_source;
pub mod token_service;

pub use admin_service::AdminService;
pub use clock::ClockAuthority;
pub use match_lock::MatchLocker;
pub use matchmaking_service::MatchmakingService;
pub use recovery_service::RecoveryService;
pub use referee_service::RefereeService;
pub use resume_service::ResumeService;
pub use rules_engine::{ChessRulesEngine, GameRulesEngine};
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use token_service::TokenService;
