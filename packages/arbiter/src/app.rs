use std::sync::Arc;

use aws_sdk_dynamodb::Client;

use crate::config::{ServiceConfig, TableNames};
use crate::repositories::event_repository::{DynamoDbEventRepository, EventRepository};
use crate::repositories::lock_repository::{DynamoDbLockRepository, LockRepository};
use crate::repositories::match_repository::{DynamoDbMatchRepository, MatchRepository};
use crate::repositories::memory::{
    InMemoryEventRepository, InMemoryLockRepository, InMemoryMatchRepository,
    InMemoryQueueRepository, RecordingRatingTrigger,
};
use crate::repositories::queue_repository::{DynamoDbQueueRepository, QueueRepository};
use crate::repositories::rating_trigger::{DynamoDbRatingTrigger, RatingTrigger};
use crate::services::admin_service::AdminService;
use crate::services::clock::ClockAuthority;
use crate::services::match_lock::MatchLocker;
use crate::services::matchmaking_service::MatchmakingService;
use crate::services::recovery_service::RecoveryService;
use crate::services::referee_service::RefereeService;
use crate::services::resume_service::ResumeService;
use crate::services::rules_engine::{ChessRulesEngine, GameRulesEngine};
use crate::services::time_source::TimeSource;
use crate::services::token_service::TokenService;

/// The storage seams every service is built on.
#[derive(Clone)]
pub struct Repositories {
    pub queue: Arc<dyn QueueRepository + Send + Sync>,
    pub matches: Arc<dyn MatchRepository + Send + Sync>,
    pub events: Arc<dyn EventRepository + Send + Sync>,
    pub locks: Arc<dyn LockRepository + Send + Sync>,
    pub rating: Arc<dyn RatingTrigger + Send + Sync>,
}

impl Repositories {
    pub fn dynamodb(client: Client, tables: &TableNames) -> Self {
        Repositories {
            queue: Arc::new(DynamoDbQueueRepository::new(client.clone(), &tables.queue)),
            matches: Arc::new(DynamoDbMatchRepository::new(client.clone(), &tables.matches)),
            events: Arc::new(DynamoDbEventRepository::new(
                client.clone(),
                &tables.match_events,
            )),
            locks: Arc::new(DynamoDbLockRepository::new(client.clone(), &tables.match_locks)),
            rating: Arc::new(DynamoDbRatingTrigger::new(client, &tables.rating_jobs)),
        }
    }
}

/// In-memory stores with their concrete types kept, so tests can inspect them.
#[derive(Clone, Default)]
pub struct InMemoryStores {
    pub queue: Arc<InMemoryQueueRepository>,
    pub matches: Arc<InMemoryMatchRepository>,
    pub events: Arc<InMemoryEventRepository>,
    pub locks: Arc<InMemoryLockRepository>,
    pub rating: Arc<RecordingRatingTrigger>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            queue: self.queue.clone(),
            matches: self.matches.clone(),
            events: self.events.clone(),
            locks: self.locks.clone(),
            rating: self.rating.clone(),
        }
    }
}

/// Every service of the match authority, wired once at startup.
#[derive(Clone)]
pub struct Services {
    pub tokens: TokenService,
    pub matchmaking: MatchmakingService,
    pub referee: RefereeService,
    pub resume: ResumeService,
    pub admin: AdminService,
    pub recovery: RecoveryService,
}

impl Services {
    pub fn build(
        repositories: Repositories,
        config: &ServiceConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let rules: Arc<dyn GameRulesEngine> = Arc::new(ChessRulesEngine::new());
        Self::with_rules(repositories, config, time, rules)
    }

    pub fn with_rules(
        repositories: Repositories,
        config: &ServiceConfig,
        time: Arc<dyn TimeSource>,
        rules: Arc<dyn GameRulesEngine>,
    ) -> Self {
        let tokens = TokenService::new(config.signing_key.clone(), config.join_token_ttl);
        let locker = MatchLocker::new(
            repositories.locks.clone(),
            time.clone(),
            config.lock_ttl_ms,
            config.lock_attempts,
            config.lock_retry_delay,
        );
        let recovery = RecoveryService::new(
            repositories.matches.clone(),
            repositories.events.clone(),
            repositories.rating.clone(),
        );

        Services {
            matchmaking: MatchmakingService::new(
                repositories.queue.clone(),
                repositories.matches.clone(),
                tokens.clone(),
                time.clone(),
            ),
            referee: RefereeService::new(
                locker.clone(),
                recovery.clone(),
                rules,
                ClockAuthority::new(config.drift_tolerance_ms),
                time.clone(),
            ),
            resume: ResumeService::new(
                locker.clone(),
                recovery.clone(),
                repositories.matches.clone(),
                repositories.events.clone(),
                time.clone(),
                config.key_grace_window,
            ),
            admin: AdminService::new(locker, recovery.clone(), time),
            tokens,
            recovery,
        }
    }
}
