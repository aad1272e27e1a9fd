#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, Duration, Utc};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use arbiter::app::{InMemoryStores, Services};
use arbiter::config::{ServiceConfig, SigningKey};
use arbiter::models::queue::{QueueKey, TimeControl};
use arbiter::models::requests::{MoveSubmission, ResignRequest};
use arbiter::models::responses::{MatchCreated, PairOutcome};
use arbiter::models::{MatchKey, Side};
use arbiter::services::{ChessRulesEngine, GameRulesEngine, ManualTimeSource, TimeSource};

pub const SIGNING_KEY: &str = "integration-signing-key-0123456789abcdef";

pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

/// Position equality ignoring FEN formatting details.
pub fn same_position(a: &str, b: &str) -> bool {
    ChessRulesEngine::new().same_position(a, b)
}

static TRACING: Once = Once::new();

/// Routes service logs to the test harness output; `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Services wired over in-memory stores and a manual clock. The clock starts at
/// the real current time so issued tokens pass expiry checks.
pub struct World {
    pub stores: InMemoryStores,
    pub services: Services,
    pub time: Arc<ManualTimeSource>,
    pub config: ServiceConfig,
}

impl World {
    pub fn new() -> Self {
        init_tracing();
        let mut config = ServiceConfig::local(SigningKey::new(SIGNING_KEY).unwrap());
        config.lock_attempts = 200;
        config.lock_retry_delay = std::time::Duration::from_millis(5);
        let stores = InMemoryStores::new();
        let time = Arc::new(ManualTimeSource::new(Utc::now()));
        let services = Services::build(stores.repositories(), &config, time.clone());
        World {
            stores,
            services,
            time,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    pub fn advance(&self, ms: i64) {
        self.time.advance(Duration::milliseconds(ms));
    }

    /// Pairs two fresh players through the queue and creates their match.
    pub async fn start_match(&self, tc: &str, rated: bool) -> StartedMatch {
        let time_control: TimeControl = tc.parse().unwrap();
        let key = QueueKey::new(time_control, rated);
        let white = Uuid::new_v4().to_string();
        let black = Uuid::new_v4().to_string();

        let matchmaking = &self.services.matchmaking;
        matchmaking.enqueue(key, &white).await.unwrap();
        matchmaking.enqueue(key, &black).await.unwrap();
        let PairOutcome::PairFound(pairing) = matchmaking.pair(key).await.unwrap() else {
            panic!("two queued players must pair");
        };
        let created = matchmaking
            .create_match(&pairing, time_control, rated)
            .await
            .unwrap();

        StartedMatch {
            key: created.match_key.clone(),
            white,
            black,
            created,
        }
    }
}

pub struct StartedMatch {
    pub created: MatchCreated,
    pub key: MatchKey,
    pub white: String,
    pub black: String,
}

impl StartedMatch {
    pub fn id(&self) -> &str {
        &self.created.match_id
    }
}

/// A submission whose claimed clocks are signed as given.
pub fn signed_move(
    key: &MatchKey,
    seq: u64,
    uci: &str,
    fen: &str,
    side: Side,
    sent_at: DateTime<Utc>,
) -> MoveSubmission {
    let mut submission = MoveSubmission {
        sequence: seq,
        uci: uci.to_string(),
        fen: fen.to_string(),
        white_clock_ms: 300_000,
        black_clock_ms: 300_000,
        client_timestamp: sent_at.fixed_offset(),
        side,
        signature: String::new(),
    };
    submission.signature = key.sign(&submission.canonical_payload()).unwrap();
    submission
}

pub fn signed_resign(key: &MatchKey, seq: u64, side: Side) -> ResignRequest {
    let mut request = ResignRequest {
        sequence: seq,
        side,
        signature: String::new(),
    };
    request.signature = key.sign(&request.canonical_payload()).unwrap();
    request
}
