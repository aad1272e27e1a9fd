use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::repositories::lock_repository::{LockRepository, MatchLease};
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::time_source::TimeSource;

/// Linearizes every mutating operation on one match across processes, using a
/// lease held in storage rather than any in-process lock.
#[derive(Clone)]
pub struct MatchLocker {
    locks: Arc<dyn LockRepository + Send + Sync>,
    time: Arc<dyn TimeSource>,
    ttl_ms: i64,
    attempts: u32,
    retry_delay: Duration,
}

impl MatchLocker {
    pub fn new(
        locks: Arc<dyn LockRepository + Send + Sync>,
        time: Arc<dyn TimeSource>,
        ttl_ms: i64,
        attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        MatchLocker {
            locks,
            time,
            ttl_ms,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub async fn acquire(&self, match_id: &str) -> Result<MatchLease, MatchServiceError> {
        let owner = Uuid::new_v4().to_string();

        for attempt in 1..=self.attempts {
            let now = self.time.now();
            let lease = MatchLease::new(match_id, &owner, now, self.ttl_ms);
            if self.locks.try_acquire(&lease, now).await? {
                debug!(match_id, attempt, "Match lease acquired");
                return Ok(lease);
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        warn!(match_id, attempts = self.attempts, "Match lease still held, giving up");
        Err(MatchServiceError::MatchBusy(match_id.to_string()))
    }

    /// Never fails the caller; an unreleased lease simply expires.
    pub async fn release(&self, lease: &MatchLease) {
        if let Err(e) = self.locks.release(lease).await {
            warn!(match_id = %lease.match_id, error = %e, "Failed to release match lease");
        }
    }
}
