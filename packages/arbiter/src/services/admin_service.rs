use std::sync::Arc;

use tracing::{info, warn};

use crate::models::match_event::{MatchEvent, MatchEventKind};
use crate::models::match_state::MatchOutcome;
use crate::models::responses::{AbortOutcome, RejectionReason};
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::match_lock::MatchLocker;
use crate::services::recovery_service::{next_event, RecoveryService};
use crate::services::time_source::TimeSource;

/// Operator actions on a single match.
#[derive(Clone)]
pub struct AdminService {
    locker: MatchLocker,
    recovery: RecoveryService,
    time: Arc<dyn TimeSource>,
}

impl AdminService {
    pub fn new(locker: MatchLocker, recovery: RecoveryService, time: Arc<dyn TimeSource>) -> Self {
        AdminService {
            locker,
            recovery,
            time,
        }
    }

    /// Ends a live match with no winner. Aborted matches are never rated.
    pub async fn abort(&self, match_id: &str) -> Result<AbortOutcome, MatchServiceError> {
        let lease = self.locker.acquire(match_id).await?;
        let result = self.abort_locked(match_id).await;
        self.locker.release(&lease).await;
        result
    }

    async fn abort_locked(&self, match_id: &str) -> Result<AbortOutcome, MatchServiceError> {
        let mut m = self.recovery.load(match_id).await?;
        if !m.is_live() {
            warn!(match_id, status = ?m.status, "Abort requested for closed match");
            return Ok(AbortOutcome::Rejected {
                reason: RejectionReason::MatchNotLive,
            });
        }

        let event = MatchEvent {
            outcome: Some(MatchOutcome::aborted()),
            ..next_event(&m, MatchEventKind::Abort, None, self.time.now())
        };
        self.recovery.commit(&mut m, event).await?;

        info!(match_id, sequence = m.last_sequence, "Match aborted by admin");
        Ok(AbortOutcome::Aborted {
            sequence: m.last_sequence,
        })
    }
}
