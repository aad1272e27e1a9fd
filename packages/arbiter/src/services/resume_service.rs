use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::models::match_key::MatchKey;
use crate::models::match_state::Match;
use crate::models::responses::{EventPage, ResumeSnapshot};
use crate::repositories::event_repository::EventRepository;
use crate::repositories::match_repository::MatchRepository;
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::match_lock::MatchLocker;
use crate::services::recovery_service::RecoveryService;
use crate::services::time_source::TimeSource;

fn snapshot(m: &Match, new_match_key: Option<MatchKey>) -> ResumeSnapshot {
    ResumeSnapshot {
        match_id: m.match_id.clone(),
        last_sequence: m.last_sequence,
        fen: m.last_position.clone(),
        white_clock_ms: m.white_clock_ms,
        black_clock_ms: m.black_clock_ms,
        side_to_move: m.side_to_move,
        status: m.status,
        outcome: m.outcome(),
        new_match_key,
    }
}

#[derive(Clone)]
pub struct ResumeService {
    locker: MatchLocker,
    recovery: RecoveryService,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    events: Arc<dyn EventRepository + Send + Sync>,
    time: Arc<dyn TimeSource>,
    grace: Duration,
}

impl ResumeService {
    pub fn new(
        locker: MatchLocker,
        recovery: RecoveryService,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        events: Arc<dyn EventRepository + Send + Sync>,
        time: Arc<dyn TimeSource>,
        grace: Duration,
    ) -> Self {
        ResumeService {
            locker,
            recovery,
            matches,
            events,
            time,
            grace,
        }
    }

    /// Snapshot for a reconnecting player. A live match gets a fresh key; the old
    /// one keeps verifying until the grace window closes.
    pub async fn resume(
        &self,
        match_id: &str,
        requester_id: &str,
    ) -> Result<ResumeSnapshot, MatchServiceError> {
        let lease = self.locker.acquire(match_id).await?;
        let result = self.resume_locked(match_id, requester_id).await;
        self.locker.release(&lease).await;
        result
    }

    async fn resume_locked(
        &self,
        match_id: &str,
        requester_id: &str,
    ) -> Result<ResumeSnapshot, MatchServiceError> {
        let mut m = self.recovery.load(match_id).await?;
        if m.side_of(requester_id).is_none() {
            return Err(MatchServiceError::NotAParticipant {
                match_id: match_id.to_string(),
                player_id: requester_id.to_string(),
            });
        }
        if !m.is_live() {
            return Ok(snapshot(&m, None));
        }

        let new_key = MatchKey::generate();
        m.rotate_key(new_key.clone(), self.time.now(), self.grace);
        self.recovery.save(&m).await?;

        info!(match_id, player_id = requester_id, "Match key rotated on resume");
        Ok(snapshot(&m, Some(new_key)))
    }

    /// Read-only; takes no lease.
    pub async fn events_since(
        &self,
        match_id: &str,
        after_sequence: u64,
    ) -> Result<EventPage, MatchServiceError> {
        if self.matches.get_match(match_id).await?.is_none() {
            return Err(MatchServiceError::MatchNotFound(match_id.to_string()));
        }
        let events = self.events.events_after(match_id, after_sequence).await?;
        Ok(EventPage {
            match_id: match_id.to_string(),
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_event::{MatchEvent, MatchEventKind};
    use crate::models::match_state::{MatchOutcome, MatchStatus, TerminationReason};
    use crate::models::queue::TimeControl;
    use crate::models::side::Side;
    use crate::repositories::memory::{
        InMemoryEventRepository, InMemoryLockRepository, InMemoryMatchRepository,
        RecordingRatingTrigger,
    };
    use crate::services::recovery_service::next_event;
    use crate::services::time_source::ManualTimeSource;
    use chrono::Utc;

    struct Fixture {
        matches: Arc<InMemoryMatchRepository>,
        events: Arc<InMemoryEventRepository>,
        recovery: RecoveryService,
        time: Arc<ManualTimeSource>,
        service: ResumeService,
        original_key: MatchKey,
    }

    async fn fixture() -> Fixture {
        let time = Arc::new(ManualTimeSource::new(Utc::now()));
        let matches = Arc::new(InMemoryMatchRepository::new());
        let events = Arc::new(InMemoryEventRepository::new());
        let original_key = MatchKey::generate();
        let m = Match::new(
            "m1".to_string(),
            "white-id",
            "black-id",
            TimeControl::new(180_000, 2_000, 0),
            false,
            original_key.clone(),
            time.now(),
        );
        matches.create_match(&m).await.unwrap();

        let recovery = RecoveryService::new(
            matches.clone(),
            events.clone(),
            Arc::new(RecordingRatingTrigger::new()),
        );
        let locker = MatchLocker::new(
            Arc::new(InMemoryLockRepository::new()),
            time.clone(),
            5_000,
            3,
            std::time::Duration::from_millis(1),
        );
        let service = ResumeService::new(
            locker,
            recovery.clone(),
            matches.clone(),
            events.clone(),
            time.clone(),
            Duration::seconds(30),
        );

        Fixture {
            matches,
            events,
            recovery,
            time,
            service,
            original_key,
        }
    }

    #[tokio::test]
    async fn test_resume_rotates_key_with_grace_window() {
        let f = fixture().await;

        let snap = f.service.resume("m1", "black-id").await.unwrap();

        assert_eq!(snap.last_sequence, 0);
        assert_eq!(snap.status, MatchStatus::Live);
        let new_key = snap.new_match_key.expect("live match gets a new key");
        let payload = "1|e2e4|fen|1|1";
        let old_sig = f.original_key.sign(payload).unwrap();
        let new_sig = new_key.sign(payload).unwrap();

        let stored = f.matches.stored("m1").await.unwrap();
        let now = f.time.now();
        assert!(stored.verify_signature(payload, &new_sig, now));
        assert!(stored.verify_signature(payload, &old_sig, now + Duration::seconds(29)));
        assert!(!stored.verify_signature(payload, &old_sig, now + Duration::seconds(30)));
    }

    #[tokio::test]
    async fn test_resume_of_finished_match_keeps_key() {
        let f = fixture().await;
        let mut m = f.recovery.load("m1").await.unwrap();
        let abort = MatchEvent {
            outcome: Some(MatchOutcome::aborted()),
            ..next_event(&m, MatchEventKind::Abort, None, f.time.now())
        };
        f.recovery.commit(&mut m, abort).await.unwrap();

        let snap = f.service.resume("m1", "white-id").await.unwrap();

        assert!(snap.new_match_key.is_none());
        assert_eq!(snap.status, MatchStatus::Aborted);
        assert_eq!(
            snap.outcome.map(|o| o.reason),
            Some(TerminationReason::AdminAction)
        );
    }

    #[tokio::test]
    async fn test_resume_requires_participant() {
        let f = fixture().await;
        let result = f.service.resume("m1", "spectator").await;

        assert!(matches!(
            result,
            Err(MatchServiceError::NotAParticipant { .. })
        ));
    }

    #[tokio::test]
    async fn test_events_since_returns_tail_of_log() {
        let f = fixture().await;
        let mut m = f.recovery.load("m1").await.unwrap();
        let resign = MatchEvent {
            outcome: Some(MatchOutcome::win(Side::Black, TerminationReason::Resignation)),
            ..next_event(&m, MatchEventKind::Resignation, Some(Side::White), f.time.now())
        };
        f.recovery.commit(&mut m, resign).await.unwrap();

        let all = f.service.events_since("m1", 0).await.unwrap();
        assert_eq!(all.events.len(), 1);
        assert!(f.service.events_since("m1", 1).await.unwrap().events.is_empty());
        assert_eq!(f.events.all_events("m1").await.len(), 1);

        assert!(matches!(
            f.service.events_since("nope", 0).await,
            Err(MatchServiceError::MatchNotFound(_))
        ));
    }
}
