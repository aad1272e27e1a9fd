use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::models::match_event::{position_fingerprint, MatchEvent, MatchEventKind};
use crate::models::match_state::{Match, MatchResult};
use crate::models::side::Side;
use crate::repositories::event_repository::EventRepository;
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::rating_trigger::{RatingJob, RatingTrigger};
use crate::services::errors::match_service_errors::MatchServiceError;

/// Keeps the match row consistent with the event log.
///
/// The log is authoritative. Every commit appends first and then folds the event
/// into the row with [`Match::apply_event`]; replay after a crash runs the same fold
/// over whatever the row missed.
#[derive(Clone)]
pub struct RecoveryService {
    matches: Arc<dyn MatchRepository + Send + Sync>,
    events: Arc<dyn EventRepository + Send + Sync>,
    rating: Arc<dyn RatingTrigger + Send + Sync>,
}

impl RecoveryService {
    pub fn new(
        matches: Arc<dyn MatchRepository + Send + Sync>,
        events: Arc<dyn EventRepository + Send + Sync>,
        rating: Arc<dyn RatingTrigger + Send + Sync>,
    ) -> Self {
        RecoveryService {
            matches,
            events,
            rating,
        }
    }

    /// Loads the row and brings it up to date with the log.
    pub async fn load(&self, match_id: &str) -> Result<Match, MatchServiceError> {
        let mut m = self
            .matches
            .get_match(match_id)
            .await?
            .ok_or_else(|| MatchServiceError::MatchNotFound(match_id.to_string()))?;
        self.catch_up(&mut m).await?;
        Ok(m)
    }

    /// Replays log entries newer than the row and persists the result. Returns the
    /// number of events replayed. Must run under the match lease.
    pub async fn catch_up(&self, m: &mut Match) -> Result<usize, MatchServiceError> {
        let stored_sequence = m.last_sequence;
        let pending = self.events.events_after(&m.match_id, stored_sequence).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut terminal_replayed = false;
        for event in &pending {
            if event.sequence != m.last_sequence + 1 {
                return Err(corrupt(m, format!(
                    "expected sequence {}, found {}",
                    m.last_sequence + 1,
                    event.sequence
                )));
            }
            if !m.is_live() {
                return Err(corrupt(
                    m,
                    format!("event {} follows the end of the match", event.sequence),
                ));
            }
            m.apply_event(event);
            terminal_replayed |= event.is_terminal();
        }

        warn!(
            match_id = %m.match_id,
            from = stored_sequence,
            to = m.last_sequence,
            "Match row was behind its event log, replayed missing events"
        );

        if terminal_replayed {
            self.notify_rating(m).await;
        }
        self.matches.update_match(m, stored_sequence).await?;

        Ok(pending.len())
    }

    /// Rebuilds one match row from its log and stores it.
    pub async fn rebuild(&self, match_id: &str) -> Result<Match, MatchServiceError> {
        let m = self.load(match_id).await?;
        info!(match_id, last_sequence = m.last_sequence, "Match row rebuilt");
        Ok(m)
    }

    /// Appends `event`, folds it into `m` and stores the row. The event is durable
    /// before the row changes; the row write is a compare-and-swap on the sequence.
    pub async fn commit(&self, m: &mut Match, event: MatchEvent) -> Result<(), MatchServiceError> {
        let expected_sequence = m.last_sequence;

        self.events.append_event(&event).await?;
        m.apply_event(&event);

        if event.is_terminal() {
            info!(
                match_id = %m.match_id,
                result = ?m.result,
                reason = ?m.termination,
                "Match finished"
            );
            self.notify_rating(m).await;
        }

        self.matches.update_match(m, expected_sequence).await?;
        Ok(())
    }

    /// Stores a row change that has no log entry (key rotation).
    pub async fn save(&self, m: &Match) -> Result<(), MatchServiceError> {
        self.matches.update_match(m, m.last_sequence).await?;
        Ok(())
    }

    async fn notify_rating(&self, m: &Match) {
        if !m.rated || m.result == Some(MatchResult::Aborted) {
            return;
        }
        let Some(job) = RatingJob::from_match(m) else {
            return;
        };
        if let Err(e) = self.rating.on_match_finished(&job).await {
            // The job is keyed by match id; the next replay or a sweeper can retry it.
            error!(match_id = %m.match_id, error = %e, "Failed to trigger rating update");
        }
    }
}

fn corrupt(m: &Match, detail: String) -> MatchServiceError {
    error!(match_id = %m.match_id, detail = %detail, "Event log cannot be replayed");
    MatchServiceError::CorruptLog {
        match_id: m.match_id.clone(),
        detail,
    }
}

/// Skeleton of the next log entry: positions and clocks copied from the row,
/// no move and no outcome.
pub fn next_event(
    m: &Match,
    kind: MatchEventKind,
    side: Option<Side>,
    now: DateTime<Utc>,
) -> MatchEvent {
    MatchEvent {
        match_id: m.match_id.clone(),
        sequence: m.last_sequence + 1,
        kind,
        side,
        move_uci: None,
        position_before: m.last_position.clone(),
        position_after: m.last_position.clone(),
        claimed_white_clock_ms: None,
        claimed_black_clock_ms: None,
        white_clock_ms: m.white_clock_ms,
        black_clock_ms: m.black_clock_ms,
        client_timestamp: None,
        server_timestamp: now,
        signature: None,
        valid: true,
        fingerprint: position_fingerprint(&m.last_position),
        outcome: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_state::{MatchOutcome, MatchStatus, TerminationReason};
    use crate::models::{MatchKey, TimeControl};
    use crate::repositories::errors::rating_trigger_errors::RatingTriggerError;
    use crate::repositories::memory::{InMemoryEventRepository, InMemoryMatchRepository};
    use crate::repositories::rating_trigger::MockRatingTrigger;

    fn live_match(rated: bool) -> Match {
        Match::new(
            "m1".to_string(),
            "white",
            "black",
            TimeControl::new(60_000, 0, 0),
            rated,
            MatchKey::generate(),
            Utc::now(),
        )
    }

    async fn setup(
        m: &Match,
        rating: MockRatingTrigger,
    ) -> (
        Arc<InMemoryMatchRepository>,
        Arc<InMemoryEventRepository>,
        RecoveryService,
    ) {
        let matches = Arc::new(InMemoryMatchRepository::new());
        let events = Arc::new(InMemoryEventRepository::new());
        matches.create_match(m).await.unwrap();
        let service = RecoveryService::new(matches.clone(), events.clone(), Arc::new(rating));
        (matches, events, service)
    }

    fn resignation(m: &Match) -> MatchEvent {
        MatchEvent {
            outcome: Some(MatchOutcome::win(Side::Black, TerminationReason::Resignation)),
            ..next_event(m, MatchEventKind::Resignation, Some(Side::White), Utc::now())
        }
    }

    #[tokio::test]
    async fn test_commit_appends_then_updates_row() {
        let m = live_match(false);
        let mut rating = MockRatingTrigger::new();
        rating.expect_on_match_finished().never();
        let (matches, events, service) = setup(&m, rating).await;

        let mut working = m.clone();
        let event = next_event(&working, MatchEventKind::Resignation, Some(Side::White), Utc::now());
        service.commit(&mut working, event).await.unwrap();

        assert_eq!(events.all_events("m1").await.len(), 1);
        assert_eq!(matches.stored("m1").await.unwrap().last_sequence, 1);
    }

    #[tokio::test]
    async fn test_terminal_commit_triggers_rating_once_for_rated() {
        let m = live_match(true);
        let mut rating = MockRatingTrigger::new();
        rating
            .expect_on_match_finished()
            .withf(|job| job.match_id == "m1" && job.result == MatchResult::BlackWins)
            .times(1)
            .returning(|_| Ok(()));
        let (matches, _, service) = setup(&m, rating).await;

        let mut working = m.clone();
        let event = resignation(&working);
        service.commit(&mut working, event).await.unwrap();

        assert_eq!(
            matches.stored("m1").await.unwrap().status,
            MatchStatus::Finished
        );
    }

    #[tokio::test]
    async fn test_rating_failure_does_not_fail_commit() {
        let m = live_match(true);
        let mut rating = MockRatingTrigger::new();
        rating
            .expect_on_match_finished()
            .times(1)
            .returning(|_| Err(RatingTriggerError::Unavailable("down".to_string())));
        let (matches, _, service) = setup(&m, rating).await;

        let mut working = m.clone();
        let event = resignation(&working);
        service.commit(&mut working, event).await.unwrap();

        assert!(!matches.stored("m1").await.unwrap().is_live());
    }

    #[tokio::test]
    async fn test_catch_up_replays_events_missing_from_row() {
        let m = live_match(true);
        let mut rating = MockRatingTrigger::new();
        rating
            .expect_on_match_finished()
            .times(1)
            .returning(|_| Ok(()));
        let (matches, events, service) = setup(&m, rating).await;

        // Simulate a crash after the append: the log has the event, the row does not.
        events.append_event(&resignation(&m)).await.unwrap();

        let rebuilt = service.rebuild("m1").await.unwrap();

        assert_eq!(rebuilt.last_sequence, 1);
        assert_eq!(rebuilt.status, MatchStatus::Finished);
        let stored = matches.stored("m1").await.unwrap();
        assert_eq!(stored.last_sequence, 1);
        assert_eq!(stored.result, Some(MatchResult::BlackWins));
    }

    #[tokio::test]
    async fn test_catch_up_is_noop_when_row_is_current() {
        let m = live_match(false);
        let mut rating = MockRatingTrigger::new();
        rating.expect_on_match_finished().never();
        let (_, _, service) = setup(&m, rating).await;

        let mut working = m.clone();
        assert_eq!(service.catch_up(&mut working).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_gap_in_log_is_corruption() {
        let m = live_match(false);
        let mut rating = MockRatingTrigger::new();
        rating.expect_on_match_finished().never();
        let (_, events, service) = setup(&m, rating).await;

        let mut skipped = next_event(&m, MatchEventKind::Abort, None, Utc::now());
        skipped.sequence = 2;
        events.append_event(&skipped).await.unwrap();

        let result = service.load("m1").await;
        assert!(matches!(result, Err(MatchServiceError::CorruptLog { .. })));
    }

    #[tokio::test]
    async fn test_unknown_match_is_not_found() {
        let m = live_match(false);
        let (_, _, service) = setup(&m, MockRatingTrigger::new()).await;

        assert!(matches!(
            service.load("missing").await,
            Err(MatchServiceError::MatchNotFound(_))
        ));
    }
}
