use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::match_key::MatchKey;
use crate::models::match_state::Match;
use crate::models::queue::{PendingAssignment, QueueEntry, QueueKey, TimeControl};
use crate::models::responses::{
    EnqueueOutcome, LeaveOutcome, MatchCreated, PairOutcome, PairingResult, QuickplayOutcome,
    Sides,
};
use crate::models::side::Side;
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::queue_repository::QueueRepository;
use crate::services::errors::matchmaking_service_errors::MatchmakingServiceError;
use crate::services::time_source::TimeSource;
use crate::services::token_service::TokenService;

fn validate_player_id(player_id: &str) -> Result<(), MatchmakingServiceError> {
    Uuid::parse_str(player_id).map(|_| ()).map_err(|_| {
        MatchmakingServiceError::ValidationError(format!(
            "'{}' is not a valid player id",
            player_id
        ))
    })
}

#[derive(Clone)]
pub struct MatchmakingService {
    queue: Arc<dyn QueueRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    tokens: TokenService,
    time: Arc<dyn TimeSource>,
}

impl MatchmakingService {
    pub fn new(
        queue: Arc<dyn QueueRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        tokens: TokenService,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        MatchmakingService {
            queue,
            matches,
            tokens,
            time,
        }
    }

    pub async fn enqueue(
        &self,
        key: QueueKey,
        player_id: &str,
    ) -> Result<EnqueueOutcome, MatchmakingServiceError> {
        validate_player_id(player_id)?;

        let entry = QueueEntry::new(key, player_id, self.time.now());
        if self.queue.enqueue_if_absent(&entry).await? {
            info!(player_id, queue = %key, "Player joined queue");
            Ok(EnqueueOutcome::Queued)
        } else {
            debug!(player_id, queue = %key, "Player already queued");
            Ok(EnqueueOutcome::AlreadyQueued)
        }
    }

    pub async fn leave(
        &self,
        key: QueueKey,
        player_id: &str,
    ) -> Result<LeaveOutcome, MatchmakingServiceError> {
        validate_player_id(player_id)?;

        if self.queue.leave_queue(&key, player_id).await? {
            info!(player_id, queue = %key, "Player left queue");
            Ok(LeaveOutcome::Left)
        } else {
            Ok(LeaveOutcome::NotQueued)
        }
    }

    /// Takes the two longest-waiting players off the queue. A player can never be
    /// paired with themselves: a duplicate pair goes back to the head of the queue.
    pub async fn pair(&self, key: QueueKey) -> Result<PairOutcome, MatchmakingServiceError> {
        let Some((first, second)) = self.queue.pop_two(&key).await? else {
            return Ok(PairOutcome::NoPairAvailable);
        };

        if first.player_id == second.player_id {
            warn!(
                player_id = %first.player_id,
                queue = %key,
                "Duplicate queue entry popped, returning it to the queue"
            );
            self.queue.push_front(&first).await?;
            return Ok(PairOutcome::NoPairAvailable);
        }

        for entry in [&first, &second] {
            if Uuid::parse_str(&entry.player_id).is_err() {
                return Err(MatchmakingServiceError::CorruptQueueEntry(format!(
                    "queue {} held player id '{}'",
                    key, entry.player_id
                )));
            }
        }

        Ok(PairOutcome::PairFound(PairingResult {
            white_id: first.player_id,
            black_id: second.player_id,
        }))
    }

    pub async fn create_match(
        &self,
        pairing: &PairingResult,
        time_control: TimeControl,
        rated: bool,
    ) -> Result<MatchCreated, MatchmakingServiceError> {
        if pairing.white_id == pairing.black_id {
            return Err(MatchmakingServiceError::ValidationError(
                "a match needs two different players".to_string(),
            ));
        }

        let now = self.time.now();
        let match_id = Uuid::new_v4().to_string();
        let m = Match::new(
            match_id.clone(),
            &pairing.white_id,
            &pairing.black_id,
            time_control,
            rated,
            MatchKey::generate(),
            now,
        );
        self.matches.create_match(&m).await?;

        for side in [Side::White, Side::Black] {
            let assignment = PendingAssignment::new(m.player(side), &match_id, side, now);
            self.queue.record_assignment(&assignment).await?;
        }

        info!(
            match_id = %match_id,
            white = %pairing.white_id,
            black = %pairing.black_id,
            time_control = %time_control,
            rated,
            "Match created"
        );

        self.seat_details(&m)
    }

    fn seat_details(&self, m: &Match) -> Result<MatchCreated, MatchmakingServiceError> {
        let now = self.time.now();
        let white_join_token =
            self.tokens
                .issue_join_token(&m.match_id, &m.white_id, Side::White, now)?;
        let black_join_token =
            self.tokens
                .issue_join_token(&m.match_id, &m.black_id, Side::Black, now)?;

        Ok(MatchCreated {
            match_id: m.match_id.clone(),
            sides: Sides {
                white: m.white_id.clone(),
                black: m.black_id.clone(),
            },
            match_key: m.match_key.clone(),
            white_join_token,
            black_join_token,
        })
    }

    /// The live match a player was seated in, if any. Assignments to matches that
    /// have ended are dropped on the way.
    pub async fn live_assignment(
        &self,
        player_id: &str,
    ) -> Result<Option<MatchCreated>, MatchmakingServiceError> {
        let Some(assignment) = self.queue.pending_assignment(player_id).await? else {
            return Ok(None);
        };

        match self.matches.get_match(&assignment.match_id).await? {
            Some(m) if m.is_live() => {
                debug!(player_id, match_id = %m.match_id, "Returning existing seat");
                self.seat_details(&m).map(Some)
            }
            _ => {
                self.queue
                    .clear_assignment(player_id, &assignment.match_id)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Returns the caller's seat if they already sit in a live match. Otherwise
    /// enqueue, try to pair, and start the match if a pair is found.
    pub async fn quickplay(
        &self,
        player_id: &str,
        descriptor: &str,
        rated: bool,
    ) -> Result<QuickplayOutcome, MatchmakingServiceError> {
        let time_control: TimeControl = descriptor.parse()?;
        let key = QueueKey::new(time_control, rated);

        // A seated player is not queued again until their match ends.
        if let Some(created) = self.live_assignment(player_id).await? {
            return Ok(QuickplayOutcome::Matched(created));
        }

        self.enqueue(key, player_id).await?;

        let pairing = match self.pair(key).await? {
            PairOutcome::PairFound(pairing) => pairing,
            PairOutcome::NoPairAvailable => return Ok(QuickplayOutcome::Waiting),
        };

        let created = self.create_match(&pairing, time_control, rated).await?;
        if created.join_token_for(player_id).is_none() {
            // Two earlier arrivals were paired by this call. Both pick up their seats on
            // their next quickplay; the caller keeps waiting.
            info!(
                player_id,
                match_id = %created.match_id,
                "Paired other players, caller still queued"
            );
            return Ok(QuickplayOutcome::Waiting);
        }
        Ok(QuickplayOutcome::Matched(created))
    }
}
