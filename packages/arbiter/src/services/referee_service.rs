use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::match_event::{position_fingerprint, MatchEvent, MatchEventKind};
use crate::models::match_state::{Match, MatchOutcome, TerminationReason};
use crate::models::requests::{MoveSubmission, ResignRequest};
use crate::models::responses::{
    ClaimOutcome, MoveAccepted, RejectionReason, ResignOutcome, SubmitOutcome,
};
use crate::models::side::Side;
use crate::services::clock::{ClockAuthority, TickOutcome};
use crate::services::errors::match_service_errors::MatchServiceError;
use crate::services::errors::rules_engine_errors::RulesEngineError;
use crate::services::match_lock::MatchLocker;
use crate::services::recovery_service::{next_event, RecoveryService};
use crate::services::rules_engine::{GameRulesEngine, PositionStatus};
use crate::services::time_source::TimeSource;

/// Authenticates, sequences, validates and clocks every move of a match.
#[derive(Clone)]
pub struct RefereeService {
    locker: MatchLocker,
    recovery: RecoveryService,
    rules: Arc<dyn GameRulesEngine>,
    clock: ClockAuthority,
    time: Arc<dyn TimeSource>,
}

fn rule_outcome(status: PositionStatus) -> Option<MatchOutcome> {
    match status {
        PositionStatus::Ongoing => None,
        PositionStatus::Checkmate { winner } => {
            Some(MatchOutcome::win(winner, TerminationReason::Checkmate))
        }
        PositionStatus::Stalemate | PositionStatus::InsufficientMaterial => {
            Some(MatchOutcome::draw(TerminationReason::RuleDraw))
        }
    }
}

fn sequence_check(m: &Match, claimed: u64) -> Result<(), RejectionReason> {
    let expected = m.last_sequence + 1;
    if claimed != expected {
        return Err(RejectionReason::SequenceConflict {
            expected,
            received: claimed,
        });
    }
    Ok(())
}

impl RefereeService {
    pub fn new(
        locker: MatchLocker,
        recovery: RecoveryService,
        rules: Arc<dyn GameRulesEngine>,
        clock: ClockAuthority,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        RefereeService {
            locker,
            recovery,
            rules,
            clock,
            time,
        }
    }

    pub async fn submit(
        &self,
        match_id: &str,
        submission: &MoveSubmission,
    ) -> Result<SubmitOutcome, MatchServiceError> {
        let lease = self.locker.acquire(match_id).await?;
        let result = self.submit_locked(match_id, submission).await;
        self.locker.release(&lease).await;

        if let Ok(SubmitOutcome::Rejected { reason }) = &result {
            info!(match_id, seq = submission.sequence, reason = %reason, "Move rejected");
        }
        result
    }

    async fn submit_locked(
        &self,
        match_id: &str,
        submission: &MoveSubmission,
    ) -> Result<SubmitOutcome, MatchServiceError> {
        let mut m = self.recovery.load(match_id).await?;
        if !m.is_live() {
            return Ok(rejected(RejectionReason::MatchNotLive));
        }

        let now = self.time.now();
        if !m.verify_signature(&submission.canonical_payload(), &submission.signature, now) {
            return Ok(rejected(RejectionReason::BadSignature));
        }
        if let Err(reason) = sequence_check(&m, submission.sequence) {
            return Ok(rejected(reason));
        }
        if submission.side != m.side_to_move {
            return Ok(rejected(RejectionReason::NotYourTurn));
        }

        let position_after = match self.rules.apply_move(&m.last_position, &submission.uci) {
            Ok(position) => position,
            Err(RulesEngineError::IllegalMove(detail)) => {
                return Ok(rejected(RejectionReason::IllegalMove { detail }));
            }
            Err(e) => return Err(e.into()),
        };
        if !self.rules.same_position(&position_after, &submission.fen) {
            return Ok(rejected(RejectionReason::IllegalMove {
                detail: "claimed position does not follow from the move".to_string(),
            }));
        }

        let client_ts = submission.client_timestamp.with_timezone(&Utc);
        let mut event = MatchEvent {
            move_uci: Some(submission.uci.clone()),
            claimed_white_clock_ms: Some(submission.white_clock_ms),
            claimed_black_clock_ms: Some(submission.black_clock_ms),
            client_timestamp: Some(client_ts),
            signature: Some(submission.signature.clone()),
            ..next_event(&m, MatchEventKind::Move, Some(submission.side), now)
        };

        match self
            .clock
            .tick(&m.clock_state(), submission.side, now, Some(client_ts))
        {
            TickOutcome::Timeout { side, clock } => {
                let outcome = MatchOutcome::win(side.opponent(), TerminationReason::Timeout);
                event.kind = MatchEventKind::Timeout;
                event.valid = false;
                event.white_clock_ms = clock.white_ms;
                event.black_clock_ms = clock.black_ms;
                event.outcome = Some(outcome);

                warn!(match_id, side = %side, "Flag fell on submitted move");
                self.recovery.commit(&mut m, event).await?;
                Ok(SubmitOutcome::Timeout { side, outcome })
            }
            TickOutcome::Updated { clock, drift_ms } => {
                let outcome = rule_outcome(self.rules.classify(&position_after)?);
                event.fingerprint = position_fingerprint(&position_after);
                event.position_after = position_after;
                event.white_clock_ms = clock.white_ms;
                event.black_clock_ms = clock.black_ms;
                event.outcome = outcome;

                self.recovery.commit(&mut m, event).await?;
                debug!(match_id, seq = m.last_sequence, "Move accepted");

                Ok(SubmitOutcome::Accepted(MoveAccepted {
                    sequence: m.last_sequence,
                    position: m.last_position.clone(),
                    white_clock_ms: m.white_clock_ms,
                    black_clock_ms: m.black_clock_ms,
                    side_to_move: m.side_to_move,
                    drift_ms,
                    outcome,
                }))
            }
        }
    }

    /// Either side may resign while the match is live.
    pub async fn resign(
        &self,
        match_id: &str,
        request: &ResignRequest,
    ) -> Result<ResignOutcome, MatchServiceError> {
        let lease = self.locker.acquire(match_id).await?;
        let result = self.resign_locked(match_id, request).await;
        self.locker.release(&lease).await;
        result
    }

    async fn resign_locked(
        &self,
        match_id: &str,
        request: &ResignRequest,
    ) -> Result<ResignOutcome, MatchServiceError> {
        let mut m = self.recovery.load(match_id).await?;
        if !m.is_live() {
            return Ok(ResignOutcome::Rejected {
                reason: RejectionReason::MatchNotLive,
            });
        }

        let now = self.time.now();
        if !m.verify_signature(&request.canonical_payload(), &request.signature, now) {
            return Ok(ResignOutcome::Rejected {
                reason: RejectionReason::BadSignature,
            });
        }
        if let Err(reason) = sequence_check(&m, request.sequence) {
            return Ok(ResignOutcome::Rejected { reason });
        }

        let outcome = MatchOutcome::win(request.side.opponent(), TerminationReason::Resignation);
        let event = MatchEvent {
            signature: Some(request.signature.clone()),
            outcome: Some(outcome),
            ..next_event(&m, MatchEventKind::Resignation, Some(request.side), now)
        };
        self.recovery.commit(&mut m, event).await?;

        info!(match_id, side = %request.side, "Player resigned");
        Ok(ResignOutcome::Resigned {
            sequence: m.last_sequence,
            outcome,
        })
    }

    /// Adjudicates a flag without a move. Only a player of the match may ask.
    pub async fn claim_timeout(
        &self,
        match_id: &str,
        requester_id: &str,
    ) -> Result<ClaimOutcome, MatchServiceError> {
        let lease = self.locker.acquire(match_id).await?;
        let result = self.claim_timeout_locked(match_id, requester_id).await;
        self.locker.release(&lease).await;
        result
    }

    async fn claim_timeout_locked(
        &self,
        match_id: &str,
        requester_id: &str,
    ) -> Result<ClaimOutcome, MatchServiceError> {
        let mut m = self.recovery.load(match_id).await?;
        if m.side_of(requester_id).is_none() {
            return Err(MatchServiceError::NotAParticipant {
                match_id: match_id.to_string(),
                player_id: requester_id.to_string(),
            });
        }
        if !m.is_live() {
            return Ok(ClaimOutcome::Rejected {
                reason: RejectionReason::MatchNotLive,
            });
        }

        let now = self.time.now();
        let side: Side = m.side_to_move;
        let remaining_ms = self.clock.remaining_at(&m.clock_state(), side, now);
        if remaining_ms > 0 {
            return Ok(ClaimOutcome::Running { side, remaining_ms });
        }

        let outcome = MatchOutcome::win(side.opponent(), TerminationReason::Timeout);
        let mut event = next_event(&m, MatchEventKind::Timeout, Some(side), now);
        event.valid = false;
        match side {
            Side::White => event.white_clock_ms = 0,
            Side::Black => event.black_clock_ms = 0,
        }
        event.outcome = Some(outcome);
        self.recovery.commit(&mut m, event).await?;

        warn!(match_id, side = %side, claimed_by = requester_id, "Flag fell on claim");
        Ok(ClaimOutcome::Timeout { side, outcome })
    }
}

fn rejected(reason: RejectionReason) -> SubmitOutcome {
    SubmitOutcome::Rejected { reason }
}
