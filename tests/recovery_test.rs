mod common;

use arbiter::models::responses::{RejectionReason, SubmitOutcome};
use arbiter::models::{MatchStatus, Side};
use arbiter::services::errors::match_service_errors::MatchServiceError;
use common::{signed_move, signed_resign, World, AFTER_E4, AFTER_E4_E5};

#[tokio::test]
async fn test_row_catches_up_after_crash_between_append_and_update() {
    let world = World::new();
    let started = world.start_match("5+3", false).await;
    let referee = &world.services.referee;

    world.stores.matches.fail_next_updates(1);
    world.advance(2_000);
    let first = signed_move(&started.key, 1, "e2e4", AFTER_E4, Side::White, world.now());
    let result = referee.submit(started.id(), &first).await;
    assert!(matches!(result, Err(MatchServiceError::RepositoryError(_))));

    // The log has the move, the row does not.
    assert_eq!(world.stores.events.all_events(started.id()).await.len(), 1);
    let behind = world.stores.matches.stored(started.id()).await.unwrap();
    assert_eq!(behind.last_sequence, 0);

    // Retrying the same move is a replay once the row has caught up.
    let retry = referee.submit(started.id(), &first).await.unwrap();
    assert_eq!(
        retry,
        SubmitOutcome::Rejected {
            reason: RejectionReason::SequenceConflict {
                expected: 2,
                received: 1
            }
        }
    );

    let caught_up = world.stores.matches.stored(started.id()).await.unwrap();
    assert_eq!(caught_up.last_sequence, 1);
    assert!(common::same_position(&caught_up.last_position, AFTER_E4));
    assert_eq!(caught_up.white_clock_ms, 301_000);
    assert_eq!(caught_up.side_to_move, Side::Black);

    world.advance(1_000);
    let reply = signed_move(&started.key, 2, "e7e5", AFTER_E4_E5, Side::Black, world.now());
    let SubmitOutcome::Accepted(accepted) = referee.submit(started.id(), &reply).await.unwrap()
    else {
        panic!("black's reply should be accepted after recovery");
    };
    assert_eq!(accepted.sequence, 2);
    assert_eq!(accepted.black_clock_ms, 302_000);
}

#[tokio::test]
async fn test_terminal_event_recovered_without_double_rating() {
    let world = World::new();
    let started = world.start_match("5+3", true).await;

    world.stores.matches.fail_next_updates(1);
    let result = world
        .services
        .referee
        .resign(started.id(), &signed_resign(&started.key, 1, Side::White))
        .await;
    assert!(result.is_err());
    assert_eq!(world.stores.rating.calls(), 1);

    let rebuilt = world.services.recovery.rebuild(started.id()).await.unwrap();

    assert_eq!(rebuilt.status, MatchStatus::Finished);
    let stored = world.stores.matches.stored(started.id()).await.unwrap();
    assert_eq!(stored.status, MatchStatus::Finished);
    assert_eq!(stored.last_sequence, 1);
    // The trigger fires again on replay; the job itself exists once.
    assert_eq!(world.stores.rating.calls(), 2);
    assert_eq!(world.stores.rating.jobs().await.len(), 1);
}

#[tokio::test]
async fn test_rating_outage_does_not_block_the_result() {
    let world = World::new();
    let started = world.start_match("5+3", true).await;
    world.stores.rating.set_unavailable(true);

    world
        .services
        .referee
        .resign(started.id(), &signed_resign(&started.key, 1, Side::Black))
        .await
        .unwrap();

    let stored = world.stores.matches.stored(started.id()).await.unwrap();
    assert_eq!(stored.status, MatchStatus::Finished);
    assert!(world.stores.rating.jobs().await.is_empty());
}

#[tokio::test]
async fn test_resume_sees_events_the_row_missed() {
    let world = World::new();
    let started = world.start_match("5+3", false).await;

    world.stores.matches.fail_next_updates(1);
    let first = signed_move(&started.key, 1, "e2e4", AFTER_E4, Side::White, world.now());
    assert!(world
        .services
        .referee
        .submit(started.id(), &first)
        .await
        .is_err());

    let snapshot = world
        .services
        .resume
        .resume(started.id(), &started.black)
        .await
        .unwrap();

    assert_eq!(snapshot.last_sequence, 1);
    assert!(common::same_position(&snapshot.fen, AFTER_E4));
    assert_eq!(snapshot.side_to_move, Side::Black);
}
