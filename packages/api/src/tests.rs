use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{app, AppState};
use arbiter::app::{InMemoryStores, Services};
use arbiter::config::{ServiceConfig, SigningKey};
use arbiter::models::MatchKey;
use arbiter::services::{SystemTimeSource, TokenService};

const SIGNING_KEY: &str = "api-test-signing-key-0123456789abcdef";
const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

struct Harness {
    server: TestServer,
    tokens: TokenService,
}

impl Harness {
    fn new() -> Self {
        let config = ServiceConfig::local(SigningKey::new(SIGNING_KEY).unwrap());
        let stores = InMemoryStores::new();
        let services = Services::build(stores.repositories(), &config, Arc::new(SystemTimeSource));
        let tokens = services.tokens.clone();
        let server = TestServer::new(app(AppState::from(services))).unwrap();
        Harness { server, tokens }
    }

    fn bearer(&self, user_id: &str, role: &str) -> String {
        self.tokens
            .issue_access_token(user_id, role, Duration::hours(1), Utc::now())
            .unwrap()
    }

    /// Queues two fresh players and returns (white, black, matched response).
    async fn start_match(&self) -> (String, String, Value) {
        let white = Uuid::new_v4().to_string();
        let black = Uuid::new_v4().to_string();

        let waiting = self
            .server
            .post("/v1/match/quick")
            .authorization_bearer(self.bearer(&white, "user"))
            .json(&json!({"tc": "5+3", "rated": false}))
            .await;
        waiting.assert_status_ok();
        assert_eq!(waiting.json::<Value>()["status"], "waiting");

        let matched = self
            .server
            .post("/v1/match/quick")
            .authorization_bearer(self.bearer(&black, "user"))
            .json(&json!({"tc": "5+3", "rated": false}))
            .await;
        matched.assert_status_ok();
        (white, black, matched.json::<Value>())
    }
}

fn signed_move(key: &MatchKey, seq: u64, uci: &str, fen: &str, side: &str) -> Value {
    let payload = format!("{}|{}|{}|{}|{}", seq, uci, fen, 300_000, 300_000);
    json!({
        "seq": seq,
        "uci": uci,
        "fen": fen,
        "msWhite": 300_000,
        "msBlack": 300_000,
        "tsClient": Utc::now().to_rfc3339(),
        "side": side,
        "sig": key.sign(&payload).unwrap(),
    })
}

#[tokio::test]
async fn test_health_check() {
    let harness = Harness::new();
    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_quickplay_requires_bearer_token() {
    let harness = Harness::new();
    let response = harness
        .server
        .post("/v1/match/quick")
        .json(&json!({"tc": "5+3", "rated": true}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quickplay_rejects_bad_time_control() {
    let harness = Harness::new();
    let player = Uuid::new_v4().to_string();
    let response = harness
        .server
        .post("/v1/match/quick")
        .authorization_bearer(harness.bearer(&player, "user"))
        .json(&json!({"tc": "blitz", "rated": true}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_player_is_matched_and_can_join() {
    let harness = Harness::new();
    let (white, black, matched) = harness.start_match().await;

    assert_eq!(matched["sides"]["white"], white.as_str());
    assert_eq!(matched["sides"]["black"], black.as_str());
    assert!(matched["matchKey"].is_string());
    let join_token = matched["joinToken"].as_str().unwrap().to_string();

    let joined = harness
        .server
        .post("/v1/match/join")
        .authorization_bearer(harness.bearer(&black, "user"))
        .json(&json!({"joinToken": join_token}))
        .await;
    joined.assert_status_ok();
    let body = joined.json::<Value>();
    assert_eq!(body["matchId"], matched["matchId"]);
    assert_eq!(body["side"], "black");

    let stolen = harness
        .server
        .post("/v1/match/join")
        .authorization_bearer(harness.bearer(&white, "user"))
        .json(&json!({"joinToken": join_token}))
        .await;
    stolen.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_append_accepts_signed_move_and_rejects_tampering() {
    let harness = Harness::new();
    let (_, _, matched) = harness.start_match().await;
    let match_id = matched["matchId"].as_str().unwrap();
    let key = MatchKey::from_base64(matched["matchKey"].as_str().unwrap()).unwrap();

    let edits = [
        ("seq", json!(2)),
        ("uci", json!("d2d4")),
        ("fen", json!("8/8/8/8/8/8/8/8 w - - 0 1")),
        ("msWhite", json!(400_000)),
        ("msBlack", json!(299_999)),
    ];
    for (field, value) in edits {
        let mut tampered = signed_move(&key, 1, "e2e4", AFTER_E4, "white");
        tampered[field] = value;
        let rejected = harness
            .server
            .post(&format!("/v1/match/{}/append", match_id))
            .json(&tampered)
            .await;
        rejected.assert_status_ok();
        let body = rejected.json::<Value>();
        assert_eq!(body["status"], "rejected", "field {}", field);
        assert_eq!(body["reason"]["code"], "badSignature", "field {}", field);
    }

    let accepted = harness
        .server
        .post(&format!("/v1/match/{}/append", match_id))
        .json(&signed_move(&key, 1, "e2e4", AFTER_E4, "white"))
        .await;
    accepted.assert_status_ok();
    let body = accepted.json::<Value>();
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["sequence"], 1);
    assert_eq!(body["sideToMove"], "black");
}

#[tokio::test]
async fn test_resume_rotates_key_for_participants_only() {
    let harness = Harness::new();
    let (white, _, matched) = harness.start_match().await;
    let match_id = matched["matchId"].as_str().unwrap();

    let outsider = harness
        .server
        .post(&format!("/v1/match/{}/resume", match_id))
        .authorization_bearer(harness.bearer(&Uuid::new_v4().to_string(), "user"))
        .await;
    outsider.assert_status(StatusCode::FORBIDDEN);

    let resumed = harness
        .server
        .post(&format!("/v1/match/{}/resume", match_id))
        .authorization_bearer(harness.bearer(&white, "user"))
        .await;
    resumed.assert_status_ok();
    let body = resumed.json::<Value>();
    assert_eq!(body["last_seq"], 0);
    assert_eq!(body["msW"], 300_000);
    assert!(body["matchKey_new"].is_string());
    assert_ne!(body["matchKey_new"], matched["matchKey"]);
}

#[tokio::test]
async fn test_admin_abort_requires_admin_role() {
    let harness = Harness::new();
    let (white, _, matched) = harness.start_match().await;
    let match_id = matched["matchId"].as_str().unwrap();
    let path = format!("/v1/admin/abort/{}", match_id);

    let player = harness
        .server
        .post(&path)
        .authorization_bearer(harness.bearer(&white, "user"))
        .await;
    player.assert_status(StatusCode::FORBIDDEN);

    let admin = harness
        .server
        .post(&path)
        .authorization_bearer(harness.bearer("ops-1", "admin"))
        .await;
    admin.assert_status_ok();
    let body = admin.json::<Value>();
    assert_eq!(body["status"], "aborted");
    assert_eq!(body["sequence"], 1);
}

#[tokio::test]
async fn test_events_of_unknown_match_is_not_found() {
    let harness = Harness::new();
    let user = Uuid::new_v4().to_string();
    let response = harness
        .server
        .get("/v1/match/does-not-exist/events?after=0")
        .authorization_bearer(harness.bearer(&user, "user"))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}
