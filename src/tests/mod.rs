use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::draft::phase::DraftFormat;
use crate::services::{history::SqliteHistoryStore, store::DocumentStore};

async fn test_app() -> (Router, Arc<DraftController>) {
    let store = DocumentStore::connect("sqlite::memory:").await.expect("db");
    store.seed_defaults().await.expect("seed");
    let history = SqliteHistoryStore::new(store.pool().clone())
        .await
        .expect("history");
    let controller = Arc::new(
        DraftController::load(DraftFormat::Standard, store, Broadcaster::new(32))
            .await
            .expect("controller"),
    );

    let public_dir = std::env::temp_dir().join("draft-overlay-missing-public");
    let app = build_router(AppContext {
        controller: controller.clone(),
        history: Arc::new(history),
        public_dir,
    });
    (app, controller)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn fresh_draft_document_has_the_overlay_shape() {
    let (app, _) = test_app().await;
    let (status, body) = send(&app, get("/api/matchdraft")).await;

    assert_eq!(status, StatusCode::OK);
    let draft = &body["draftdata"];
    assert_eq!(draft["timer"], 60);
    assert_eq!(draft["timer_running"], false);
    assert_eq!(draft["current_phase"], 0);
    assert_eq!(draft["blueside"]["ban"].as_array().unwrap().len(), 5);
    assert_eq!(draft["redside"]["pick"][4]["hero"], "");
}

#[tokio::test]
async fn selecting_outside_the_active_phase_is_a_conflict() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/draft/select", json!({"slot": 0, "hero": "ling"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "phase_mismatch");
}

#[tokio::test]
async fn unknown_slot_is_a_bad_request() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/draft/select", json!({"slot": 20, "hero": "ling"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_slot");
}

#[tokio::test]
async fn select_then_status_reports_the_next_phase() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/draft/select", json!({"slot": 10, "hero": "fanny"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["advanced"], true);

    let (_, status_body) = send(&app, get("/api/draft/status")).await;
    assert_eq!(status_body["phase"]["index"], 1);
    assert_eq!(status_body["phase"]["side"], "red");
    assert_eq!(status_body["phase"]["slots"], json!([15]));
    assert_eq!(status_body["draftdata"]["timer_running"], true);
}

#[tokio::test]
async fn control_actions_drive_the_timer_and_phase() {
    let (app, controller) = test_app().await;

    let (status, _) = send(&app, post_json("/api/draft/control", json!({"action": "start"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(controller.snapshot().await.draftdata.timer_running);

    let (_, body) = send(
        &app,
        post_json("/api/draft/control", json!({"action": "nextPhase"})),
    )
    .await;
    assert_eq!(body["current_phase"], 1);

    let (_, body) = send(&app, post_json("/api/draft/control", json!({"action": "reset"}))).await;
    assert_eq!(body["current_phase"], 0);
    assert!(!controller.snapshot().await.draftdata.timer_running);
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/draft/control", json!({"action": "explode"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn posted_draft_beyond_last_phase_is_rejected() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/matchdraft", json!({"draftdata": {"current_phase": 25}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_phase");
}

#[tokio::test]
async fn legacy_draft_post_is_accepted() {
    let (app, controller) = test_app().await;
    let (status, _) = send(
        &app,
        post_json(
            "/api/matchdraft",
            json!({
                "draftdata": {
                    "timer": "45",
                    "timer_running": false,
                    "current_phase": "3",
                    "blueside": {"ban": [{"hero": "fanny"}, {}, {}, {}, {}], "pick": [{}, {}, {}, {}, {}]},
                    "redside": {"ban": [{}, {}, {}, {}, {}], "pick": [{}, {}, {}, {}, {}]}
                }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let draft = controller.snapshot().await.draftdata;
    assert_eq!(draft.timer, 45);
    assert_eq!(draft.current_phase, 3);
    assert_eq!(draft.blueside.ban[0].hero, "fanny");
}

#[tokio::test]
async fn roster_is_normalized_on_write() {
    let (app, _) = test_app().await;
    let roster = json!({
        "teamdata": {
            "blueteam": {"teamname": "Alpha", "score": 2, "logo": "", "playerlist": ["Kairi", {"Name": "Sanz"}]},
            "redteam": {"teamname": "Beta", "score": "1", "logo": "", "playerlist": []}
        }
    });
    let (status, _) = send(&app, post_json("/api/matchdata", roster)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/matchdata")).await;
    let players = body["teamdata"]["blueteam"]["playerlist"].as_array().unwrap();
    assert_eq!(players.len(), 5);
    assert_eq!(players[0], json!({"name": "Kairi"}));
    assert_eq!(players[1], json!({"name": "Sanz"}));
    assert_eq!(body["teamdata"]["blueteam"]["score"], "2");
}

#[tokio::test]
async fn oversized_roster_is_rejected() {
    let (app, _) = test_app().await;
    let roster = json!({
        "teamdata": {
            "blueteam": {"teamname": "Alpha", "playerlist": ["a", "b", "c", "d", "e", "f"]},
            "redteam": {"teamname": "Beta", "playerlist": []}
        }
    });
    let (status, body) = send(&app, post_json("/api/matchdata", roster)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn pass_through_documents_round_trip_and_signal() {
    let (app, controller) = test_app().await;
    let mut rx = controller.broadcaster().subscribe();

    let drawdata = json!({"drawdata": {"status": "done", "mode": "fixed", "result": "Broken Walls"}});
    let (status, _) = send(&app, post_json("/api/mapdraw", drawdata.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stored) = send(&app, get("/api/mapdraw")).await;
    assert_eq!(stored, drawdata);

    let frame = rx.recv().await.unwrap();
    let signal: Value = serde_json::from_str(&frame.text).unwrap();
    assert_eq!(signal["type"], "mapdraw_update");
    assert_eq!(signal["data"]["result"], "Broken Walls");
}

#[tokio::test]
async fn notification_stores_video_and_triggers() {
    let (app, controller) = test_app().await;
    let mut rx = controller.broadcaster().subscribe();

    send(&app, post_json("/api/notification", json!({"videoId": "intro"}))).await;

    let (_, stored) = send(&app, get("/api/notification")).await;
    assert_eq!(stored["currentVideo"], "intro");
    assert!(stored["timestamp"].as_i64().unwrap() > 0);

    let frame = rx.recv().await.unwrap();
    assert_eq!(&*frame.text, r#"{"type":"notification_trigger","videoId":"intro"}"#);
}

#[tokio::test]
async fn postgame_is_stored_without_a_signal() {
    let (app, controller) = test_app().await;
    let mut rx = controller.broadcaster().subscribe();

    let (status, _) = send(&app, post_json("/api/postgame", json!([{"player": "Kairi", "kda": "7/0/3"}]))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(rx.try_recv().is_err());

    let (_, stored) = send(&app, get("/api/postgame")).await;
    assert_eq!(stored[0]["player"], "Kairi");
}

#[tokio::test]
async fn archive_then_browse_history() {
    let (app, _) = test_app().await;
    let roster = json!({
        "teamdata": {
            "blueteam": {"teamname": "Alpha", "score": "2", "playerlist": []},
            "redteam": {"teamname": "Beta", "score": "1", "playerlist": []}
        }
    });
    send(&app, post_json("/api/matchdata", roster)).await;
    send(
        &app,
        post_json("/api/draft/select", json!({"slot": 10, "hero": "/Assets/HeroPick/phoveus.png"})),
    )
    .await;

    let (status, report) = send(&app, post_json("/api/archive-draft?reset=true", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["draftId"], "Draft3_AlphaVSBeta");
    assert_eq!(report["reset"], true);

    let (_, previous) = send(&app, get("/api/previousdraft")).await;
    assert_eq!(previous["draftdata"]["blueside"]["ban"][0]["hero"], "/Assets/HeroPick/phoveus.png");

    let (_, current) = send(&app, get("/api/matchdraft")).await;
    assert_eq!(current["draftdata"]["current_phase"], 0);

    let (_, list) = send(&app, get("/api/match-drafts?limit=5")).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["drafts"][0]["id"], "Draft3_AlphaVSBeta");

    let (status, entry) = send(&app, get("/api/match-drafts/Draft3_AlphaVSBeta")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["draft"]["draftdata"]["Alpha"]["ban"][0]["hero"], "phoveus");

    let delete = Request::delete("/api/match-drafts/Draft3_AlphaVSBeta")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/api/match-drafts/Draft3_AlphaVSBeta")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn analyzer_control_is_broadcast() {
    let (app, controller) = test_app().await;
    let mut rx = controller.broadcaster().subscribe();

    let (_, body) = send(&app, post_json("/api/analyzer-control", json!({"action": "switch_camp"}))).await;
    assert_eq!(body["message"], "Analyzer command switch_camp sent");

    let frame = rx.recv().await.unwrap();
    assert_eq!(&*frame.text, r#"{"type":"analyzer_control","action":"switch_camp"}"#);
}
