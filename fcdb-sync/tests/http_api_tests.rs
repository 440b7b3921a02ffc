//! HTTP API integration tests
//!
//! Drives the router with `oneshot` against in-memory SQLite and a scripted
//! provider.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use fcdb_common::events::EventBus;
use fcdb_sync::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

/// Router over a fresh database and `provider`
async fn test_app(provider: FakeProvider) -> (Router, SqlitePool) {
    let pool = memory_pool().await;
    let pipeline = pipeline(&pool, Arc::new(provider));
    let state = AppState::new(pool.clone(), Arc::new(pipeline), EventBus::new(100));
    (build_router(state), pool)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn epl_provider() -> FakeProvider {
    FakeProvider::new().with_json("metadata", json!([{ "id": 1, "name": "LeagueName_EPL" }]))
}

#[tokio::test]
async fn test_health_reports_module_and_dictionary() {
    let (app, pool) = test_app(FakeProvider::new()).await;
    seed_dictionary(&pool, &[("TeamName_1", "Arsenal")]).await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fcdb-sync");
    assert_eq!(body["dictionary_entries"], 1);
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_trigger_league_sync() {
    let (app, pool) = test_app(epl_provider()).await;
    seed_dictionary(&pool, &[("LeagueName_EPL", "English Premier League")]).await;

    let (status, body) = send(&app, post("/sync/leagues", Body::empty())).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["state"], "DONE");
    assert_eq!(body["leaguesProcessed"], 1);
    assert_eq!(body["leaguesUpserted"], 1);
    assert_eq!(body["translated"], 1);

    let (status, record) = send(&app, get("/records/leagues/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["displayName"], "English Premier League");
    assert_eq!(record["localizationKeyName"], "LeagueName_EPL");
}

#[tokio::test]
async fn test_trigger_with_mode_body() {
    let (app, _pool) = test_app(epl_provider()).await;

    let (status, body) = send(&app, post("/sync/leagues", r#"{"mode":"test"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "test");
}

#[tokio::test]
async fn test_unknown_target_is_404() {
    let (app, _pool) = test_app(FakeProvider::new()).await;

    let (status, body) = send(&app, post("/sync/players", Body::empty())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let (app, _pool) = test_app(epl_provider()).await;

    let (status, _) = send(&app, post("/sync/leagues", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post("/sync/leagues", r#"{"mode":"partial"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zero_max_pages_is_400() {
    let (app, _pool) = test_app(epl_provider()).await;

    for target in ["/sync/leagues", "/sync/metadata"] {
        let (status, body) = send(&app, post(target, r#"{"maxPages":0}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", target);
        assert_eq!(body["errorKind"], "invalid_request");
        assert_eq!(body["failedIn"], "FETCHING");
    }
}

#[tokio::test]
async fn test_provider_sentinel_is_502_and_recorded() {
    let (app, pool) = test_app(FakeProvider::new().with_body("metadata", None, "error")).await;

    let (status, body) = send(&app, post("/sync/leagues", Body::empty())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["failedIn"], "FETCHING");
    assert_eq!(body["errorKind"], "fetch");
    assert_eq!(body["committed"], 0);
    assert_eq!(
        fcdb_sync::db::records::count_records(&pool, fcdb_sync::types::Family::League)
            .await
            .unwrap(),
        0
    );

    let (_, health) = send(&app, get("/health")).await;
    assert!(health["last_error"].as_str().unwrap().contains("FETCHING"));
}

#[tokio::test]
async fn test_run_history_endpoints() {
    let (app, _pool) = test_app(epl_provider()).await;

    let (_, first) = send(&app, post("/sync/leagues", Body::empty())).await;
    let (_, second) = send(&app, post("/sync/leagues", Body::empty())).await;

    let (status, runs) = send(&app, get("/sync/runs?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["runId"], second["runId"]);

    let run_id = first["runId"].as_str().unwrap();
    let (status, run) = send(&app, get(&format!("/sync/runs/{}", run_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["state"], "DONE");
    assert_eq!(run["target"], "leagues");

    let (status, _) = send(&app, get("/sync/runs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        get("/sync/runs/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_localization_import_then_lookup() {
    let (app, _pool) = test_app(FakeProvider::new()).await;

    let import = json!({
        "source": "ai-translation",
        "entries": [
            { "key": "TeamName_1", "value": "Arsenal" },
            { "key": "TeamName_2", "value": "Chelsea" }
        ]
    });
    let (status, body) = send(&app, post("/localization/import", import.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 2);
    assert_eq!(body["source"], "ai-translation");

    let (status, entry) = send(&app, get("/localization/TeamName_2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["value"], "Chelsea");
    assert_eq!(entry["source"], "ai-translation");

    let (status, _) = send(&app, get("/localization/TeamName_3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_localization_import_rejects_bad_batches() {
    let (app, _pool) = test_app(FakeProvider::new()).await;

    let (status, _) = send(&app, post("/localization/import", r#"{"entries":[]}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let blank = json!({ "entries": [{ "key": "TeamName_1", "value": "  " }] });
    let (status, _) = send(&app, post("/localization/import", blank.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, default_source) = send(
        &app,
        post(
            "/localization/import",
            json!({ "entries": [{ "key": "K", "value": "V" }] }).to_string(),
        ),
    )
    .await;
    assert_eq!(default_source["source"], "import");
}

#[tokio::test]
async fn test_record_lookup_errors() {
    let (app, _pool) = test_app(FakeProvider::new()).await;

    let (status, _) = send(&app, get("/records/players/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/records/clubs/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/records/clubs/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
