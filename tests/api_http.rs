// tests/api_http.rs
//
// HTTP-level tests for the admin Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::{fs, sync::Arc};

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use cyber_good_news::api::{self, AppState};
use cyber_good_news::scoring::{RuleSet, RulesHandle};
use cyber_good_news::storage::StoryDatabase;
use cyber_good_news::Story;

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(db: StoryDatabase, rules: Arc<RulesHandle>) -> Router {
    api::router(AppState::new(db, rules), None)
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router(
        StoryDatabase::open_in_memory().unwrap(),
        Arc::new(RulesHandle::fixed(RuleSet::builtin())),
    );
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "OK");
}

#[tokio::test]
async fn stats_reflect_database() {
    let db = StoryDatabase::open_in_memory().unwrap();
    let mut s = Story::new("a", "Gang arrested", "", "Src", "https://x", chrono::Utc::now());
    s.impact_score = 7.0;
    db.save_story(&s).unwrap();
    db.mark_as_sent("a").unwrap();

    let app = test_router(db, Arc::new(RulesHandle::fixed(RuleSet::builtin())));
    let resp = app
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["total_stories"], 1);
    assert_eq!(v["sent_alerts"], 1);
    assert_eq!(v["pending_alerts"], 0);
    assert_eq!(v["avg_impact"], 7.0);
}

#[tokio::test]
async fn rules_summary_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    fs::write(
        &path,
        r#"
[positive_signals]
keywords = ["patched"]

[positive_categories."Security Wins"]
keywords = ["patched"]
"#,
    )
    .unwrap();

    let rules = Arc::new(RulesHandle::from_path(&path));
    let app = test_router(StoryDatabase::open_in_memory().unwrap(), rules.clone());

    let resp = app
        .clone()
        .oneshot(Request::get("/rules").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let v = read_json(resp).await;
    assert_eq!(v["categories"], serde_json::json!(["Security Wins"]));
    assert_eq!(v["positive_signals"], 1);
    assert_eq!(v["version"], 1);

    fs::write(
        &path,
        r#"
[positive_signals]
keywords = ["patched", "released"]

[positive_categories."Security Wins"]
keywords = ["patched"]

[positive_categories."Open Source & Tools"]
keywords = ["released"]
"#,
    )
    .unwrap();

    let resp = app
        .oneshot(
            Request::post("/rules/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(
        v["categories"],
        serde_json::json!(["Security Wins", "Open Source & Tools"])
    );
    assert_eq!(v["version"], 2);
    assert_eq!(rules.snapshot().positive_signals.keywords.len(), 2);
}

#[tokio::test]
async fn metrics_route_absent_without_handle() {
    let app = test_router(
        StoryDatabase::open_in_memory().unwrap(),
        Arc::new(RulesHandle::fixed(RuleSet::builtin())),
    );
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
