use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::scoring::rules::{RuleSetSummary, RulesHandle};
use crate::storage::{StoryDatabase, StoryStats};

#[derive(Clone)]
pub struct AppState {
    pub db: StoryDatabase,
    pub rules: Arc<RulesHandle>,
}

impl AppState {
    pub fn new(db: StoryDatabase, rules: Arc<RulesHandle>) -> Self {
        Self { db, rules }
    }
}

#[derive(Debug, Serialize)]
pub struct RulesResp {
    pub version: u64,
    #[serde(flatten)]
    pub summary: RuleSetSummary,
}

/// Admin router. `/metrics` is mounted only when a Prometheus handle is given.
pub fn router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/stats", get(stats))
        .route("/rules", get(rules))
        .route("/rules/reload", post(reload_rules))
        .with_state(state);

    match metrics {
        Some(handle) => api.merge(crate::metrics::router(handle)),
        None => api,
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<StoryStats>, (StatusCode, String)> {
    state.db.blocking(|db| db.stats()).await.map(Json).map_err(|e| {
        tracing::warn!(error = ?e, "stats query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })
}

async fn rules(State(state): State<AppState>) -> Json<RulesResp> {
    Json(RulesResp {
        version: state.rules.version(),
        summary: state.rules.snapshot().summary(),
    })
}

async fn reload_rules(State(state): State<AppState>) -> Json<RulesResp> {
    let fresh = state.rules.reload();
    Json(RulesResp {
        version: state.rules.version(),
        summary: fresh.summary(),
    })
}
