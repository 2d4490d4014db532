use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register help text for every series this service emits. Idempotent.
pub fn ensure_described() {
    DESCRIBED.get_or_init(|| {
        describe_counter!("stories_collected_total", "Stories returned by collectors");
        describe_counter!("stories_scored_total", "Stories classified and scored");
        describe_counter!("stories_positive_total", "Scored stories at or above the threshold");
        describe_counter!("stories_failed_total", "Stories dropped because scoring failed");
        describe_counter!("collector_feed_errors_total", "Feeds that failed to fetch or parse");
        describe_counter!("stories_saved_total", "Stories newly inserted into the database");
        describe_counter!("alerts_sent_total", "Stories delivered to the notifier");
        describe_counter!("alerts_failed_total", "Failed notifier deliveries");
        describe_counter!("rules_reloads_total", "Scoring lexicon reloads");
        describe_gauge!("collect_cycle_last_run_ts", "Unix time of the last finished cycle");
        describe_histogram!("collector_parse_ms", "Feed parse time in milliseconds");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        router(self.handle.clone())
    }
}

pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}
