// src/app.rs
//! Collection cycle: collect, score, persist, alert.

use anyhow::Result;
use metrics::{counter, gauge};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::ingest::types::Collector;
use crate::models::Story;
use crate::notify::{send_story_batch, AlertBudget, BatchSettings, Notifier};
use crate::scoring::PositiveScorer;
use crate::storage::StoryDatabase;

/// Totals of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub scanned: usize,
    pub positive: usize,
    pub new_saved: usize,
    pub sent: usize,
}

pub struct App {
    db: StoryDatabase,
    scorer: PositiveScorer,
    notifier: Arc<dyn Notifier>,
    collectors: Vec<Box<dyn Collector>>,
    settings: BatchSettings,
    budget: AlertBudget,
    interval: Duration,
}

impl App {
    pub fn new(
        config: &AppConfig,
        db: StoryDatabase,
        scorer: PositiveScorer,
        notifier: Arc<dyn Notifier>,
        collectors: Vec<Box<dyn Collector>>,
    ) -> Self {
        Self {
            db,
            scorer,
            notifier,
            collectors,
            settings: BatchSettings::new(config.min_impact_score, config.max_alerts_per_hour),
            budget: AlertBudget::per_hour(config.max_alerts_per_hour),
            interval: config.collection_interval(),
        }
    }

    /// Override the pause between two alerts (tests use zero).
    pub fn with_alert_spacing(mut self, spacing: Duration) -> Self {
        self.settings = self.settings.with_spacing(spacing);
        self
    }

    pub fn db(&self) -> &StoryDatabase {
        &self.db
    }

    pub fn scorer(&self) -> &PositiveScorer {
        &self.scorer
    }

    /// One full cycle over every available collector. Collector, storage
    /// and delivery failures are logged; the cycle keeps going.
    pub async fn collect_and_alert(&mut self) -> CycleReport {
        tracing::info!("starting collection cycle");
        let mut report = CycleReport::default();

        for collector in self.collectors.iter().filter(|c| c.is_available()) {
            let name = collector.name().to_string();
            let stories = match collector.collect().await {
                Ok(stories) => stories,
                Err(e) => {
                    tracing::warn!(error = ?e, collector = %name, "collector error");
                    continue;
                }
            };
            counter!("stories_collected_total").increment(stories.len() as u64);
            report.scanned += stories.len();
            tracing::info!(collector = %name, stories = stories.len(), "collected");

            let positive = self.scorer.process(stories);
            report.positive += positive.len();

            let fresh = self.db.blocking(move |db| Ok(insert_new(db, positive))).await;
            let mut fresh = match fresh {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::warn!(error = ?e, collector = %name, "error saving stories");
                    continue;
                }
            };
            counter!("stories_saved_total").increment(fresh.len() as u64);
            report.new_saved += fresh.len();
            tracing::info!(collector = %name, new = fresh.len(), "saved new positive stories");

            if fresh.is_empty() {
                continue;
            }
            let sent_ids = send_story_batch(
                self.notifier.as_ref(),
                &mut fresh,
                &self.settings,
                &mut self.budget,
            )
            .await;
            report.sent += sent_ids.len();
            let marked = self
                .db
                .blocking(move |db| {
                    for id in &sent_ids {
                        if let Err(e) = db.mark_as_sent(id) {
                            tracing::warn!(error = ?e, story_id = %id, "error marking story sent");
                        }
                    }
                    Ok(())
                })
                .await;
            if let Err(e) = marked {
                tracing::warn!(error = ?e, collector = %name, "error marking stories sent");
            }
        }

        gauge!("collect_cycle_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        match self.db.blocking(|db| db.stats()).await {
            Ok(stats) => tracing::info!(
                total = stats.total_stories,
                sent = stats.sent_alerts,
                pending = stats.pending_alerts,
                avg_impact = stats.avg_impact,
                "database stats"
            ),
            Err(e) => tracing::warn!(error = ?e, "error reading database stats"),
        }
        tracing::info!(
            scanned = report.scanned,
            positive = report.positive,
            new_saved = report.new_saved,
            sent = report.sent,
            "collection cycle complete"
        );
        report
    }

    pub async fn run_once(&mut self) -> Result<CycleReport> {
        Ok(self.collect_and_alert().await)
    }

    /// Run a cycle immediately, then every configured interval until
    /// `shutdown` resolves.
    pub async fn run_continuous<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            interval_minutes = self.interval.as_secs() / 60,
            "starting continuous monitoring"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping monitor");
                    break;
                }
                _ = ticker.tick() => {
                    self.collect_and_alert().await;
                }
            }
        }
    }
}

/// Save each story, returning only the ones that were not stored yet.
fn insert_new(db: &StoryDatabase, stories: Vec<Story>) -> Vec<Story> {
    let mut fresh = Vec::new();
    for story in stories {
        match db.save_story(&story) {
            Ok(true) => fresh.push(story),
            Ok(false) => {}
            Err(e) => tracing::warn!(
                error = ?e,
                story_id = story.id_or_placeholder(),
                "error saving story"
            ),
        }
    }
    fresh
}
