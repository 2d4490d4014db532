// src/notify/mod.rs
//! Outbound delivery of scored stories: top-N selection, spacing between
//! posts and a rolling hourly budget.

pub mod budget;
pub mod discord;

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use std::time::Duration;

pub use budget::AlertBudget;
pub use discord::DiscordNotifier;

use crate::models::Story;

/// Delivery channel for a single story.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_story(&self, story: &Story) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub min_score: f64,
    pub max_alerts: usize,
    /// Pause between two consecutive posts.
    pub spacing: Duration,
}

impl BatchSettings {
    pub fn new(min_score: f64, max_alerts: usize) -> Self {
        Self {
            min_score,
            max_alerts,
            spacing: Duration::from_secs(2),
        }
    }

    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = spacing;
        self
    }
}

/// Indices of eligible, unsent stories ordered by score (highest first,
/// input order on ties), capped at `limit`.
pub fn select_top(stories: &[Story], min_score: f64, limit: usize) -> Vec<usize> {
    let mut eligible: Vec<usize> = stories
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_sent && s.impact_score >= min_score)
        .map(|(i, _)| i)
        .collect();
    eligible.sort_by(|a, b| stories[*b].impact_score.total_cmp(&stories[*a].impact_score));
    eligible.truncate(limit);
    eligible
}

/// Send the best stories, marking each delivered one `is_sent` and charging
/// it to `budget`. Returns the ids that were delivered.
pub async fn send_story_batch(
    notifier: &dyn Notifier,
    stories: &mut [Story],
    settings: &BatchSettings,
    budget: &mut AlertBudget,
) -> Vec<String> {
    let limit = settings.max_alerts.min(budget.remaining(Utc::now()));
    let picked = select_top(stories, settings.min_score, limit);

    if picked.is_empty() {
        tracing::info!(
            min_score = settings.min_score,
            "no positive stories to send (none above threshold or budget spent)"
        );
        return Vec::new();
    }
    tracing::info!(count = picked.len(), "sending top positive stories");

    let mut sent = Vec::with_capacity(picked.len());
    for (n, idx) in picked.iter().enumerate() {
        if n > 0 && !settings.spacing.is_zero() {
            tokio::time::sleep(settings.spacing).await;
        }
        let story = &mut stories[*idx];
        match notifier.send_story(story).await {
            Ok(()) => {
                story.is_sent = true;
                budget.record_alert(Utc::now());
                counter!("alerts_sent_total").increment(1);
                tracing::info!(story_id = story.id_or_placeholder(), title = %story.title, "sent story");
                if let Some(id) = &story.id {
                    sent.push(id.clone());
                }
            }
            Err(e) => {
                counter!("alerts_failed_total").increment(1);
                tracing::warn!(
                    error = ?e,
                    story_id = story.id_or_placeholder(),
                    "error sending story"
                );
            }
        }
    }
    sent
}
