// src/scoring/mod.rs
//! Positive-impact scoring: gates a story on its title, picks a category,
//! computes the 0–10 impact score and fills tags and summary.
//!
//! Order per story:
//! 1) classify (title gates, then category by keyword hits)
//! 2) impact score (base + modifiers − negative penalty, clamped)
//! 3) tags + summary

pub mod classify;
pub mod enrich;
pub mod impact;
pub mod rules;
pub mod signals;

use anyhow::{anyhow, Result};
use metrics::counter;
use std::path::PathBuf;
use std::sync::Arc;

pub use crate::scoring::classify::{classify, Classification, SignalCounts, Verdict};
pub use crate::scoring::rules::{RuleSet, RulesHandle};

use crate::models::Story;

pub const DEFAULT_MIN_IMPACT_SCORE: f64 = 5.0;

/// Scores batches of stories against the shared lexicon.
#[derive(Debug, Clone)]
pub struct PositiveScorer {
    rules: Arc<RulesHandle>,
    min_impact_score: f64,
}

impl PositiveScorer {
    pub fn new(rules: Arc<RulesHandle>, min_impact_score: f64) -> Self {
        Self {
            rules,
            min_impact_score,
        }
    }

    /// Lexicon from `path` (built-in fallback), default threshold.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(RulesHandle::from_path(path)),
            DEFAULT_MIN_IMPACT_SCORE,
        )
    }

    pub fn with_min_impact_score(mut self, min: f64) -> Self {
        self.min_impact_score = min;
        self
    }

    pub fn rules(&self) -> &Arc<RulesHandle> {
        &self.rules
    }

    pub fn min_impact_score(&self) -> f64 {
        self.min_impact_score
    }

    pub fn reload_rules(&self) -> Arc<RuleSet> {
        self.rules.reload()
    }

    /// Score every unprocessed story and return those at or above the
    /// threshold, in input order. Already-processed stories are skipped and
    /// never returned. A failing story is logged and left out.
    pub fn process_stories(&self, stories: &mut [Story]) -> Vec<Story> {
        let rules = self.rules.snapshot();
        let mut kept = Vec::new();

        for story in stories.iter_mut() {
            if story.is_processed {
                continue;
            }
            match analyze_story(story, &rules) {
                Ok(()) => {
                    counter!("stories_scored_total").increment(1);
                    if story.impact_score >= self.min_impact_score {
                        counter!("stories_positive_total").increment(1);
                        kept.push(story.clone());
                    }
                }
                Err(e) => {
                    counter!("stories_failed_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        story_id = story.id_or_placeholder(),
                        "error processing story"
                    );
                }
            }
        }

        tracing::debug!(
            scanned = stories.len(),
            kept = kept.len(),
            threshold = self.min_impact_score,
            "scored batch"
        );
        kept
    }

    /// Owned-batch convenience wrapper around [`Self::process_stories`].
    pub fn process(&self, mut stories: Vec<Story>) -> Vec<Story> {
        self.process_stories(&mut stories)
    }

    /// Classify and score one story in place with the current lexicon.
    pub fn analyze(&self, story: &mut Story) -> Result<Classification> {
        let rules = self.rules.snapshot();
        score_story(story, &rules)
    }
}

/// Classify, score and enrich `story` in place, then mark it processed.
pub fn analyze_story(story: &mut Story, rules: &RuleSet) -> Result<()> {
    score_story(story, rules).map(|_| ())
}

fn score_story(story: &mut Story, rules: &RuleSet) -> Result<Classification> {
    if story.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        return Err(anyhow!("story has no identifier (title: {:?})", story.title));
    }

    let classification = classify(story, rules);
    story.category = classification.category().to_string();

    match &classification.verdict {
        Verdict::Neutral | Verdict::Negative => {
            story.impact_score = 0.0;
        }
        Verdict::Accepted { category, base_score } => {
            let text = &classification.text;
            story.impact_score =
                impact::score(text, *base_score, classification.signals.neg_count, rules);
            story.tags = Some(enrich::extract_tags(text, rules));
            story.summary = Some(enrich::generate_summary(
                &story.description,
                category,
                &story.source,
                story.impact_score,
            ));
        }
    }

    story.is_processed = true;
    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scorer() -> PositiveScorer {
        PositiveScorer::new(Arc::new(RulesHandle::fixed(RuleSet::builtin())), 5.0)
    }

    fn story(id: &str, title: &str, description: &str) -> Story {
        Story::new(id, title, description, "Test", "https://t", Utc::now())
    }

    #[test]
    fn accepted_story_is_fully_populated() {
        let mut s = story("1", "Police arrested botnet operators", "Servers seized.");
        let c = scorer().analyze(&mut s).unwrap();
        assert!(c.is_accepted());
        assert!(s.is_processed);
        assert_eq!(s.category, "Security Wins");
        assert_eq!(s.impact_score, 7.0);
        assert_eq!(s.summary.as_deref(), Some("Servers seized."));
        let tags = s.tags.unwrap();
        assert!(tags.contains(&"arrested".to_string()));
        assert!(tags.contains(&"seized".to_string()));
    }

    #[test]
    fn rejected_story_keeps_empty_tags() {
        let mut s = story("1", "Data breach hits retailer", "");
        scorer().analyze(&mut s).unwrap();
        assert_eq!(s.category, "Neutral");
        assert_eq!(s.impact_score, 0.0);
        assert!(s.tags.is_none() && s.summary.is_none());
        assert!(s.is_processed);
    }

    #[test]
    fn missing_id_fails_without_aborting_batch() {
        let mut bad = story("x", "Gang arrested", "");
        bad.id = None;
        let good = story("2", "Gang arrested", "");
        let out = scorer().process(vec![bad, good]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn processed_stories_are_invisible() {
        let mut s = story("1", "Gang arrested", "");
        s.is_processed = true;
        s.impact_score = 9.0;
        assert!(scorer().process(vec![s]).is_empty());
    }
}
