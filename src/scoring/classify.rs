//! Admission gates and category selection.

use serde::Serialize;

use super::rules::RuleSet;
use super::signals::count_lowered;
use crate::models::{Story, CATEGORY_NEGATIVE, CATEGORY_NEUTRAL, CATEGORY_OTHER};

/// Base score for stories that pass the gates but match no category.
pub const OTHER_BASE_SCORE: f64 = 3.0;

/// Raw keyword counts gathered while classifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SignalCounts {
    pub title_pos: usize,
    /// Positive signals over title + description. Reported only.
    pub body_pos: usize,
    pub title_neg: usize,
    pub neg_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No positive signal in the title.
    Neutral,
    /// Title has more negative indicators than positive signals.
    Negative,
    Accepted { category: String, base_score: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub verdict: Verdict,
    pub signals: SignalCounts,
    /// Lower-cased `title + " " + description`.
    #[serde(skip)]
    pub text: String,
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted { .. })
    }

    pub fn category(&self) -> &str {
        match &self.verdict {
            Verdict::Neutral => CATEGORY_NEUTRAL,
            Verdict::Negative => CATEGORY_NEGATIVE,
            Verdict::Accepted { category, .. } => category,
        }
    }
}

/// Run both gates and, if they pass, pick the category.
pub fn classify(story: &Story, rules: &RuleSet) -> Classification {
    let text = format!("{} {}", story.title, story.description).to_lowercase();
    let title_text = story.title.to_lowercase();

    let positives = &rules.positive_signals.keywords;
    let negatives = &rules.negative_indicators.keywords;
    let signals = SignalCounts {
        title_pos: count_lowered(&title_text, positives),
        body_pos: count_lowered(&text, positives),
        title_neg: count_lowered(&title_text, negatives),
        neg_count: count_lowered(&text, negatives),
    };

    let verdict = if signals.title_pos == 0 {
        Verdict::Neutral
    } else if signals.title_neg > signals.title_pos {
        Verdict::Negative
    } else {
        let (category, base_score) = categorize(&text, rules);
        Verdict::Accepted {
            category,
            base_score,
        }
    };

    Classification {
        verdict,
        signals,
        text,
    }
}

/// Category with the most keyword hits in `text`; the first declared wins ties.
/// `("Other", 3.0)` when nothing matches.
pub fn categorize(text: &str, rules: &RuleSet) -> (String, f64) {
    let mut best: Option<(&str, f64)> = None;
    let mut best_hits = 0usize;

    for (name, rule) in &rules.positive_categories {
        let hits = count_lowered(text, &rule.keywords);
        if hits > best_hits {
            best_hits = hits;
            best = Some((name.as_str(), rule.base_score));
        }
    }

    match best {
        Some((name, base)) => (name.to_string(), base),
        None => (CATEGORY_OTHER.to_string(), OTHER_BASE_SCORE),
    }
}
