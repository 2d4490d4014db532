//! Impact score: base + modifiers − negative penalty, clamped to 0..=10.

use super::rules::RuleSet;
use super::signals::contains_lowered;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;
/// Deducted per negative indicator found anywhere in the text.
pub const NEGATIVE_PENALTY: f64 = 0.5;

/// Final score for an accepted story. `text` must be lower-cased.
pub fn score(text: &str, base_score: f64, neg_count: usize, rules: &RuleSet) -> f64 {
    let raw = apply_modifiers(text, base_score, rules) - NEGATIVE_PENALTY * neg_count as f64;
    raw.clamp(MIN_SCORE, MAX_SCORE)
}

/// Adds each modifier's delta once if any of its keywords is present.
pub fn apply_modifiers(text: &str, base_score: f64, rules: &RuleSet) -> f64 {
    rules
        .impact_modifiers
        .iter()
        .filter(|(_, m)| m.keywords.iter().any(|kw| contains_lowered(text, kw)))
        .fold(base_score, |acc, (_, m)| acc + m.modifier)
}

/// Score bands shared by summaries and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactTier {
    Outstanding,
    High,
    Moderate,
    Notable,
}

impl ImpactTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Outstanding
        } else if score >= 6.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Moderate
        } else {
            Self::Notable
        }
    }
}

/// Label used in generated summaries.
pub fn impact_label(score: f64) -> &'static str {
    match ImpactTier::from_score(score) {
        ImpactTier::Outstanding => "Outstanding",
        ImpactTier::High => "High",
        ImpactTier::Moderate => "Moderate",
        ImpactTier::Notable => "Notable",
    }
}
