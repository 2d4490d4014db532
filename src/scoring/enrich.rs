//! Tags and short summaries for accepted stories.

use super::impact::impact_label;
use super::rules::RuleSet;
use super::signals::contains_lowered;

pub const BASE_TAGS: [&str; 2] = ["cyber-good-news", "security-positive"];
pub const MAX_TAGS: usize = 8;
/// Descriptions up to this many characters are used as the summary verbatim.
pub const SUMMARY_VERBATIM_MAX: usize = 200;
pub const FIRST_SENTENCE_MAX: usize = 150;

/// Base tags followed by every category keyword found in `text`, in lexicon
/// order, capped at [`MAX_TAGS`]. `text` must be lower-cased.
pub fn extract_tags(text: &str, rules: &RuleSet) -> Vec<String> {
    let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();

    for (_, category) in &rules.positive_categories {
        for kw in &category.keywords {
            if tags.len() >= MAX_TAGS {
                return tags;
            }
            if contains_lowered(text, kw) && !tags.iter().any(|t| t == kw) {
                tags.push(kw.clone());
            }
        }
    }
    tags
}

/// Short description: verbatim when short, otherwise a one-line synthesis.
pub fn generate_summary(description: &str, category: &str, source: &str, score: f64) -> String {
    if description.chars().count() <= SUMMARY_VERBATIM_MAX {
        return description.to_string();
    }

    let first_sentence: String = description
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .take(FIRST_SENTENCE_MAX)
        .collect();

    format!(
        "{} impact story in '{}'. Source: {}. {}.",
        impact_label(score),
        category,
        source,
        first_sentence
    )
}
