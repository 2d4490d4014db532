// src/models.rs
//! Story record shared by collectors, the scorer, storage and notifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned by collectors before scoring.
pub const CATEGORY_UNCATEGORIZED: &str = "Uncategorized";
/// No positive signal in the title.
pub const CATEGORY_NEUTRAL: &str = "Neutral";
/// Title dominated by negative indicators.
pub const CATEGORY_NEGATIVE: &str = "Negative";
/// Passed both gates but matched no configured category.
pub const CATEGORY_OTHER: &str = "Other";

/// A single cybersecurity news story.
///
/// Collectors fill the provenance fields; the scorer fills `category`,
/// `impact_score`, `tags`, `summary` and flips `is_processed`. Only the
/// notification path touches `is_sent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub source: String,
    pub source_url: String,
    pub published_date: DateTime<Utc>,
    pub collected_date: DateTime<Utc>,
    pub category: String,
    /// 0.0 ..= 10.0 once processed.
    pub impact_score: f64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_processed: bool,
    #[serde(default)]
    pub is_sent: bool,
}

impl Story {
    /// Fresh, unscored story as produced by a collector.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        source: impl Into<String>,
        source_url: impl Into<String>,
        published_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            title: title.into(),
            description: description.into(),
            source: source.into(),
            source_url: source_url.into(),
            published_date,
            collected_date: Utc::now(),
            category: CATEGORY_UNCATEGORIZED.to_string(),
            impact_score: 0.0,
            summary: None,
            tags: None,
            is_processed: false,
            is_sent: false,
        }
    }

    /// Identifier for log lines; `"<none>"` when missing.
    pub fn id_or_placeholder(&self) -> &str {
        self.id.as_deref().unwrap_or("<none>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_story_is_unscored() {
        let s = Story::new("abc", "t", "d", "src", "https://x", Utc::now());
        assert_eq!(s.category, CATEGORY_UNCATEGORIZED);
        assert_eq!(s.impact_score, 0.0);
        assert!(!s.is_processed && !s.is_sent);
        assert!(s.collected_date >= s.published_date);
    }

    #[test]
    fn json_roundtrip_keeps_optional_fields() {
        let mut s = Story::new("abc", "t", "d", "src", "https://x", Utc::now());
        s.tags = Some(vec!["cyber-good-news".into()]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Story = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
