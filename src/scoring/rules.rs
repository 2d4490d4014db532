//! Scoring lexicon (hot-reloadable from `config/positive_scoring.toml`).
//!
//! File shape (TOML shown, JSON uses the same keys):
//! ```toml
//! positive_signals    = { keywords = ["arrested", "patched"] }
//! negative_indicators = { keywords = ["breach", "stolen"] }
//!
//! [positive_categories."Security Wins"]
//! keywords   = ["arrested", "takedown"]
//! base_score = 7.0
//!
//! [impact_modifiers.global_scale]
//! keywords = ["worldwide", "millions"]
//! modifier = 1.5
//! ```
//!
//! Categories and modifiers keep their declaration order: category ties are
//! resolved in favour of the one declared first, so the order is part of the
//! lexicon's meaning.

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_RULES_PATH: &str = "config/positive_scoring.toml";
pub const ENV_RULES_PATH: &str = "SCORING_RULES_PATH";

fn default_category_base() -> f64 {
    5.0
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct KeywordList {
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_category_base")]
    pub base_score: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModifierRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub modifier: f64,
}

/// Immutable lexicon snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RuleSet {
    #[serde(default, deserialize_with = "ordered_map")]
    pub positive_categories: Vec<(String, CategoryRule)>,
    #[serde(default)]
    pub positive_signals: KeywordList,
    #[serde(default)]
    pub negative_indicators: KeywordList,
    #[serde(default, deserialize_with = "ordered_map")]
    pub impact_modifiers: Vec<(String, ModifierRule)>,
}

impl RuleSet {
    /// Built-in lexicon used when the external file is missing or unusable.
    pub fn builtin() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            positive_categories: vec![
                (
                    "Security Wins".to_string(),
                    CategoryRule {
                        keywords: words(&["arrested", "takedown", "dismantled", "seized"]),
                        base_score: 7.0,
                    },
                ),
                (
                    "Innovation & Research".to_string(),
                    CategoryRule {
                        keywords: words(&["new tool", "open source", "research"]),
                        base_score: 6.0,
                    },
                ),
            ],
            positive_signals: KeywordList {
                keywords: words(&[
                    "arrested",
                    "takedown",
                    "dismantled",
                    "seized",
                    "open source",
                    "new tool",
                    "research",
                    "patched",
                    "disrupted",
                    "sentenced",
                ]),
            },
            negative_indicators: KeywordList {
                keywords: words(&[
                    "breach",
                    "leaked",
                    "stolen",
                    "exploited",
                    "compromised",
                    "hacked",
                ]),
            },
            impact_modifiers: Vec::new(),
        }
    }

    /// Usable means: at least one category and at least one positive signal.
    /// Anything less would classify every story as neutral.
    pub fn validate(&self) -> Result<()> {
        if self.positive_categories.is_empty() {
            return Err(anyhow!("lexicon defines no positive_categories"));
        }
        if self.positive_signals.keywords.is_empty() {
            return Err(anyhow!("lexicon defines no positive_signals keywords"));
        }
        Ok(())
    }

    pub fn summary(&self) -> RuleSetSummary {
        RuleSetSummary {
            categories: self
                .positive_categories
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
            positive_signals: self.positive_signals.keywords.len(),
            negative_indicators: self.negative_indicators.keywords.len(),
            modifiers: self
                .impact_modifiers
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }
}

/// Compact description of the active lexicon (served by `GET /rules`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSummary {
    pub categories: Vec<String>,
    pub positive_signals: usize,
    pub negative_indicators: usize,
    pub modifiers: Vec<String>,
}

/// Parse a lexicon from text. `hint_ext` is the file extension ("toml"/"json").
pub fn parse_rules(content: &str, hint_ext: &str) -> Result<RuleSet> {
    let rules: RuleSet = if hint_ext == "json" {
        serde_json::from_str(content).context("parsing JSON lexicon")?
    } else {
        toml::from_str(content).context("parsing TOML lexicon")?
    };
    rules.validate()?;
    Ok(rules)
}

/// Read and parse a lexicon file without any fallback.
pub fn load_rules_file(path: &Path) -> Result<RuleSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading lexicon from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_rules(&content, ext.as_str())
}

/// Load the lexicon at `path`, falling back to [`RuleSet::builtin`] on any failure.
pub fn load(path: &Path) -> RuleSet {
    match load_rules_file(path) {
        Ok(rules) => {
            tracing::debug!(
                path = %path.display(),
                categories = rules.positive_categories.len(),
                "scoring rules loaded"
            );
            rules
        }
        Err(e) => {
            tracing::warn!(
                error = ?e,
                path = %path.display(),
                "could not load scoring rules, using built-in defaults"
            );
            RuleSet::builtin()
        }
    }
}

/// `$SCORING_RULES_PATH` or `config/positive_scoring.toml`.
pub fn default_rules_path() -> PathBuf {
    std::env::var(ENV_RULES_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RULES_PATH))
}

/// Shared, atomically swappable lexicon.
///
/// Readers take an `Arc` snapshot and never hold the lock while scoring, so a
/// reload never becomes visible halfway through a batch.
#[derive(Debug)]
pub struct RulesHandle {
    path: Option<PathBuf>,
    current: RwLock<Arc<RuleSet>>,
    version: AtomicU64,
}

impl RulesHandle {
    /// Load from `path` (with fallback) and remember it for `reload`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let rules = load(&path);
        Self {
            path: Some(path),
            current: RwLock::new(Arc::new(rules)),
            version: AtomicU64::new(1),
        }
    }

    /// Fixed lexicon with no backing file; `reload` keeps it unchanged.
    pub fn fixed(rules: RuleSet) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(rules)),
            version: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.read().clone()
    }

    /// Incremented on every successful swap.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the backing file and swap the snapshot. Returns the new one.
    pub fn reload(&self) -> Arc<RuleSet> {
        let Some(path) = &self.path else {
            return self.snapshot();
        };
        let fresh = Arc::new(load(path));
        {
            let mut guard = self.current.write();
            *guard = fresh.clone();
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        metrics::counter!("rules_reloads_total").increment(1);
        tracing::info!(
            path = %path.display(),
            version = self.version(),
            "scoring rules reloaded"
        );
        fresh
    }

    /// Replace the lexicon directly (tests, admin tooling).
    pub fn replace(&self, rules: RuleSet) {
        let mut guard = self.current.write();
        *guard = Arc::new(rules);
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

// --- internals ---

/// Deserialize a map into `(key, value)` pairs in document order.
fn ordered_map<'de, D, T>(deserializer: D) -> std::result::Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of named rules")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, T>()? {
                // Later duplicates replace earlier ones but keep the first position.
                if let Some(slot) = out.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    out.push((key, value));
                }
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TOML: &str = r#"
positive_signals = { keywords = ["arrested", "patched"] }
negative_indicators = { keywords = ["breach"] }

[positive_categories."Zeta Wins"]
keywords = ["arrested"]
base_score = 7.0

[positive_categories."Alpha Research"]
keywords = ["patched"]

[impact_modifiers.scale]
keywords = ["worldwide"]
modifier = 1.5
"#;

    #[test]
    fn toml_keeps_declaration_order() {
        let rules = parse_rules(SAMPLE_TOML, "toml").unwrap();
        let names: Vec<_> = rules
            .positive_categories
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["Zeta Wins", "Alpha Research"]);
        // base_score falls back to 5.0 when omitted
        assert_eq!(rules.positive_categories[1].1.base_score, 5.0);
        assert_eq!(rules.impact_modifiers[0].1.modifier, 1.5);
    }

    #[test]
    fn json_keeps_declaration_order() {
        let json = r#"{
            "positive_categories": {
                "Zeta": {"keywords": ["a"], "base_score": 4},
                "Alpha": {"keywords": ["b"], "base_score": 6}
            },
            "positive_signals": {"keywords": ["a"]}
        }"#;
        let rules = parse_rules(json, "json").unwrap();
        assert_eq!(rules.positive_categories[0].0, "Zeta");
        assert_eq!(rules.positive_categories[1].1.base_score, 6.0);
        assert!(rules.negative_indicators.keywords.is_empty());
    }

    #[test]
    fn empty_lexicon_is_rejected() {
        assert!(parse_rules("", "toml").is_err());
        assert!(parse_rules(r#"{"positive_signals": {"keywords": ["x"]}}"#, "json").is_err());
    }

    #[test]
    fn builtin_is_usable() {
        let rules = RuleSet::builtin();
        rules.validate().unwrap();
        assert_eq!(rules.positive_categories[0].0, "Security Wins");
        assert_eq!(rules.positive_categories[1].0, "Innovation & Research");
        assert!(!rules.negative_indicators.keywords.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let rules = load(Path::new("does/not/exist.toml"));
        assert_eq!(rules, RuleSet::builtin());
    }

    #[test]
    fn reload_swaps_snapshot_but_old_one_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, SAMPLE_TOML).unwrap();

        let handle = RulesHandle::from_path(&path);
        let before = handle.snapshot();
        assert_eq!(before.positive_categories[0].0, "Zeta Wins");
        assert_eq!(handle.version(), 1);

        fs::write(&path, "not = [valid").unwrap();
        let after = handle.reload();
        assert_eq!(*after, RuleSet::builtin());
        assert_eq!(handle.version(), 2);
        // earlier snapshot is untouched
        assert_eq!(before.positive_categories[0].0, "Zeta Wins");
    }
}
