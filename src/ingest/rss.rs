// src/ingest/rss.rs
//! RSS 2.0 / Atom 1.0 collector.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::types::{Collector, FeedSource};
use crate::ingest::{normalize_text, story_id};
use crate::models::Story;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(default)]
    link: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over other link kinds.
    fn alternate_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| self.link.first())
            .map(|l| l.href.as_str())
    }
}

/// Format-neutral view of one feed entry.
struct RawEntry {
    title: String,
    link: String,
    description: String,
    published: Option<DateTime<Utc>>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0))
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an RSS or Atom document into unscored stories attributed to `feed_name`.
/// Entries without a link are skipped (no stable identifier).
pub fn parse_feed(xml: &str, feed_name: &str, now: DateTime<Utc>) -> Result<Vec<Story>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let raw: Vec<RawEntry> = match from_str::<Rss>(&xml_clean) {
        Ok(rss) => rss
            .channel
            .item
            .into_iter()
            .map(|it| RawEntry {
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default(),
                description: it.description.unwrap_or_default(),
                published: it.pub_date.as_deref().and_then(parse_rfc2822),
            })
            .collect(),
        Err(rss_err) => {
            let atom: AtomFeed = from_str(&xml_clean)
                .map_err(|atom_err| anyhow!("not RSS ({rss_err}) nor Atom ({atom_err})"))?;
            atom.entry
                .into_iter()
                .map(|e| {
                    let link = e.alternate_link().unwrap_or_default().to_string();
                    let published = e
                        .published
                        .as_deref()
                        .or(e.updated.as_deref())
                        .and_then(parse_rfc3339);
                    RawEntry {
                        title: e.title.map(|t| t.value).unwrap_or_default(),
                        link,
                        description: e.summary.or(e.content).map(|t| t.value).unwrap_or_default(),
                        published,
                    }
                })
                .collect()
        }
    };

    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let link = entry.link.trim();
        if link.is_empty() {
            continue;
        }
        let mut story = Story::new(
            story_id(link),
            normalize_text(&entry.title),
            normalize_text(&entry.description),
            feed_name,
            link,
            entry.published.unwrap_or(now),
        );
        story.collected_date = now;
        out.push(story);
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("collector_parse_ms").record(ms);
    Ok(out)
}

/// Polls a fixed list of feeds over HTTP.
pub struct RssCollector {
    feeds: Vec<FeedSource>,
    client: Client,
    timeout: Duration,
}

impl RssCollector {
    pub fn new(feeds: Vec<FeedSource>) -> Self {
        Self {
            feeds,
            client: Client::new(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    async fn collect_from_feed(&self, feed: &FeedSource) -> Result<Vec<Story>> {
        let body = self
            .client
            .get(&feed.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {}", feed.url))?
            .error_for_status()
            .with_context(|| format!("non-2xx from {}", feed.url))?
            .text()
            .await
            .context("reading feed body")?;
        parse_feed(&body, &feed.name, Utc::now())
            .with_context(|| format!("parsing feed {}", feed.name))
    }
}

#[async_trait]
impl Collector for RssCollector {
    fn name(&self) -> &str {
        "RSS Feeds"
    }

    fn is_available(&self) -> bool {
        !self.feeds.is_empty()
    }

    async fn collect(&self) -> Result<Vec<Story>> {
        let mut all = Vec::new();
        for feed in &self.feeds {
            match self.collect_from_feed(feed).await {
                Ok(mut stories) => {
                    tracing::info!(feed = %feed.name, items = stories.len(), "collected feed");
                    all.append(&mut stories);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %feed.name, "feed error");
                    counter!("collector_feed_errors_total").increment(1);
                }
            }
        }
        Ok(all)
    }
}

/// quick-xml only knows the XML entities; feeds routinely carry HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_and_rfc3339_dates() {
        let a = parse_rfc2822("Tue, 10 Jun 2025 14:30:00 +0200").unwrap();
        assert_eq!(a.to_rfc3339(), "2025-06-10T12:30:00+00:00");
        let b = parse_rfc3339("2025-06-10T12:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_rfc2822("yesterday").is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_feed("<rss><channel><item><title>x", "X", Utc::now()).is_err());
    }

    #[test]
    fn html_entities_do_not_break_parsing() {
        let xml = r#"<rss><channel><item>
            <title>Patch&nbsp;released</title>
            <link>https://example.com/p</link>
        </item></channel></rss>"#;
        let stories = parse_feed(xml, "Ex", Utc::now()).unwrap();
        assert_eq!(stories[0].title, "Patch released");
    }
}
