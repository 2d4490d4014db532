use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::models::Story;
use crate::scoring::impact::ImpactTier;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "retrying discord webhook");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_story(&self, story: &Story) -> Result<()> {
        let payload = DiscordWebhookPayload {
            content: None,
            embeds: vec![story_embed(story)],
        };
        self.post(&payload).await
    }
}

#[derive(Debug, Serialize)]
pub struct DiscordWebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build the rich embed for one story.
pub fn story_embed(story: &Story) -> DiscordEmbed {
    let score = story.impact_score;

    let mut fields = vec![
        EmbedField {
            name: "Impact Score".into(),
            value: format!("{:.1}/10 - {}", score, impact_label(score)),
            inline: true,
        },
        EmbedField {
            name: format!("{} Category", category_icon(&story.category)),
            value: story.category.clone(),
            inline: true,
        },
        EmbedField {
            name: "Source".into(),
            value: story.source.clone(),
            inline: true,
        },
    ];

    if let Some(tags) = story.tags.as_ref().filter(|t| !t.is_empty()) {
        let tags_text = tags
            .iter()
            .take(5)
            .map(|t| format!("`{t}`"))
            .collect::<Vec<_>>()
            .join(", ");
        fields.push(EmbedField {
            name: "Tags".into(),
            value: tags_text,
            inline: false,
        });
    }

    let description = if story.description.is_empty() {
        "No description available".to_string()
    } else {
        match story.summary.as_deref().filter(|s| !s.is_empty()) {
            Some(summary) => summary.to_string(),
            None => truncate_chars(&story.description, 500),
        }
    };

    DiscordEmbed {
        title: format!("{} {}", impact_emoji(score), truncate_chars(&story.title, 250)),
        description,
        url: story.source_url.clone(),
        color: impact_color(score),
        fields,
        footer: EmbedFooter {
            text: format!(
                "Cyber Good News | Published: {}",
                story.published_date.format("%Y-%m-%d %H:%M UTC")
            ),
        },
    }
}

/// Green-leaning palette by score.
pub fn impact_color(score: f64) -> u32 {
    match ImpactTier::from_score(score) {
        ImpactTier::Outstanding => 0x00FF00,
        ImpactTier::High => 0x2ECC71,
        ImpactTier::Moderate => 0x3498DB,
        ImpactTier::Notable => 0x9B59B6,
    }
}

pub fn impact_label(score: f64) -> &'static str {
    match ImpactTier::from_score(score) {
        ImpactTier::Outstanding => "Outstanding",
        ImpactTier::High => "High Impact",
        ImpactTier::Moderate => "Moderate",
        ImpactTier::Notable => "Notable",
    }
}

pub fn impact_emoji(score: f64) -> &'static str {
    match ImpactTier::from_score(score) {
        ImpactTier::Outstanding => "\u{1f31f}",
        ImpactTier::High => "\u{2705}",
        ImpactTier::Moderate => "\u{1f4a1}",
        ImpactTier::Notable => "\u{1f4f0}",
    }
}

pub fn category_icon(category: &str) -> &'static str {
    match category {
        "Security Wins" => "\u{1f3c6}",
        "Threat Takedowns" => "\u{1f6a8}",
        "Privacy Advances" => "\u{1f512}",
        "Community & Education" => "\u{1f393}",
        "Innovation & Research" => "\u{1f52c}",
        "Policy & Regulation" => "\u{1f3db}\u{fe0f}",
        "Open Source & Tools" => "\u{1f527}",
        "People & Lives Improved" => "\u{2764}\u{fe0f}",
        _ => "\u{1f4f0}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn story() -> Story {
        let published = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 0).unwrap();
        let mut s = Story::new(
            "id",
            "Botnet dismantled",
            "Police dismantled the botnet.",
            "The Record",
            "https://therecord.media/x",
            published,
        );
        s.category = "Security Wins".into();
        s.impact_score = 8.0;
        s.summary = Some("Police dismantled the botnet.".into());
        s.tags = Some((0..7).map(|i| format!("t{i}")).collect());
        s
    }

    #[test]
    fn embed_carries_score_category_and_footer() {
        let e = story_embed(&story());
        assert_eq!(e.title, "\u{1f31f} Botnet dismantled");
        assert_eq!(e.color, 0x00FF00);
        assert_eq!(e.fields[0].value, "8.0/10 - Outstanding");
        assert_eq!(e.fields[1].name, "\u{1f3c6} Category");
        assert_eq!(e.fields[3].value, "`t0`, `t1`, `t2`, `t3`, `t4`");
        assert_eq!(e.footer.text, "Cyber Good News | Published: 2025-03-04 05:06 UTC");
    }

    #[test]
    fn labels_follow_summary_bands() {
        for score in [0.0, 3.99, 4.0, 5.99, 6.0, 7.99, 8.0, 10.0] {
            let summary = crate::scoring::impact::impact_label(score);
            let embed = impact_label(score);
            if summary == "High" {
                assert_eq!(embed, "High Impact", "score {score}");
            } else {
                assert_eq!(embed, summary, "score {score}");
            }
        }
        assert_eq!(impact_label(7.99), "High Impact");
        assert_eq!(impact_color(5.99), 0x3498DB);
    }

    #[test]
    fn empty_description_has_placeholder() {
        let mut s = story();
        s.description.clear();
        assert_eq!(story_embed(&s).description, "No description available");
    }

    #[test]
    fn payload_serializes_without_content() {
        let p = DiscordWebhookPayload {
            content: None,
            embeds: vec![story_embed(&story())],
        };
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("content").is_none());
        assert_eq!(v["embeds"][0]["url"], "https://therecord.media/x");
    }
}
