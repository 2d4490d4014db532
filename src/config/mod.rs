// src/config/mod.rs
//! Runtime settings read from the environment (after `.env` is loaded).

use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::config::ENV_FEEDS_PATH;
use crate::scoring::rules::{DEFAULT_RULES_PATH, ENV_RULES_PATH};
use crate::scoring::DEFAULT_MIN_IMPACT_SCORE;
use crate::storage::DEFAULT_DATABASE_PATH;

pub const ENV_DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const ENV_COLLECTION_INTERVAL_MINUTES: &str = "COLLECTION_INTERVAL_MINUTES";
pub const ENV_MIN_IMPACT_SCORE: &str = "MIN_IMPACT_SCORE";
pub const ENV_MAX_ALERTS_PER_HOUR: &str = "MAX_ALERTS_PER_HOUR";
pub const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
pub const ENV_HTTP_ADDR: &str = "HTTP_ADDR";

pub const DEFAULT_COLLECTION_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_MAX_ALERTS_PER_HOUR: usize = 5;
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Empty when unset; `validate` reports it.
    pub discord_webhook_url: String,
    pub collection_interval_minutes: u64,
    pub min_impact_score: f64,
    pub max_alerts_per_hour: usize,
    pub database_path: PathBuf,
    pub rules_path: PathBuf,
    /// `None` means the default lookup in `ingest::config`.
    pub feeds_path: Option<PathBuf>,
    pub http_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: String::new(),
            collection_interval_minutes: DEFAULT_COLLECTION_INTERVAL_MINUTES,
            min_impact_score: DEFAULT_MIN_IMPACT_SCORE,
            max_alerts_per_hour: DEFAULT_MAX_ALERTS_PER_HOUR,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            feeds_path: None,
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            discord_webhook_url: get(ENV_DISCORD_WEBHOOK_URL).unwrap_or_default(),
            collection_interval_minutes: parse_or(
                ENV_COLLECTION_INTERVAL_MINUTES,
                get(ENV_COLLECTION_INTERVAL_MINUTES),
                d.collection_interval_minutes,
            ),
            min_impact_score: parse_or(
                ENV_MIN_IMPACT_SCORE,
                get(ENV_MIN_IMPACT_SCORE),
                d.min_impact_score,
            ),
            max_alerts_per_hour: parse_or(
                ENV_MAX_ALERTS_PER_HOUR,
                get(ENV_MAX_ALERTS_PER_HOUR),
                d.max_alerts_per_hour,
            ),
            database_path: get(ENV_DATABASE_PATH)
                .map(PathBuf::from)
                .unwrap_or(d.database_path),
            rules_path: get(ENV_RULES_PATH).map(PathBuf::from).unwrap_or(d.rules_path),
            feeds_path: get(ENV_FEEDS_PATH).map(PathBuf::from),
            http_addr: parse_or(ENV_HTTP_ADDR, get(ENV_HTTP_ADDR), d.http_addr),
        }
    }

    /// Fails listing every missing required key.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.discord_webhook_url.is_empty() {
            missing.push(ENV_DISCORD_WEBHOOK_URL);
        }
        if !missing.is_empty() {
            bail!("missing required configuration: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_minutes.max(1) * 60)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match raw {
        None => default,
        Some(s) => match s.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %s, ?default, "unparseable setting, using default");
                default
            }
        },
    }
}
