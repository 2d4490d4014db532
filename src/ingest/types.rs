// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Story;

/// One syndicated feed to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Produces unscored stories from some upstream.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    async fn collect(&self) -> Result<Vec<Story>>;
}
