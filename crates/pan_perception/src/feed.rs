use anyhow::{Context, Result};
use async_trait::async_trait;
use pan_core::{CapabilityError, Headline, NewsService};
use rss::Channel;
use std::time::Duration;

/// Headlines from any RSS 2.0 feed. Needs no API key.
pub struct RssNewsSource {
    client: reqwest::Client,
    url: String,
}

impl RssNewsSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
            url: url.to_string(),
        })
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Headline>> {
        let content = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch RSS feed")?
            .error_for_status()?
            .bytes()
            .await?;

        let channel = Channel::read_from(&content[..]).context("Failed to parse RSS feed")?;
        let source = channel.title().to_string();

        let headlines: Vec<Headline> = channel
            .items()
            .iter()
            .filter_map(|item| item.title())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(limit)
            .map(|title| Headline {
                title: title.to_string(),
                source: source.clone(),
            })
            .collect();
        anyhow::ensure!(!headlines.is_empty(), "RSS feed had no items");
        Ok(headlines)
    }
}

#[async_trait]
impl NewsService for RssNewsSource {
    async fn fetch_news(&self, limit: usize) -> Result<Vec<Headline>, CapabilityError> {
        self.fetch(limit).await.map_err(|e| {
            tracing::warn!("RSS fetch from {} failed: {:#}", self.url, e);
            CapabilityError::unavailable("news", format!("{:#}", e))
        })
    }
}
