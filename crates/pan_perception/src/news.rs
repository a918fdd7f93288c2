use anyhow::{Context, Result};
use async_trait::async_trait;
use pan_core::{CapabilityError, Headline, NewsService};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// NewsAPI top-headlines client.
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    country: String,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    title: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl NewsApiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        country: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            country: country.to_string(),
        })
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Headline>> {
        let key = self.api_key.as_deref().context("News API key is missing")?;
        let page_size = limit.max(1).to_string();
        let url = Url::parse_with_params(
            &format!("{}/v2/top-headlines", self.base_url),
            &[
                ("country", self.country.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", key),
            ],
        )?;

        let body: NewsResponse = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach news service")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse news response")?;

        let headlines: Vec<Headline> = body
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = a.title?.trim().to_string();
                (!title.is_empty()).then(|| Headline {
                    title,
                    source: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "NewsAPI".to_string()),
                })
            })
            .take(limit)
            .collect();
        anyhow::ensure!(!headlines.is_empty(), "News service returned no headlines");
        Ok(headlines)
    }
}

#[async_trait]
impl NewsService for NewsApiClient {
    async fn fetch_news(&self, limit: usize) -> Result<Vec<Headline>, CapabilityError> {
        self.fetch(limit).await.map_err(|e| {
            tracing::warn!("News fetch failed: {:#}", e);
            CapabilityError::unavailable("news", format!("{:#}", e))
        })
    }
}
