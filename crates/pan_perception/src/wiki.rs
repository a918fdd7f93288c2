use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pan_core::{CapabilityError, SearchHit, SearchService};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Page summaries from the Wikipedia REST API, used as a second opinion
/// when the instant-answer search comes back empty.
pub struct WikipediaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PageSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

impl WikipediaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn summary_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid Wikipedia base URL")?;
        let title = query.trim().replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| anyhow!("Wikipedia base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["page", "summary", title.as_str()]);
        Ok(url)
    }

    async fn summary(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(self.summary_url(query)?)
            .send()
            .await
            .context("Failed to reach Wikipedia")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let page: PageSummary = response
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse Wikipedia summary")?;

        let extract = page.extract.trim();
        if extract.is_empty() {
            return Ok(Vec::new());
        }
        let title = if page.title.is_empty() {
            query.to_string()
        } else {
            page.title
        };
        Ok(vec![SearchHit {
            title,
            snippet: extract.to_string(),
        }])
    }
}

#[async_trait]
impl SearchService for WikipediaClient {
    async fn web_search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        self.summary(query).await.map_err(|e| {
            tracing::warn!("Wikipedia lookup for '{}' failed: {:#}", query, e);
            CapabilityError::unavailable("search", format!("{:#}", e))
        })
    }
}
