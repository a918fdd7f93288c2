use anyhow::{Context, Result};
use async_trait::async_trait;
use pan_core::{CapabilityError, SearchHit, SearchService};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// DuckDuckGo instant-answer client.
pub struct DuckDuckGoClient {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    /// Absent on topic groups, which nest further topics.
    text: Option<String>,
}

impl DuckDuckGoClient {
    pub fn new(base_url: &str, max_results: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = Url::parse_with_params(
            &format!("{}/", self.base_url),
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )?;

        // The API answers with a javascript content type; decode by hand.
        let raw = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach search service")?
            .error_for_status()?
            .text()
            .await?;
        let body: InstantAnswer =
            serde_json::from_str(&raw).context("Failed to parse search response")?;

        let title = if body.heading.is_empty() {
            query.to_string()
        } else {
            body.heading.clone()
        };

        let mut hits = Vec::new();
        for snippet in [body.answer, body.abstract_text] {
            if !snippet.trim().is_empty() {
                hits.push(SearchHit {
                    title: title.clone(),
                    snippet: snippet.trim().to_string(),
                });
            }
        }
        hits.extend(
            body.related_topics
                .into_iter()
                .filter_map(|t| t.text)
                .filter(|t| !t.trim().is_empty())
                .map(|text| SearchHit {
                    title: title.clone(),
                    snippet: text,
                }),
        );
        hits.truncate(self.max_results);
        Ok(hits)
    }
}

#[async_trait]
impl SearchService for DuckDuckGoClient {
    async fn web_search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        self.search(query).await.map_err(|e| {
            tracing::warn!("Search for '{}' failed: {:#}", query, e);
            CapabilityError::unavailable("search", format!("{:#}", e))
        })
    }
}

/// Tries each provider in order until one returns something.
pub struct FallbackSearch {
    providers: Vec<(String, Arc<dyn SearchService>)>,
}

impl FallbackSearch {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, provider: Arc<dyn SearchService>) -> Self {
        self.providers.push((name.into(), provider));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for FallbackSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchService for FallbackSearch {
    async fn web_search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        let mut last_error = None;
        let mut answered = false;
        for (name, provider) in &self.providers {
            match provider.web_search(query).await {
                Ok(hits) if !hits.is_empty() => return Ok(hits),
                Ok(_) => {
                    tracing::debug!("{} found nothing for '{}', trying next", name, query);
                    answered = true;
                }
                Err(e) => {
                    tracing::debug!("{} failed for '{}' ({}), trying next", name, query, e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(Vec::new()),
        }
    }
}
