//! # Pan Perception
//!
//! Thin HTTP clients behind the capability traits in `pan_core`. Every
//! failure (network, status, payload, missing API key) is reported as
//! [`CapabilityError::Unavailable`](pan_core::CapabilityError).

pub mod feed;
pub mod news;
pub mod search;
pub mod weather;
pub mod wiki;

pub use feed::RssNewsSource;
pub use news::NewsApiClient;
pub use search::{DuckDuckGoClient, FallbackSearch};
pub use weather::OpenWeatherClient;
pub use wiki::WikipediaClient;

use anyhow::{Context, Result};
use std::time::Duration;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pan/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
