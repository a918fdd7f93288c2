use anyhow::{Context, Result};
use async_trait::async_trait;
use pan_core::{CapabilityError, WeatherReport, WeatherService};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// OpenWeatherMap current-conditions client (metric units).
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct WeatherResponse {
    name: Option<String>,
    weather: Vec<Condition>,
    main: Main,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct Main {
    temp: f64,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    async fn fetch(&self, location: &str) -> Result<WeatherReport> {
        let key = self
            .api_key
            .as_deref()
            .context("Weather API key is missing")?;
        let url = Url::parse_with_params(
            &format!("{}/data/2.5/weather", self.base_url),
            &[("q", location), ("appid", key), ("units", "metric")],
        )?;

        let body: WeatherResponse = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach weather service")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse weather response")?;

        let condition = body
            .weather
            .first()
            .map(|c| c.description.clone())
            .context("Weather response had no conditions")?;
        Ok(WeatherReport {
            location: body.name.unwrap_or_else(|| location.to_string()),
            condition,
            temperature: body.main.temp,
        })
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherReport, CapabilityError> {
        self.fetch(location).await.map_err(|e| {
            tracing::warn!("Weather lookup for '{}' failed: {:#}", location, e);
            CapabilityError::unavailable("weather", format!("{:#}", e))
        })
    }
}
