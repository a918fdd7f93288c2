//! Exponential backoff for calls to the generation endpoint.
//!
//! Rate limits (429), request timeouts (408) and server errors (5xx) are
//! retried; any other client error fails on the spot.

use anyhow::Result;
use rand::Rng;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Includes the first attempt.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, for callers that already run under a deadline.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Run `operation` until it yields a success response, a non-retryable
/// status, or the attempts run out.
pub async fn with_retry<F, Fut>(config: &RetryConfig, provider_name: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let mut delay = config.initial_delay;
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", provider_name, attempt);
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !is_retryable(status) {
                    anyhow::bail!("{} API error ({}): {}", provider_name, status, body);
                }
                tracing::warn!(
                    "{} returned {} on attempt {}/{}: {}",
                    provider_name,
                    status,
                    attempt,
                    config.max_attempts,
                    body.chars().take(200).collect::<String>()
                );
                last_error = format!("{} ({}): {}", provider_name, status, body);
            }
            Err(e) => {
                tracing::warn!(
                    "{} network error on attempt {}/{}: {}",
                    provider_name,
                    attempt,
                    config.max_attempts,
                    e
                );
                last_error = format!("{}: {}", provider_name, e);
            }
        }

        if attempt < config.max_attempts {
            let sleep_time = delay + Duration::from_millis(rand::thread_rng().gen_range(0..500));
            tracing::debug!(
                "{} retrying in {:.1}s (attempt {}/{})",
                provider_name,
                sleep_time.as_secs_f64(),
                attempt + 1,
                config.max_attempts
            );
            tokio::time::sleep(sleep_time).await;
            delay = Duration::from_secs_f64(
                (delay.as_secs_f64() * config.backoff_factor).min(config.max_delay.as_secs_f64()),
            );
        }
    }

    anyhow::bail!(
        "All {} attempts exhausted. Last error: {}",
        config.max_attempts,
        last_error
    )
}
