use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, warn};

use crate::error::FetchError;

const BASE_BACKOFF_MS: u64 = 2000;
const USER_AGENT: &str = concat!("covid_ru_stats/", env!("CARGO_PKG_VERSION"));

/// HTTP client whose timeout bounds each page attempt.
pub fn build_client(page_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(page_timeout)
        .build()
}

/// Fetch a page body, retrying up to `max_retries` times after the first
/// failure.
pub async fn fetch_page(client: &Client, url: &str, max_retries: u32) -> Result<String, FetchError> {
    with_retries(
        max_retries,
        Duration::from_millis(BASE_BACKOFF_MS),
        url,
        move || fetch_once(client, url),
    )
    .await
}

async fn fetch_once(client: &Client, url: &str) -> Result<String, FetchError> {
    let start = Instant::now();
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    let body = response.text().await?;
    info!(
        %url,
        status = status.as_u16(),
        bytes = body.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "fetched page"
    );
    Ok(body)
}

/// Called once retries are exhausted; the run ends without touching stores.
pub fn handle_failed_request(url: &str, err: &FetchError) {
    warn!(%url, error = %err, "request failed after all retries, skipping run");
}

pub async fn with_retries<T, E, F, Fut>(
    max_retries: u32,
    base_backoff: Duration,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                let backoff = base_backoff * 2u32.saturating_pow(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:.1}s",
                    label,
                    attempt + 1,
                    max_retries + 1,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
