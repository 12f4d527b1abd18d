//! Listing page retrieval.
//!
//! `PageFetcher` is the seam between the collector and the network. The HTTP
//! implementation retries throttling and server errors; anything else is
//! surfaced as a typed `FetchError` and never mistaken for an empty page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::errors::FetchError;

const USER_AGENT: &str = concat!("tracker/", env!("CARGO_PKG_VERSION"));
const MAX_RETRIES: u32 = 3;

/// Returns the raw content of the listing page starting at `offset`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, offset: u32) -> Result<String, FetchError>;
}

/// Fetches `{listing_url}?limit={offset}` over HTTP.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    listing_url: String,
}

impl HttpPageFetcher {
    pub fn new(listing_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            listing_url: listing_url.into(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, offset: u32) -> Result<String, FetchError> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    offset,
                    "Fetch attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&self.listing_url)
                .query(&[("limit", offset)])
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_error = Some(FetchError::Http(e));
                    continue;
                }
                Err(e) => return Err(FetchError::Http(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                warn!(offset, "Listing returned {}", status);
                last_error = Some(FetchError::Status {
                    status: status.as_u16(),
                    offset,
                });
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    offset,
                });
            }

            let body = response.text().await?;
            debug!(offset, bytes = body.len(), "Fetched listing page");
            return Ok(body);
        }

        Err(last_error.unwrap_or(FetchError::Exhausted {
            offset,
            retries: MAX_RETRIES,
        }))
    }
}

/// Exponential backoff: 1s, 2s, 4s...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt.max(1) - 1)))
}
