use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::model::Feed;
use crate::parser;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Downloads one feed document and parses it, retrying transport failures.
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_attempts: u32) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rss-reader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, max_attempts))
    }

    pub fn with_client(client: Client, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetches `url` and parses the body into a [`Feed`].
    ///
    /// Each attempt is one GET. Network failures and non-2xx responses are retried
    /// immediately, up to `max_attempts` attempts in total; after that the last error is
    /// returned. A body that fetched fine but does not parse is returned as
    /// [`FetchError::Parse`] without retrying.
    pub async fn fetch_feed(&self, url: &str, is_default: bool) -> Result<Feed, FetchError> {
        let mut attempt = 1;
        loop {
            match self.get(url).await {
                Ok(body) => {
                    debug!("Fetched {} on attempt {}", url, attempt);
                    return Ok(parser::parse(url, &body, is_default)?);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} for '{}' failed: {}",
                        attempt, self.max_attempts, url, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!("Giving up on '{}' after {} attempts: {}", url, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
