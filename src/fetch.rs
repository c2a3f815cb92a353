//! Page and archive fetching with fixed-delay retry policies
//!
//! Two policies are in play:
//! - listing pages retry forever on a non-success status (the crawl cannot
//!   advance without them), while transport-level errors propagate;
//! - landing pages and archives retry a bounded number of times on either
//!   kind of failure, then give up on that repository.
//!
//! Every request carries `cache-control: no-cache` so intermediaries never
//! serve a stale listing or archive.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use url::Url;

/// HTTP fetcher shared by the orchestrator and all pipelines
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl PageFetcher {
    /// Create a fetcher with the given retry/politeness behavior
    #[must_use]
    pub fn new(config: FetchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch a listing page, retrying indefinitely on non-success status.
    ///
    /// Transport-level errors are not retried: the caller (the pagination
    /// loop) has no isolation boundary and treats them as fatal.
    pub async fn fetch_unbounded(&self, url: &Url) -> Result<Vec<u8>> {
        loop {
            let response = self.get(url).await?;
            if response.status().is_success() {
                return Ok(response.bytes().await?.to_vec());
            }
            tracing::warn!(
                status = response.status().as_u16(),
                %url,
                delay_ms = self.config.listing_retry_delay.as_millis() as u64,
                "non-success listing response, waiting before retry"
            );
            tokio::time::sleep(self.config.listing_retry_delay).await;
        }
    }

    /// Fetch with a bounded retry budget.
    ///
    /// Both non-success statuses and transport errors consume the budget;
    /// once it is spent the result is [`Error::ExhaustedRetries`].
    pub async fn fetch_bounded(&self, url: &Url, max_retries: u32) -> Result<Vec<u8>> {
        let mut remaining = max_retries;
        loop {
            match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(error) if remaining > 0 => {
                    remaining -= 1;
                    tracing::info!(
                        error = %error,
                        %url,
                        remaining,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        "fetch failed, waiting before retry"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(error) => {
                    tracing::error!(error = %error, %url, "giving up");
                    return Err(Error::ExhaustedRetries {
                        url: url.to_string(),
                        attempts: max_retries + 1,
                    });
                }
            }
        }
    }

    /// Fetch archive content: bounded retries, then the politeness pause.
    ///
    /// The pause runs after every successful fetch, bounding outbound
    /// request rate independent of how many downloads run concurrently.
    pub async fn fetch_archive(&self, url: &Url, max_retries: u32) -> Result<Vec<u8>> {
        let body = self.fetch_bounded(url, max_retries).await?;
        tokio::time::sleep(self.config.politeness_delay).await;
        Ok(body)
    }

    async fn try_fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .header("cache-control", "no-cache")
            .send()
            .await?;
        Ok(response)
    }
}
