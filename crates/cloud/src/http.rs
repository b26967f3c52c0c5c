//! HTTP client wrapper with retry logic.

use crate::error::{CloudError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for downloading whole remote files.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries,
            request_timeout,
        })
    }

    /// GET a URL and return the full body.
    ///
    /// Any non-2xx status is an error carrying the status code.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.execute_with_retry(self.client.get(url)).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CloudError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await?;
        debug!("GET {} -> {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        String::from_utf8(bytes)
            .map_err(|e| CloudError::Network(format!("response from {url} is not UTF-8: {e}")))
    }

    /// Execute a request with exponential backoff retry.
    ///
    /// Only timeouts and connection failures are retried.
    async fn execute_with_retry(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff_ms = 100u64 * 2u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }

            let Some(cloned) = request.try_clone() else {
                return Ok(request.send().await?);
            };

            match cloned.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(
                        "Request attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(match last_err {
            Some(e) => e.into(),
            None => CloudError::Network("request was never sent".into()),
        })
    }

    /// Getter for the timeout duration.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
