//! Async raster source fetcher.
//!
//! Downloads (or reads) the full bytes behind a [`SourceRef`] and decodes
//! them into a [`RasterDataset`]. Either a complete dataset comes back or an
//! error; nothing partial.

use std::time::Duration;

use futures::stream::{FuturesOrdered, StreamExt};
use proxima_core::io::read_dataset_from_buffer;
use proxima_core::RasterDataset;
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::source::SourceRef;

/// Configuration for [`SourceFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum retries on timeouts and connection failures (default 3).
    pub max_retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Anything that can turn a source reference into a decoded dataset.
pub trait RasterFetcher {
    /// Retrieve and decode one source.
    fn fetch(&self, source: &SourceRef) -> Result<RasterDataset>;

    /// Retrieve several sources; results come back in input order.
    fn fetch_all(&self, sources: &[SourceRef]) -> Vec<Result<RasterDataset>> {
        sources.iter().map(|s| self.fetch(s)).collect()
    }
}

/// Async fetcher for local and remote rasters.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http: HttpClient,
}

impl SourceFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let http = HttpClient::new(options.request_timeout, options.max_retries)?;
        Ok(Self { http })
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Retrieve the raw bytes behind a source reference.
    pub async fn fetch_bytes(&self, source: &SourceRef) -> Result<Vec<u8>> {
        match source {
            SourceRef::Url(url) => {
                info!("Downloading {}", url);
                self.http.get_bytes(url).await
            }
            SourceRef::Path(path) => {
                debug!("Reading {}", path.display());
                std::fs::read(path).map_err(|e| CloudError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        }
    }

    /// Retrieve and decode one source.
    pub async fn fetch(&self, source: &SourceRef) -> Result<RasterDataset> {
        let bytes = self.fetch_bytes(source).await?;
        let dataset = read_dataset_from_buffer(&bytes)?;
        debug!(
            "Opened {}: {}x{}, {} band(s), {}",
            source,
            dataset.width(),
            dataset.height(),
            dataset.band_count(),
            dataset.dtype()
        );
        Ok(dataset)
    }

    /// Retrieve several sources concurrently, joined before returning.
    ///
    /// Results are in input order, one per source.
    pub async fn fetch_all(&self, sources: &[SourceRef]) -> Vec<Result<RasterDataset>> {
        let mut futs = FuturesOrdered::new();
        for source in sources {
            futs.push_back(self.fetch(source));
        }

        let mut results = Vec::with_capacity(sources.len());
        while let Some(res) = futs.next().await {
            results.push(res);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let fetcher = SourceFetcher::new(FetchOptions::default()).unwrap();
        let err = fetcher
            .fetch(&SourceRef::parse("/definitely/not/here.tif"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Io { .. }));
        assert!(err.is_retrieval());
    }

    #[tokio::test]
    async fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.tif");
        std::fs::write(&path, b"this is not a raster").unwrap();

        let fetcher = SourceFetcher::new(FetchOptions::default()).unwrap();
        let err = fetcher.fetch(&SourceRef::Path(path)).await.unwrap_err();
        assert!(matches!(err, CloudError::Decode(_)));
        assert!(!err.is_retrieval());
    }
}
