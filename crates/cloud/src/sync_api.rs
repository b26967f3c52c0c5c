//! Blocking (synchronous) API.
//!
//! Wraps the async fetcher and catalog client with a single-threaded Tokio
//! runtime so callers don't need to manage their own async runtime.

use proxima_core::RasterDataset;

use crate::catalog::{Catalog, CatalogClient};
use crate::error::{CloudError, Result};
use crate::fetch::{FetchOptions, RasterFetcher, SourceFetcher};
use crate::source::SourceRef;

fn current_thread_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CloudError::Network(e.to_string()))
}

/// Blocking wrapper around [`SourceFetcher`].
pub struct BlockingFetcher {
    rt: tokio::runtime::Runtime,
    inner: SourceFetcher,
}

impl BlockingFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let rt = current_thread_runtime()?;
        let inner = SourceFetcher::new(options)?;
        Ok(Self { rt, inner })
    }

    /// Retrieve the raw bytes behind a source (blocking).
    pub fn fetch_bytes(&self, source: &SourceRef) -> Result<Vec<u8>> {
        self.rt.block_on(self.inner.fetch_bytes(source))
    }
}

impl RasterFetcher for BlockingFetcher {
    fn fetch(&self, source: &SourceRef) -> Result<RasterDataset> {
        self.rt.block_on(self.inner.fetch(source))
    }

    fn fetch_all(&self, sources: &[SourceRef]) -> Vec<Result<RasterDataset>> {
        self.rt.block_on(self.inner.fetch_all(sources))
    }
}

/// One-shot: load a catalog from a URL or local file (blocking).
pub fn load_catalog(location: &SourceRef, options: FetchOptions) -> Result<Catalog> {
    if let SourceRef::Path(path) = location {
        return Catalog::from_file(path);
    }
    let rt = current_thread_runtime()?;
    let client = CatalogClient::new(options)?;
    rt.block_on(client.load(location))
}

/// One-shot: fetch and decode a single source (blocking).
pub fn fetch_dataset(source: &SourceRef, options: FetchOptions) -> Result<RasterDataset> {
    BlockingFetcher::new(options)?.fetch(source)
}
