//! # Proxima Cloud
//!
//! Retrieval of raster sources and of the layer catalog.
//!
//! Sources are either local files or HTTP(S) URLs. Remote bodies are
//! downloaded whole with timeout and exponential-backoff retry, then decoded
//! by `proxima-core`. The [`blocking`] module wraps everything in a
//! current-thread Tokio runtime for synchronous callers.

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod http;
pub mod source;
pub mod sync_api;

pub use catalog::{Catalog, CatalogClient};
pub use error::{CloudError, Result};
pub use fetch::{FetchOptions, RasterFetcher, SourceFetcher};
pub use source::SourceRef;

/// Blocking API re-exported as `blocking` module.
pub mod blocking {
    pub use crate::sync_api::*;
}
