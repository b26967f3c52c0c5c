//! Error types for source retrieval and catalog loading.

use thiserror::Error;

/// Errors produced while fetching sources or the layer catalog.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layer catalog: {0}")]
    Catalog(String),

    #[error("{0}")]
    Decode(#[from] proxima_core::Error),
}

impl CloudError {
    /// True for transport failures, false when bytes arrived but could not
    /// be understood.
    pub fn is_retrieval(&self) -> bool {
        !matches!(self, CloudError::Decode(_) | CloudError::Catalog(_))
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(e: serde_json::Error) -> Self {
        CloudError::Catalog(e.to_string())
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
