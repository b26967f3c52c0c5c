//! Layer catalog client.
//!
//! The catalog is a JSON object mapping layer names to source references.
//! Listing endpoints behind an API gateway wrap it as
//! `{"body": "<json-encoded object>"}`; both shapes are accepted.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{CloudError, Result};
use crate::fetch::FetchOptions;
use crate::http::HttpClient;
use crate::source::SourceRef;

/// Ordered mapping of layer name to source reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<(String, SourceRef)>,
}

impl Catalog {
    /// Build a catalog from explicit entries, keeping their order.
    pub fn from_entries<I, N, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<SourceRef>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(n, s)| (n.into(), s.into()))
                .collect(),
        }
    }

    /// Parse a catalog document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let object = match value {
            // Gateway responses wrap the listing as a string under "body",
            // next to metadata such as "statusCode" and "headers". A plain
            // listing may still name a layer "body", so only an all-string
            // object whose "body" is not JSON is read as a listing.
            Value::Object(map) => {
                let body = match map.get("body") {
                    Some(Value::String(inner)) => Some((
                        serde_json::from_str::<Value>(inner),
                        inner.trim_start().starts_with('{'),
                    )),
                    _ => None,
                };
                match body {
                    None => map,
                    Some((Ok(Value::Object(m)), _)) => m,
                    Some((_, false)) if map.values().all(Value::is_string) => map,
                    Some((Ok(_), _)) => {
                        return Err(CloudError::Catalog(
                            "\"body\" does not hold a JSON object".into(),
                        ))
                    }
                    Some((Err(e), _)) => return Err(e.into()),
                }
            }
            _ => return Err(CloudError::Catalog("expected a JSON object".into())),
        };
        Self::from_object(object)
    }

    fn from_object(object: Map<String, Value>) -> Result<Self> {
        let mut entries = Vec::with_capacity(object.len());
        for (name, value) in object {
            match value {
                Value::String(s) => entries.push((name, SourceRef::parse(&s))),
                other => {
                    return Err(CloudError::Catalog(format!(
                        "layer '{}' has a non-string source: {}",
                        name, other
                    )))
                }
            }
        }
        Ok(Self { entries })
    }

    /// Read a catalog document from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CloudError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json_str(&text)
    }

    pub fn entries(&self) -> &[(String, SourceRef)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceRef)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn get(&self, name: &str) -> Option<&SourceRef> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Async client for the layer listing endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: HttpClient,
}

impl CatalogClient {
    pub fn new(options: FetchOptions) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(options.request_timeout, options.max_retries)?,
        })
    }

    /// GET and parse the catalog at `url`.
    pub async fn fetch(&self, url: &str) -> Result<Catalog> {
        let text = self.http.get_text(url).await?;
        let catalog = Catalog::from_json_str(&text)?;
        info!("Catalog at {} lists {} layer(s)", url, catalog.len());
        Ok(catalog)
    }

    /// Load a catalog from a URL or a local file.
    pub async fn load(&self, location: &SourceRef) -> Result<Catalog> {
        match location {
            SourceRef::Url(url) => self.fetch(url).await,
            SourceRef::Path(path) => Catalog::from_file(path),
        }
    }
}
