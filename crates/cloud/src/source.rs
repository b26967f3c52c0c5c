//! Source references: where a layer's raster bytes live.

use std::fmt;
use std::path::{Path, PathBuf};

/// A dereferenceable raster location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRef {
    /// `http://` or `https://` URL
    Url(String),
    /// Local file, given as a plain path or a `file://` URL
    Path(PathBuf),
}

impl SourceRef {
    /// Interpret a catalog string as a source reference.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceRef::Url(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            SourceRef::Path(PathBuf::from(path))
        } else {
            SourceRef::Path(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceRef::Url(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            SourceRef::Path(p) => Some(p),
            SourceRef::Url(_) => None,
        }
    }

    /// Final path segment, without query string
    pub fn file_name(&self) -> Option<&str> {
        match self {
            SourceRef::Url(u) => {
                let no_query = u.split(['?', '#']).next().unwrap_or(u);
                no_query.rsplit('/').next().filter(|s| !s.is_empty())
            }
            SourceRef::Path(p) => p.file_name().and_then(|s| s.to_str()),
        }
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        SourceRef::parse(s)
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        SourceRef::parse(&s)
    }
}

impl From<PathBuf> for SourceRef {
    fn from(p: PathBuf) -> Self {
        SourceRef::Path(p)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Url(u) => f.write_str(u),
            SourceRef::Path(p) => write!(f, "{}", p.display()),
        }
    }
}
