//! Error types for the scan pipeline.
//!
//! Per-query problems never surface here: they are folded into the `"-1"`
//! sentinel and a [`QueryOutcome`](crate::models::QueryOutcome) on the
//! query result. These enums cover what can fail a whole operation.

use thiserror::Error;

/// A single page fetch failed before a body could be read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// A scan could not be prepared.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("site {site}: invalid {field} pattern: {source}")]
    Pattern {
        site: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("could not serialize scan request for caching: {0}")]
    CacheKey(#[from] serde_json::Error),
}

/// An idiom spec string could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("could not parse spec item `{0}` (expected KIND:VALUE)")]
    Item(String),
    #[error("could not parse AXN `{0}` (expected base phrase,singular noun,plural noun)")]
    Axn(String),
    #[error("unknown spec kind `{0}` (expected AXN or SC)")]
    Kind(String),
}

/// Chart or table shaping failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("baseline site `{0}` is not part of the scan")]
    MissingBaseline(String),
}

/// Loading site descriptors from disk failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
