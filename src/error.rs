use thiserror::Error;

/// Errors raised while turning a raw XML document into a [`Feed`](crate::model::Feed).
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document root is neither `rss` nor `rdf:RDF`.
    #[error("Unsupported feed type: {0}")]
    UnsupportedFormat(String),
    /// A mandatory element never appeared before its parent closed.
    #[error("Missing required element: {0}")]
    MissingField(&'static str),
    #[error("Document has no root element")]
    EmptyDocument,
    /// The input ended while an element was still open.
    #[error("Document ended before all elements were closed")]
    Truncated,
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// No date pattern matched the input.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized date format: {input:?}")]
pub struct DateParseError {
    pub input: String,
}

/// Errors from a single source's fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body-read failure.
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// Transport failures are retried; a document that fails to parse is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::HttpStatus(_))
    }
}

/// Every source that failed during one refresh.
#[derive(Debug, Error)]
#[error("{} of {total} feeds failed to refresh", .failures.len())]
pub struct BatchFetchError {
    pub total: usize,
    pub failures: Vec<ReaderError>,
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to fetch feed '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Batch(#[from] BatchFetchError),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
