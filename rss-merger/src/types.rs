use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub use interfaces::{SourceDescriptor, SourceId, UserId};

/// One entry of a source feed, as found at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    /// Position inside the source document. Only meaningful within one fetch.
    pub sequence_index: usize,
    pub title: String,
    pub link: String,
}

/// Title and items read from one feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub items: Vec<FeedItem>,
}

impl ParsedFeed {
    pub fn for_source(self, source_id: SourceId) -> FetchedFeed {
        FetchedFeed {
            source_id,
            title: self.title,
            items: self.items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    pub source_id: SourceId,
    pub title: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedItem {
    pub item: FeedItem,
    pub origin_source_id: SourceId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFeed {
    pub title: String,
    pub items: Vec<MergedItem>,
}

impl MergedFeed {
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    /// Concatenates successful outcomes in the order given.
    pub fn merge(title: impl Into<String>, outcomes: &[FetchOutcome]) -> Self {
        let items = outcomes
            .iter()
            .filter_map(FetchOutcome::feed)
            .flat_map(|feed| {
                feed.items.iter().map(move |item| MergedItem {
                    item: item.clone(),
                    origin_source_id: feed.source_id,
                })
            })
            .collect();

        Self {
            title: title.into(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchedFeed),
    Failure {
        source_id: SourceId,
        kind: ErrorKind,
        message: String,
    },
}

impl FetchOutcome {
    pub fn from_result(source_id: SourceId, result: std::result::Result<ParsedFeed, SourceError>) -> Self {
        match result {
            Ok(feed) => FetchOutcome::Success(feed.for_source(source_id)),
            Err(e) => FetchOutcome::failure(source_id, &e),
        }
    }

    pub fn failure(source_id: SourceId, error: &SourceError) -> Self {
        FetchOutcome::Failure {
            source_id,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn source_id(&self) -> SourceId {
        match self {
            FetchOutcome::Success(feed) => feed.source_id,
            FetchOutcome::Failure { source_id, .. } => *source_id,
        }
    }

    pub fn feed(&self) -> Option<&FetchedFeed> {
        match self {
            FetchOutcome::Success(feed) => Some(feed),
            FetchOutcome::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Result of one aggregation pass: the merged feed plus one outcome per
/// source, in source order.
#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub merged: MergedFeed,
    pub outcomes: Vec<FetchOutcome>,
}

impl AggregationReport {
    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Raw response of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "rss-merger/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 0,
            retry_delay_seconds: 1,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus,
    MalformedFeed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::MalformedFeed => "malformed_feed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::Timeout(_) => ErrorKind::Timeout,
            FetchError::HttpStatus(_) => ErrorKind::HttpStatus,
        }
    }

    /// Failures worth another attempt under a retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Timeout(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
}

impl ParseError {
    pub fn malformed(cause: impl Into<String>) -> Self {
        ParseError::MalformedFeed(cause.into())
    }
}

/// Anything that can go wrong in one source's fetch-parse-filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Fetch(e) => e.kind(),
            SourceError::Parse(_) => ErrorKind::MalformedFeed,
        }
    }
}

/// Setup-level failures; per-source failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
