use std::path::PathBuf;

use chrono::NaiveDate;

use crate::model::canteen::Canteen;
use crate::model::menu::WeekKey;

/// Upstream page could not be retrieved.
///
/// A missing page for a single date is not a `FetchError`; sources report it
/// as a closed day instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to set up HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            FetchError::Client(_) => false,
        }
    }
}

/// Structural mismatch between the upstream markup and what the parser expects.
#[derive(Debug, thiserror::Error)]
#[error("cannot parse menu of {canteen} for {date}: {reason} (near `{fragment}`)")]
pub struct ParseError {
    pub canteen: Canteen,
    pub date: NaiveDate,
    pub reason: String,
    pub fragment: String,
}

impl ParseError {
    const MAX_FRAGMENT: usize = 200;

    pub fn new(canteen: Canteen, date: NaiveDate, reason: impl Into<String>, fragment: &str) -> Self {
        let fragment = fragment.trim();
        let fragment = match fragment.char_indices().nth(Self::MAX_FRAGMENT) {
            Some((idx, _)) => format!("{}...", &fragment[..idx]),
            None => fragment.to_string(),
        };

        Self {
            canteen,
            date,
            reason: reason.into(),
            fragment,
        }
    }
}

/// Week assignment of a fragment disagrees with the indexer.
#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    #[error("{canteen}: day {date} belongs to week {actual}, but fragment is keyed {expected}")]
    WeekMismatch {
        canteen: Canteen,
        date: NaiveDate,
        expected: WeekKey,
        actual: WeekKey,
    },

    #[error("fragment of {found} cannot be combined into menu of {expected}")]
    CanteenMismatch { expected: Canteen, found: Canteen },
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("no DeepL API key configured")]
    MissingApiKey,

    #[error("translation service rejected the request: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("translation service unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: usize, last: String },

    #[error("invalid response from translation service: {0}")]
    InvalidResponse(String),

    #[error("failed to set up HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("cannot translate {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: Box<PublishError>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CacheIoError {
    #[error("cannot read translation cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("translation cache {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write translation cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot render OpenMensa feed: {0}")]
    Feed(String),
}

impl PublishError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        PublishError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Failure of one canteen's fetch → parse → combine → publish run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("run aborted: {0}")]
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
