use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Broad cause of a failed fetch.  The extractor retries both kinds the same
/// way, the split only exists so the policy can be changed in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Payload,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} for query '{query}'")]
    Status { status: StatusCode, query: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid time in response: {0}")]
    Timestamp(#[from] jiff::Error),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) | FetchError::Status { .. } => FailureKind::Transport,
            FetchError::Decode(_) | FetchError::Timestamp(_) => FailureKind::Payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("failed to read locations file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse locations file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error("'{0}' is not a valid table name")]
    InvalidTable(String),
}
