// src/error.rs

use reqwest::{Method, StatusCode};
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by storage sinks so SDK error types stay private.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid dataset URL {url}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("{method} {url} failed on attempt {attempt}")]
    Transport {
        method: Method,
        url: String,
        attempt: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status} after {attempts} attempt(s)")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        attempts: u32,
    },

    #[error("reading body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Number of requests issued before the error, when known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            FetchError::Transport { attempt, .. } => Some(*attempt),
            FetchError::Status { attempts, .. } => Some(*attempts),
            FetchError::Client(_) | FetchError::Body { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("bytes are not a readable spreadsheet")]
    Workbook(#[from] calamine::Error),

    #[error("workbook contains no worksheets")]
    NoSheets,

    #[error("worksheet `{0}` has no header row")]
    Empty(String),

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema lists {expected} columns but the table has {found}")]
    ColumnCount { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("serializing table to CSV")]
    Serialize(#[from] csv::Error),

    #[error("writing {destination} failed on both primary and fallback paths (primary: {primary})")]
    Exhausted {
        destination: String,
        primary: BoxError,
        #[source]
        fallback: BoxError,
    },
}

/// Any fatal failure of a load run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
