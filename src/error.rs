//! Error types for configuration, embedding, search and backfill writes.
//!
//! Each external call site gets its own error type so the caller can decide
//! how far a failure is allowed to travel:
//!
//! - [`ConfigError`] is fatal and stops the process before any client exists.
//! - [`EmbeddingError`] aborts the current request only.
//! - [`SearchError`] degrades a search to an empty result set.
//! - [`WriteError`] is logged per record during a backfill.
//! - [`StoreError`] covers connecting and opening the backfill scan.
//!
//! Command runners return [`AppError`], which wraps the failures that end a
//! command: configuration, connecting or scanning, and terminal IO.

use std::io::Error as IoError;

use mongodb::error::Error as MongoError;
use reqwest::Error as ReqwestError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

/// Missing or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required settings were unset or blank.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// The YAML config file could not be read.
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: IoError,
    },

    /// The YAML config file is malformed.
    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: YamlError,
    },

    /// No per-platform configuration directory could be determined.
    #[error("unable to determine config directory")]
    NoConfigDir,
}

/// Failure while asking the embedding service for a vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] ReqwestError),

    #[error("embedding service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unable to decode embedding response: {0}")]
    Decode(String),

    #[error("embedding service returned an empty vector")]
    Empty,
}

/// Failure while running a vector search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] MongoError),

    #[error("unable to decode search row: {0}")]
    Decode(String),

    /// Used by test doubles and anything that is not a driver error.
    #[error("{0}")]
    Other(String),
}

/// Failure while writing an embedding back onto a record.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("update failed: {0}")]
    Update(#[from] MongoError),

    #[error("no document matched _id {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Failure while connecting to the store or scanning it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to connect to MongoDB: {0}")]
    Connect(#[source] MongoError),

    #[error("scan failed: {0}")]
    Scan(String),
}

/// Top-level error returned by command runners.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] YamlError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_lists_every_key() {
        let err = ConfigError::Missing(vec!["MONGO_URI", "GOOGLE_API_KEY"]);
        assert_eq!(
            err.to_string(),
            "missing required configuration: MONGO_URI, GOOGLE_API_KEY"
        );
    }

    #[test]
    fn test_app_error_is_transparent() {
        let err: AppError = StoreError::Scan("cursor closed".to_string()).into();
        assert_eq!(err.to_string(), "scan failed: cursor closed");

        let err: AppError = ConfigError::Missing(vec!["DB_NAME"]).into();
        assert_eq!(err.to_string(), "missing required configuration: DB_NAME");
    }
}
