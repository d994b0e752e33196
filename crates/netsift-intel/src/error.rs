//! Error types for the indicator subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntelError {
    #[error("failed to read indicator file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse indicator file {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, IntelError>;
