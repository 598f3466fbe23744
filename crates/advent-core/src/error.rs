use std::path::PathBuf;

use thiserror::Error;

/// The persistence store could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode opened set: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("malformed unlock instant `{raw}`")]
    Malformed { raw: String },
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("rendering surface unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse content document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
