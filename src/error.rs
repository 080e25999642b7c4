use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    /// Caller supplied an incomplete command, e.g. `ingest` without a path
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Input file {} is not valid JSON: {source}", path.display())]
    InputFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Input {0} must contain a top-level JSON array")]
    NotAnArray(String),

    /// A persisted log line failed to decode. Never recovered automatically.
    #[error("Corrupt scrobble log {} at line {line}: {source}", path.display())]
    StoreCorruption {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StationError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StationError>;
