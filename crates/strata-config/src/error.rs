//! Errors raised while persisting generation settings.

use std::path::PathBuf;

/// Failure to read, write or (de)serialize `config.ron`.
///
/// Every variant carries the path involved so the demo can report it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid RON `Config`.
    #[error("failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to serialize generation settings: {0}")]
    SerializeError(#[source] ron::Error),
}
