//! Configuration error types.

use std::path::PathBuf;

/// Errors from loading, saving or validating `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// A viewport option outside its usable range.
    #[error("invalid viewport option `{field}` = {value}: {expected}")]
    InvalidViewport {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}
