use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the chat recap crates.
#[derive(Error, Debug)]
pub enum RecapError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The caller did not supply a user data root.
    #[error("User data path not found")]
    MissingRoot,

    /// A character card image carried no usable embedded metadata.
    #[error("Invalid character card {path}: {reason}")]
    CardParse { path: PathBuf, reason: String },

    /// Report generation failed unexpectedly; nothing was cached.
    #[error("Failed to generate annual summary: {0}")]
    Generation(String),
}

/// Convenience alias used throughout the recap crates.
pub type Result<T> = std::result::Result<T, RecapError>;
