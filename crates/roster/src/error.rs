//! Error types for roster parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a roster document.
#[derive(Error, Debug)]
pub enum Error {
    /// The document matches none of the recognized shapes.
    #[error("unrecognized roster format: {0}")]
    Format(String),

    /// An entry inside a recognized shape is malformed.
    #[error("invalid roster entry {entry}: {reason}")]
    Validation {
        /// The offending entry, serialized as JSON.
        entry: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The document is not valid YAML.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The roster file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for roster operations.
pub type Result<T> = std::result::Result<T, Error>;
