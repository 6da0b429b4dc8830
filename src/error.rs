//! Error types for the plugin.xml patcher
//!
//! Covers the failure modes of a patch run: malformed input manifests,
//! filesystem failures and configuration problems.
//! Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for patcher operations
pub type Result<T> = std::result::Result<T, PatcherError>;

/// Error type for patcher operations
#[derive(Error, Debug)]
pub enum PatcherError {
    /// Source file is not well-formed XML
    #[error("Malformed manifest {}: {message}", .path.display())]
    MalformedManifest { path: PathBuf, message: String },

    /// I/O errors (unreadable source, unwritable destination)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Patch spec failed validation
    #[error("Invalid patch spec: {0}")]
    Validation(String),

    /// Source file pattern errors
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl PatcherError {
    /// Build a `MalformedManifest` error for `path`
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PatcherError::MalformedManifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error only concerns the structure of one input file
    ///
    /// Everything else (I/O, configuration) is fatal for the whole run.
    pub fn is_malformed(&self) -> bool {
        matches!(self, PatcherError::MalformedManifest { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_file() {
        let err = PatcherError::malformed("META-INF/plugin.xml", "unexpected end of input");
        let msg = err.to_string();
        assert!(msg.contains("META-INF/plugin.xml"));
        assert!(msg.contains("unexpected end of input"));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_io_is_not_malformed() {
        let err: PatcherError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_malformed());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
