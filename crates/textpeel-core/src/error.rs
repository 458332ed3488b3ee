//! Error types for textpeel.

use thiserror::Error;

use crate::limits::TimeValue;

/// Top level extraction errors. Anything that reaches this type aborts the
/// whole extraction; format-local parse failures never become an
/// `ExtractError`, decomposers recover from those internally by yielding
/// fewer children.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A decompose step exceeded its time budget
    #[error("extraction exceeded time budget: <{uri}> after {timeout}")]
    Timeout { uri: String, timeout: TimeValue },

    /// A decomposer hit a condition it cannot route around
    #[error("decompose error: {0}")]
    Decompose(#[from] DecomposeError),

    /// A size string could not be parsed
    #[error("invalid size: <{0}>")]
    InvalidSize(String),

    /// The root input could not be read
    #[error("cannot read input <{uri}>: {source}")]
    Input {
        uri: String,
        source: std::io::Error,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal decomposer errors. There is deliberately no "recoverable" variant:
/// a decomposer that can continue after a malformed row/entry logs it and
/// yields fewer children instead of returning an error.
#[derive(Error, Debug)]
pub enum DecomposeError {
    /// Encrypted content that cannot even be attempted
    #[error("encrypted data: <{uri}>({mime_type})")]
    Encrypted { uri: String, mime_type: String },

    /// I/O failure on the container itself
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_node_and_budget() {
        let err = ExtractError::Timeout {
            uri: "file:///archive.zip/slow.bin".to_string(),
            timeout: TimeValue::from_secs(3.0),
        };
        assert_eq!(
            err.to_string(),
            "extraction exceeded time budget: <file:///archive.zip/slow.bin> after 3.00s"
        );
    }

    #[test]
    fn test_encrypted_display() {
        let err = DecomposeError::Encrypted {
            uri: "secret.zip".to_string(),
            mime_type: "application/zip".to_string(),
        };
        assert_eq!(err.to_string(), "encrypted data: <secret.zip>(application/zip)");
    }

    #[test]
    fn test_decompose_error_wraps_into_extract_error() {
        let err: ExtractError = DecomposeError::Encrypted {
            uri: "a.zip".to_string(),
            mime_type: "application/zip".to_string(),
        }
        .into();
        assert!(matches!(err, ExtractError::Decompose(_)));
        assert!(err.to_string().contains("a.zip"));
    }

    #[test]
    fn test_invalid_size_display() {
        let err = ExtractError::InvalidSize("huge".to_string());
        assert_eq!(err.to_string(), "invalid size: <huge>");
    }
}
