use thiserror::Error;

/// Plugin pull error types
#[derive(Error, Debug)]
pub enum PullError {
    /// Plugin list missing, unreadable or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// External artifact transport failed
    #[error("Transport error: {reference} - {message}")]
    TransportError { reference: String, message: String },

    /// Reference does not yield a usable version segment
    #[error("Invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    /// index.json or manifest blob missing or malformed
    #[error("Manifest parse error: {0}")]
    ManifestParseError(String),

    /// No layer produced a plugin binary, or the binary could not be written
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Sidecar metadata could not be generated
    #[error("Metadata error: {0}")]
    MetadataError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PullError {
    fn from(err: serde_json::Error) -> Self {
        PullError::SerializationError(err.to_string())
    }
}

/// Result type alias for plugin pull operations
pub type Result<T> = std::result::Result<T, PullError>;
