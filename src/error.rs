//! Error types for the Scribe gateway

use thiserror::Error;

/// Result type alias for Scribe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Scribe gateway
///
/// Low classification confidence is deliberately NOT an error: it is a
/// routing outcome that the processor maps to an `unsupported` response.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// File or identity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// File extension outside the supported set
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Structured file (PDF, Word document) could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Classification call failed or returned an unusable result
    #[error("classification error: {0}")]
    Classification(String),

    /// Summarization call failed
    #[error("summarization error: {0}")]
    Summarization(String),

    /// Durable storage flush or load failed
    ///
    /// Surfaced to the caller distinctly from conversational failures:
    /// losing buffered pairs is a data-loss risk, and the caller decides
    /// whether to retry the flush.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
