//! Error types for the budgetchat retrieval pipeline
//!
//! Upstream service failures (embedding API, vector index) propagate out of
//! the retriever unretried; the caller decides whether to degrade to a
//! neutral "no evidence" context. Empty result sets are not errors.

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Embedding API returned a non-success status
    #[error("Embedding API error {status}: {message}")]
    EmbeddingApi { status: u16, message: String },

    /// Embedding response did not line up with the request batch
    #[error("Embedding count mismatch: sent {sent} texts, received {received} vectors")]
    EmbeddingMismatch { sent: usize, received: usize },

    /// Vector index operation failed
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
