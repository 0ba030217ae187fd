//! Error types for tessera.

use thiserror::Error;

/// Result type alias using tessera's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tessera operations.
///
/// The first four variants form the cataloging taxonomy: extraction,
/// matching and persistence failures abort `categorize()`, while embedding
/// failures are absorbed by the orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    /// Concept extraction failed (transport or API failure of the model call)
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Matching concepts against the vocabulary failed
    #[error("Matching error: {0}")]
    Matching(String),

    /// Writing or reading tag metadata failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Embedding generation or vector storage failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the errors that abort a `categorize()` call (stages 1-3).
    pub fn is_fatal_stage(&self) -> bool {
        matches!(
            self,
            Error::Extraction(_) | Error::Matching(_) | Error::Persistence(_)
        )
    }

    /// Re-wrap any error as an extraction failure, keeping its message.
    pub fn into_extraction(self) -> Self {
        match self {
            Error::Extraction(_) => self,
            other => Error::Extraction(other.to_string()),
        }
    }

    /// Re-wrap any error as a matching failure, keeping its message.
    pub fn into_matching(self) -> Self {
        match self {
            Error::Matching(_) => self,
            other => Error::Matching(other.to_string()),
        }
    }

    /// Re-wrap any error as a persistence failure, keeping its message.
    pub fn into_persistence(self) -> Self {
        match self {
            Error::Persistence(_) => self,
            other => Error::Persistence(other.to_string()),
        }
    }

    /// Re-wrap any error as an embedding failure, keeping its message.
    pub fn into_embedding(self) -> Self {
        match self {
            Error::Embedding(_) => self,
            other => Error::Embedding(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
