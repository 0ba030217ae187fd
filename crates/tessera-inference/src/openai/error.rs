//! Classification of OpenAI error responses.

use tessera_core::Error;

/// Error classes reported by OpenAI-compatible servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    AuthenticationError,
    RateLimitExceeded,
    ModelNotFound,
    ContextLengthExceeded,
    ServerError,
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether a caller-side retry could succeed. The pipeline never
    /// retries; this only feeds the log line.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationError => "authentication",
            Self::RateLimitExceeded => "rate_limit",
            Self::ModelNotFound => "model_not_found",
            Self::ContextLengthExceeded => "context_length",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }
}

/// Convert a classified failure into a tessera error.
///
/// `embedding` selects the `Error::Embedding` variant for the embeddings
/// endpoint; chat failures become `Error::Inference` (or `Error::Config`
/// for credential and model problems).
pub fn to_tessera_error(code: OpenAIErrorCode, message: &str, embedding: bool) -> Error {
    let msg = match code {
        OpenAIErrorCode::AuthenticationError => {
            return Error::Config(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::ModelNotFound => {
            return Error::Config(format!("Model not found: {}", message))
        }
        OpenAIErrorCode::RateLimitExceeded => format!("Rate limit exceeded: {}", message),
        OpenAIErrorCode::ContextLengthExceeded => format!("Context too long: {}", message),
        OpenAIErrorCode::ServerError => format!("Server error: {}", message),
        OpenAIErrorCode::Unknown => message.to_string(),
    };

    if embedding {
        Error::Embedding(msg)
    } else {
        Error::Inference(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_status() {
        assert_eq!(
            OpenAIErrorCode::from_response(401, "invalid_api_key"),
            OpenAIErrorCode::AuthenticationError
        );
        assert_eq!(
            OpenAIErrorCode::from_response(429, ""),
            OpenAIErrorCode::RateLimitExceeded
        );
        assert_eq!(
            OpenAIErrorCode::from_response(400, "model_not_found"),
            OpenAIErrorCode::ModelNotFound
        );
        assert_eq!(
            OpenAIErrorCode::from_response(400, "context_length_exceeded"),
            OpenAIErrorCode::ContextLengthExceeded
        );
        assert_eq!(
            OpenAIErrorCode::from_response(503, "overloaded"),
            OpenAIErrorCode::ServerError
        );
        assert_eq!(
            OpenAIErrorCode::from_response(418, "teapot"),
            OpenAIErrorCode::Unknown
        );
    }

    #[test]
    fn test_transient_codes() {
        assert!(OpenAIErrorCode::RateLimitExceeded.is_transient());
        assert!(OpenAIErrorCode::ServerError.is_transient());
        assert!(!OpenAIErrorCode::AuthenticationError.is_transient());
    }

    #[test]
    fn test_embedding_failures_map_to_embedding_variant() {
        let err = to_tessera_error(OpenAIErrorCode::ServerError, "boom", true);
        assert!(matches!(err, Error::Embedding(_)));

        let err = to_tessera_error(OpenAIErrorCode::ServerError, "boom", false);
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_auth_failures_are_config_errors() {
        let err = to_tessera_error(OpenAIErrorCode::AuthenticationError, "bad key", true);
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("bad key"));
    }
}
