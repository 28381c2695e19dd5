use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Timed out: {message}")]
    Timeout { message: String },

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error came from an external provider call (including timeouts)
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Query record 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Query record 'abc' not found");
    }

    #[test]
    fn test_provider_error() {
        let error = DomainError::provider("groq", "HTTP 429: rate limited");
        assert_eq!(
            error.to_string(),
            "Provider error: groq - HTTP 429: rate limited"
        );
        assert!(error.is_provider_failure());
    }

    #[test]
    fn test_timeout_counts_as_provider_failure() {
        let error = DomainError::timeout("openai call exceeded 60000ms");
        assert_eq!(error.to_string(), "Timed out: openai call exceeded 60000ms");
        assert!(error.is_provider_failure());
        assert!(!DomainError::validation("bad").is_provider_failure());
    }

    #[test]
    fn test_index_error() {
        let error = DomainError::index("dimension mismatch");
        assert_eq!(error.to_string(), "Vector index error: dimension mismatch");
    }
}
