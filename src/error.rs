//! Error types for the Redmine provider.

use thiserror::Error;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found on the Redmine server.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred (malformed identifier, bad attribute value).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown to this provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Authentication or authorization failure against the Redmine API.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation attempted before the provider was configured.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// The Redmine API rejected the request with a non-success status.
    #[error("Redmine API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// Response body or extracted error message.
        message: String,
    },

    /// An HTTP transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred in the serve loop.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// True if the error represents a missing remote object.
    ///
    /// Used by read paths to distinguish "drifted away, clear state" from
    /// genuine failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Attach resource-kind and identifier context to a client error.
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        match self {
            Self::NotFound(msg) => Self::NotFound(format!("{}: {}", what, msg)),
            Self::Validation(msg) => Self::Validation(format!("{}: {}", what, msg)),
            Self::Api { status, message } => Self::Api {
                status,
                message: format!("{}: {}", what, message),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("project 42".to_string());
        assert_eq!(format!("{}", err), "Resource not found: project 42");

        let err = ProviderError::Validation("invalid id".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid id");

        let err = ProviderError::UnknownResource("redmine_wiki".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: redmine_wiki");

        let err = ProviderError::Api {
            status: 422,
            message: "Name cannot be blank".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Redmine API error (status 422): Name cannot be blank"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".to_string()).is_not_found());
        assert!(!ProviderError::Validation("x".to_string()).is_not_found());
    }

    #[test]
    fn test_context_wrapping() {
        let err = ProviderError::NotFound("404".to_string()).context("reading issue 7");
        assert_eq!(
            format!("{}", err),
            "Resource not found: reading issue 7: 404"
        );

        // Variants without a message slot pass through unchanged
        let err = ProviderError::FailedPrecondition("not configured".to_string())
            .context("reading issue 7");
        assert_eq!(format!("{}", err), "Failed precondition: not configured");
    }
}
