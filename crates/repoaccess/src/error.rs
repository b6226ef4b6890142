//! Error types for repository access.
//!
//! Errors are categorized so callers can give appropriate feedback. The
//! reconciliation engine never retries on its own; [`ErrorCategory::is_retryable`]
//! only tells an operator whether re-running is likely to help.

use std::fmt;

/// Result type alias for repository access operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of repository access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, timeout or server-side failure (transient).
    Network,
    /// Missing, invalid or under-privileged credentials.
    Auth,
    /// Repository or user does not exist (or is hidden from the token).
    NotFound,
    /// API rate limit exceeded.
    RateLimited,
    /// Unexpected response shape or bad input.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth re-running.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication or authorization failure",
            Self::NotFound => "Repository or user not found",
            Self::RateLimited => "API rate limit exceeded",
            Self::Format => "Unexpected data",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your connection and re-run; the sync is safe to repeat",
            Self::Auth => "Check that the token is valid and has admin access to the repository",
            Self::NotFound => "Verify the repository name and that the token can see it",
            Self::RateLimited => "Wait for the rate limit window to reset, then re-run",
            Self::Format => "Check the API URL points at a GitHub REST endpoint",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the remote repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Response could not be interpreted.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Repository reference is not of the form `owner/name`.
    #[error("invalid repository '{0}', expected owner/name")]
    InvalidRepo(String),

    /// A request URL could not be built from the API base.
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// HTTP status code, when the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                Some(401 | 403) => ErrorCategory::Auth,
                Some(404) => ErrorCategory::NotFound,
                Some(429) => ErrorCategory::RateLimited,
                Some(422) => ErrorCategory::Format,
                _ => ErrorCategory::Network,
            },
            Self::InvalidResponse(_) | Self::InvalidRepo(_) => ErrorCategory::Format,
            Self::InvalidUrl(_) | Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::RateLimited.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
        assert!(!ErrorCategory::Other.is_retryable());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Network.advice().is_empty());
        assert!(!ErrorCategory::Auth.advice().is_empty());
        assert!(!ErrorCategory::NotFound.advice().is_empty());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::RateLimited);
        assert!(display.contains("rate limit"));
    }

    #[test]
    fn test_http_status_categories() {
        assert_eq!(Error::http("HTTP 401", Some(401)).category(), ErrorCategory::Auth);
        assert_eq!(Error::http("HTTP 403", Some(403)).category(), ErrorCategory::Auth);
        assert_eq!(Error::http("HTTP 404", Some(404)).category(), ErrorCategory::NotFound);
        assert_eq!(
            Error::http("HTTP 429", Some(429)).category(),
            ErrorCategory::RateLimited
        );
        assert_eq!(Error::http("HTTP 502", Some(502)).category(), ErrorCategory::Network);
        assert_eq!(Error::http("reset", None).category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_ureq_status_code() {
        let err: Error = ureq::Error::StatusCode(404).into();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP request failed: HTTP 404");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<u64>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_invalid_repo_display() {
        let err = Error::InvalidRepo("nope".to_string());
        assert!(err.to_string().contains("owner/name"));
    }
}
