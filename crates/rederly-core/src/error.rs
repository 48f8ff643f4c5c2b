//! Error types module
//!
//! All client-side failures are unified under the [`ApiError`] enum so that
//! calling code can branch on kind instead of inspecting error shapes at each
//! call site. Errors are constructed at the API-client boundary: transport
//! failures become `Network`, recognizable backend error envelopes become
//! `Backend`, and locally detected problems become `Validation` or `Protocol`.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure: timeout, connection error, or a non-2xx response
    /// whose body carried no recognizable error envelope.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Structured backend error: the response carried a human-readable
    /// message envelope. 400-class instances are displayable to the user
    /// without being logged as unexpected.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Locally detected invalid input (e.g. a filename outside constraints).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Locally detected invariant violation (e.g. uploading with no file
    /// set, or a regrade check with no scope configured).
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Whether this error is an expected, user-correctable condition.
    /// Expected errors are surfaced to the user without error-level logging.
    pub fn is_expected(&self) -> bool {
        match self {
            ApiError::Backend { status, .. } => (400..500).contains(status),
            ApiError::Validation(_) => true,
            ApiError::Network { .. } | ApiError::Protocol(_) => false,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => "NETWORK_ERROR",
            ApiError::Backend { .. } => "BACKEND_ERROR",
            ApiError::Validation(_) => "INVALID_INPUT",
            ApiError::Protocol(_) => "PROTOCOL_ERROR",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            ApiError::Backend { status, .. } if (400..500).contains(status) => LogLevel::Debug,
            ApiError::Validation(_) => LogLevel::Debug,
            ApiError::Backend { .. } => LogLevel::Warn,
            ApiError::Network { .. } => LogLevel::Warn,
            ApiError::Protocol(_) => LogLevel::Error,
        }
    }

    /// Client-facing message (may differ from the internal error message)
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network { .. } => {
                "Could not reach the server. Check your connection and try again".to_string()
            }
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Protocol(_) => "Something went wrong. Please try again".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(format!("Validation error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_4xx_is_expected() {
        let err = ApiError::Backend {
            status: 400,
            message: "Topic is already being regraded".to_string(),
        };
        assert!(err.is_expected());
        assert_eq!(err.error_code(), "BACKEND_ERROR");
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(err.user_message(), "Topic is already being regraded");
    }

    #[test]
    fn backend_5xx_is_unexpected() {
        let err = ApiError::Backend {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_expected());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn network_error_hides_detail_from_user() {
        let err = ApiError::Network {
            message: "connection refused".to_string(),
        };
        assert!(!err.is_expected());
        assert!(!err.user_message().contains("connection refused"));
    }

    #[test]
    fn protocol_error_logs_at_error_level() {
        let err = ApiError::Protocol("no file selected".to_string());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert_eq!(err.error_code(), "PROTOCOL_ERROR");
    }
}
