//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so that log lines and exit
//! messages can be grepped without parsing prose.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - HTTP_xxx: transport-level errors
//! - API_xxx: COROS envelope / payload errors
//! - AUTH_xxx: login and token errors
//! - ACT_xxx: activity operations
//! - FIT_xxx: FIT file decoding
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type. All library failures flow through this.
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Whether retrying the request may succeed
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Transport Errors
    // ============================================
    /// Connection failed
    HttpConnectionFailed,
    /// Request timeout
    HttpTimeout,
    /// Rate limited (HTTP 429)
    HttpRateLimited,
    /// Non-success HTTP status
    HttpStatus,

    // ============================================
    // API Envelope Errors
    // ============================================
    /// Envelope carried a non-"0000" result code
    ApiResult,
    /// Response body did not match the expected shape
    ApiMalformedResponse,

    // ============================================
    // Auth Errors
    // ============================================
    /// Neither a token nor username/password were provided
    AuthMissingCredentials,
    /// Login rejected by the server
    AuthLoginFailed,

    // ============================================
    // Activity Errors
    // ============================================
    /// Account has no activities / requested activity missing
    ActivityNotFound,
    /// Total activity count changed while paging through the listing
    ActivityListChanged,
    /// Server returned no export URL for the requested format
    ActivityNoExportUrl,

    // ============================================
    // FIT Errors
    // ============================================
    /// File is not a FIT container or is truncated
    FitMalformed,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Local filesystem error
    Io,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpConnectionFailed => "HTTP_CONNECTION_FAILED",
            Self::HttpTimeout => "HTTP_TIMEOUT",
            Self::HttpRateLimited => "HTTP_RATE_LIMITED",
            Self::HttpStatus => "HTTP_STATUS",

            Self::ApiResult => "API_RESULT",
            Self::ApiMalformedResponse => "API_MALFORMED_RESPONSE",

            Self::AuthMissingCredentials => "AUTH_MISSING_CREDENTIALS",
            Self::AuthLoginFailed => "AUTH_LOGIN_FAILED",

            Self::ActivityNotFound => "ACT_NOT_FOUND",
            Self::ActivityListChanged => "ACT_LIST_CHANGED",
            Self::ActivityNoExportUrl => "ACT_NO_EXPORT_URL",

            Self::FitMalformed => "FIT_MALFORMED",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Io => "IO_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpTimeout | Self::HttpRateLimited | Self::HttpConnectionFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Request timeout
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::HttpTimeout, msg)
    }

    /// Rate limited
    pub fn rate_limited() -> Self {
        Self::new(ErrorCode::HttpRateLimited, "Rate limited (HTTP 429)")
    }

    /// Non-success HTTP status
    pub fn http_status(status: u16, url: impl fmt::Display) -> Self {
        Self::new(ErrorCode::HttpStatus, format!("HTTP {} from {}", status, url))
    }

    /// Envelope carried an error result code
    pub fn api_result(result: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ApiResult,
            format!("{} (result code {:?})", message, result.to_string()),
        )
    }

    /// Response body did not match the expected shape
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiMalformedResponse, msg)
    }

    /// Neither token nor username/password provided
    pub fn missing_credentials() -> Self {
        Self::new(
            ErrorCode::AuthMissingCredentials,
            "No access token and no username/password provided",
        )
    }

    /// Login rejected
    pub fn login_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthLoginFailed, msg)
    }

    /// Requested activity missing
    pub fn activity_not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ActivityNotFound, msg)
    }

    /// Listing changed under us while paging
    pub fn list_changed(before: u64, after: u64) -> Self {
        Self::new(
            ErrorCode::ActivityListChanged,
            format!(
                "total activity count changed from {} to {} while fetching activities",
                before, after
            ),
        )
    }

    /// No export URL for the requested format
    pub fn no_export_url(label_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ActivityNoExportUrl,
            format!("no export URL returned for activity {}", label_id),
        )
    }

    /// Malformed FIT file
    pub fn fit_malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FitMalformed, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Library-wide Result type
pub type CorosResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::with_source(ErrorCode::HttpTimeout, "Request timeout", err)
        } else if err.is_connect() {
            Self::with_source(ErrorCode::HttpConnectionFailed, "Connection failed", err)
        } else {
            Self::with_source(ErrorCode::Unknown, "HTTP request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ApiMalformedResponse, "JSON parse error", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Io, "IO error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::timeout("request timed out");
        assert_eq!(err.code, ErrorCode::HttpTimeout);
        assert_eq!(err.code_str(), "HTTP_TIMEOUT");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::HttpTimeout.is_retryable());
        assert!(ErrorCode::HttpRateLimited.is_retryable());
        assert!(!ErrorCode::ApiResult.is_retryable());
        assert!(!ErrorCode::AuthLoginFailed.is_retryable());
    }

    #[test]
    fn test_api_result_display() {
        let err = AppError::api_result("1001", "account not exist");
        let text = err.to_string();
        assert!(text.contains("API_RESULT"));
        assert!(text.contains("1001"));
        assert!(text.contains("account not exist"));
    }

    #[test]
    fn test_list_changed_message() {
        let err = AppError::list_changed(120, 121);
        assert_eq!(err.code, ErrorCode::ActivityListChanged);
        assert!(err.message.contains("120"));
        assert!(err.message.contains("121"));
    }
}
