//! Constants Module - Single Source of Truth
//!
//! All endpoint bases, header names and tunables used across the
//! application are defined here. No hardcoded values in other modules.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "corostc";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "corostc/0.1.0";

// ============================================
// COROS ENDPOINTS
// ============================================

/// Default API base (override with COROS_API_BASE)
pub const DEFAULT_API_BASE: &str = "https://teamapi.coros.com";

/// Default web frontend base (override with COROS_WEB_BASE).
/// Used only to print clickable activity URLs.
pub const DEFAULT_WEB_BASE: &str = "https://t.coros.com";

/// Header carrying the session token on every authenticated request
pub const ACCESS_TOKEN_HEADER: &str = "accessToken";

/// Browser cookie whose value doubles as an access token.
/// COROS enforces single-session login; reusing this cookie value lets a
/// CLI session coexist with an open browser session.
pub const TOKEN_COOKIE_NAME: &str = "CPL-coros-token";

/// `accountType` sent with password logins (2 = email account)
pub const ACCOUNT_TYPE_EMAIL: u8 = 2;

/// Envelope result code meaning success
pub const RESULT_OK: &str = "0000";

// ============================================
// HTTP TUNABLES
// ============================================

/// Default timeout for API requests (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default page size when listing activities
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 1000;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 16000;

/// Maximum retry attempts for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Jitter percentage applied to retry delays
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// UPLOAD MATCHING
// ============================================

/// Tolerance when matching an uploaded FIT file's session start time
/// against the activity listing (seconds)
pub const UPLOAD_MATCH_TOLERANCE_SECS: i64 = 1;
