//! Error types for the commitcensus core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! The aggregation engine itself never returns an error: malformed records
//! are skipped, malformed patterns are dropped, and unknown platform tags
//! produce empty results. Everything here belongs to the I/O boundary.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored JSON column could not be encoded or decoded.
    #[error("database payload error: {0}")]
    PayloadError(#[from] serde_json::Error),

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Exclusion rule errors
// ---------------------------------------------------------------------------

/// Errors from loading exclusion rule sources.
///
/// A pattern that fails to compile is *not* an error: it is dropped with a
/// warning and the remaining patterns still load.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern file could not be read.
    #[error("exclusion rule file error at '{path}': {source}")]
    FileUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Platform API errors
// ---------------------------------------------------------------------------

/// Errors from source-control platform REST APIs.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP-level transport error (network, TLS, timeouts).
    #[error("{platform} HTTP error: {source}")]
    HttpError {
        platform: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API returned a non-success status code.
    #[error("{platform} API error (HTTP {status}): {body}")]
    ApiError {
        platform: String,
        status: u16,
        body: String,
    },

    /// Authentication token is missing or rejected.
    #[error("{platform} authentication failed: {detail}")]
    AuthenticationFailed { platform: String, detail: String },

    /// Rate limit still exceeded after all retries.
    #[error("{platform} rate limit exceeded after {attempts} attempts")]
    RateLimited { platform: String, attempts: u32 },

    /// JSON deserialization failure.
    #[error("{platform} response parse error: {detail}")]
    ParseError { platform: String, detail: String },

    /// The platform has no owner/organization configured where one is needed.
    #[error("{platform} is not configured: {detail}")]
    NotConfigured { platform: String, detail: String },

    /// Failure persisting fetched data.
    #[error("collection database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors from report sinks.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing a report file failed.
    #[error("report I/O error at '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serializing a report failed.
    #[error("report serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Reading persisted records for the report failed.
    #[error("report database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ConfigError::InvalidValue {
            field: "census.window_days".into(),
            detail: "must be > 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'census.window_days': must be > 0"
        );

        let err = PlatformError::RateLimited {
            platform: "GitHub".into(),
            attempts: 4,
        };
        assert!(err.to_string().contains("rate limit"));

        let err = PlatformError::ApiError {
            platform: "GitLab".into(),
            status: 404,
            body: "404 Project Not Found".into(),
        };
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let db_err = DatabaseError::NotFound {
            entity: "repository".into(),
            id: "acme/api".into(),
        };
        let core_err: CoreError = db_err.into();
        assert!(matches!(core_err, CoreError::Database(_)));

        let rule_err = RuleError::FileUnreadable {
            path: "/nope".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let core_err: CoreError = rule_err.into();
        assert!(matches!(core_err, CoreError::Rule(_)));
    }
}
