//! Error types for the imessage-search library.
//!
//! This module provides custom error types using `thiserror` so each failure
//! class of the indexing pipeline (source access, schema mismatch, backend
//! write/query) is reported distinctly.

use thiserror::Error;

/// Errors that can occur while loading, indexing, or querying messages.
#[derive(Error, Debug)]
pub enum SearchIndexError {
    /// The source database could not be opened (missing, unreadable, corrupt, locked)
    #[error("Cannot open source database {path}: {reason}")]
    SourceAccess {
        /// Path that was being opened
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Database-related errors after the source is open
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Expected table or column absent, or a row that does not fit its record
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The handle table contains the same identifier twice
    #[error("Duplicate handle identifier in handle table: {0}")]
    DuplicateHandle(i64),

    /// A stored timestamp that cannot be represented as a calendar date
    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    /// Unrecognised timezone setting
    #[error("Invalid timezone: {0}")]
    InvalidTimeZone(String),

    /// The search backend answered with a non-success status
    #[error("Search backend {operation} failed with status {status}: {body}")]
    Backend {
        /// Operation that was attempted (bulk, refresh, search)
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the backend
        body: String,
    },

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected user input
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenience type alias for Result with `SearchIndexError`
pub type Result<T> = std::result::Result<T, SearchIndexError>;

impl SearchIndexError {
    /// Build a source-access error for `path`
    pub fn source_access(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceAccess {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
