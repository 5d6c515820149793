use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, SearchIndexError};

fn invalid(message: impl Into<String>) -> SearchIndexError {
    SearchIndexError::Validation(message.into())
}

// Characters the search backend refuses in index names.
#[allow(clippy::expect_used)]
fn forbidden_index_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/*?"<>| ,#:]"#).expect("valid index-name pattern"))
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the source database path
    pub fn validate_source_path(path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(invalid("Source database path cannot be empty"));
        }

        if !path.exists() {
            return Err(invalid(format!("Source database path does not exist: {path:?}")));
        }

        if !path.is_file() {
            return Err(invalid(format!("Source database path is not a file: {path:?}")));
        }

        Ok(())
    }

    /// Validate an index name against the backend's naming rules
    pub fn validate_index_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(invalid("Index name cannot be empty"));
        }

        if name.len() > 255 {
            return Err(invalid("Index name too long (max 255 bytes)"));
        }

        if name == "." || name == ".." {
            return Err(invalid("Index name cannot be `.` or `..`"));
        }

        if name.starts_with(['-', '_', '+']) {
            return Err(invalid("Index name cannot start with `-`, `_` or `+`"));
        }

        if name.chars().any(char::is_uppercase) {
            return Err(invalid(format!("Index name must be lowercase: {name}")));
        }

        if forbidden_index_chars().is_match(name) {
            return Err(invalid(format!("Index name contains invalid characters: {name}")));
        }

        Ok(())
    }

    /// Validate a document field name used in queries
    pub fn validate_field_name(field: &str) -> Result<()> {
        if field.trim().is_empty() {
            return Err(invalid("Field name cannot be empty"));
        }

        if field.chars().any(char::is_control) {
            return Err(invalid("Field name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a search term
    pub fn validate_search_term(term: &str) -> Result<()> {
        if term.trim().is_empty() {
            return Err(invalid("Search term cannot be empty"));
        }

        if term.contains('\0') {
            return Err(invalid("Search term contains invalid characters"));
        }

        Ok(())
    }

    /// Validate the search backend base URL
    pub fn validate_backend_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(invalid("Search backend URL cannot be empty"));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(format!("Search backend URL must be http(s): {url}")));
        }

        Ok(())
    }

    /// Validate the number of documents per bulk request
    pub fn validate_chunk_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(invalid("Bulk chunk size must be greater than 0"));
        }

        if size > 10_000 {
            return Err(invalid("Bulk chunk size too large (max 10,000)"));
        }

        Ok(())
    }

    /// Validate a requested result page size
    pub fn validate_page_size(size: u64) -> Result<()> {
        if size == 0 || size > 10_000 {
            return Err(invalid("Page size must be between 1 and 10,000"));
        }

        Ok(())
    }
}
