use anyhow::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::indexer::{IndexOptions, DEFAULT_CHUNK_SIZE};
use crate::models::IndexTarget;
use crate::query::DEFAULT_QUERY_FIELD;
use crate::timestamp::TimeZoneSetting;
use crate::validation::InputValidator;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source database settings
    pub source: SourceConfig,
    /// Search backend settings
    pub search: SearchConfig,
    /// Timestamp rendering settings
    pub timestamp: TimestampConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Where the Messages database is read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path of the `chat.db` file (preferably a copy)
    pub database_path: String,
    /// Copy the database to a temporary directory before reading
    pub snapshot: bool,
}

/// Search backend connection and indexing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Backend base URL
    pub url: String,
    /// Index documents are written to and queried from
    pub index: String,
    /// Legacy document type, sent only when set
    #[serde(default)]
    pub doc_type: Option<String>,
    /// HTTP request timeout
    pub timeout_secs: u64,
    /// Documents per bulk request
    pub bulk_chunk_size: usize,
    /// Refresh the index after writing so queries see new documents
    pub refresh_after_index: bool,
    /// Field matched by `search`
    pub query_field: String,
    /// Result page size; backend default when unset
    #[serde(default)]
    pub page_size: Option<u64>,
}

/// Timestamp rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampConfig {
    /// `UTC`, `local`, a fixed offset such as `+09:00`, or an IANA name
    pub timezone: String,
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Console format, "json" or "text"
    pub format: String,
    /// Optional JSON log file, rotated daily
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                database_path: "chat.db".to_string(),
                snapshot: true,
            },
            search: SearchConfig {
                url: "http://localhost:9200".to_string(),
                index: "messages".to_string(),
                doc_type: None,
                timeout_secs: 30,
                bulk_chunk_size: DEFAULT_CHUNK_SIZE,
                refresh_after_index: true,
                query_field: DEFAULT_QUERY_FIELD.to_string(),
                page_size: None,
            },
            timestamp: TimestampConfig {
                timezone: "UTC".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, config files, `explicit_file`, then `IMESSAGE_SEARCH__*` variables.
    ///
    /// Values are not validated here; callers apply their own overrides first
    /// and then call [`AppConfig::validate`].
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        for (key, value) in Self::default().default_entries() {
            builder = builder.set_default(key, value)?;
        }

        builder = builder
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("imessage-search").required(false));

        if let Some(path) = explicit_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix("IMESSAGE_SEARCH").separator("__").try_parsing(true))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(app_config)
    }

    // Flattened defaults for the config builder. Unset options are left out.
    fn default_entries(self) -> Vec<(&'static str, ::config::Value)> {
        let mut entries = vec![
            ("source.database_path", ::config::Value::from(self.source.database_path)),
            ("source.snapshot", ::config::Value::from(self.source.snapshot)),
            ("search.url", ::config::Value::from(self.search.url)),
            ("search.index", ::config::Value::from(self.search.index)),
            ("search.timeout_secs", ::config::Value::from(self.search.timeout_secs)),
            ("search.bulk_chunk_size", ::config::Value::from(self.search.bulk_chunk_size as u64)),
            ("search.refresh_after_index", ::config::Value::from(self.search.refresh_after_index)),
            ("search.query_field", ::config::Value::from(self.search.query_field)),
            ("timestamp.timezone", ::config::Value::from(self.timestamp.timezone)),
            ("logging.level", ::config::Value::from(self.logging.level)),
            ("logging.format", ::config::Value::from(self.logging.format)),
        ];

        if let Some(doc_type) = self.search.doc_type {
            entries.push(("search.doc_type", ::config::Value::from(doc_type)));
        }
        if let Some(page_size) = self.search.page_size {
            entries.push(("search.page_size", ::config::Value::from(page_size)));
        }
        if let Some(file_path) = self.logging.file_path {
            entries.push(("logging.file_path", ::config::Value::from(file_path)));
        }

        entries
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.source.database_path.trim().is_empty() {
            return Err(anyhow::anyhow!("source.database_path cannot be empty"));
        }

        InputValidator::validate_backend_url(&self.search.url)?;
        InputValidator::validate_index_name(&self.search.index)?;
        InputValidator::validate_chunk_size(self.search.bulk_chunk_size)?;
        InputValidator::validate_field_name(&self.search.query_field)?;

        if self.search.timeout_secs == 0 {
            return Err(anyhow::anyhow!("timeout_secs must be greater than 0"));
        }

        if let Some(doc_type) = &self.search.doc_type {
            if doc_type.trim().is_empty() {
                return Err(anyhow::anyhow!("doc_type cannot be empty when set"));
            }
        }

        if let Some(page_size) = self.search.page_size {
            InputValidator::validate_page_size(page_size)?;
        }

        self.timezone()?;

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Parsed timestamp timezone
    pub fn timezone(&self) -> Result<TimeZoneSetting> {
        Ok(self.timestamp.timezone.parse::<TimeZoneSetting>()?)
    }

    /// HTTP timeout for backend requests
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }

    /// Index and legacy type documents are written to
    #[must_use]
    pub fn index_target(&self) -> IndexTarget {
        IndexTarget {
            index: self.search.index.clone(),
            doc_type: self.search.doc_type.clone(),
        }
    }

    /// Indexing options derived from this configuration
    pub fn index_options(&self) -> Result<IndexOptions> {
        Ok(IndexOptions {
            target: self.index_target(),
            timezone: self.timezone()?,
            chunk_size: self.search.bulk_chunk_size,
        })
    }
}
