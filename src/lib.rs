//! iMessage Search - Message History Indexing
//!
//! A Rust library for loading message history from the Messages `chat.db`
//! database into a search backend and querying it.
//!
//! # Features
//!
//! - Read-only loading of the message and handle tables, optionally from a snapshot copy
//! - Contact resolution for senders and receivers, including group conversations
//! - Timestamp rendering in an explicit timezone
//! - Bulk indexing with per-document outcome reporting
//! - Single-field match queries

/// Configuration management
pub mod config;
/// Handle to contact resolution
pub mod contacts;
/// Search document construction
pub mod document;
/// Error types
pub mod error;
/// Bulk indexing
pub mod indexer;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Match queries
pub mod query;
/// Source database schema definitions
pub mod schema;
/// Search backend client
pub mod search;
/// Pipeline orchestration
pub mod service;
/// Source database access
pub mod source;
/// Stored timestamp conversion
pub mod timestamp;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use contacts::{ContactResolver, Participant};
pub use error::{Result, SearchIndexError};
pub use indexer::{BulkFailure, BulkReport, IndexOptions};
pub use models::{HandleRecord, IndexTarget, IndexedDocument, MessageRecord};
pub use search::{ElasticsearchClient, SearchBackend};
pub use service::IndexService;
pub use source::ChatDatabase;
pub use timestamp::TimeZoneSetting;
