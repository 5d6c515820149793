//! Data models for message indexing
//!
//! Rows read from the source database, and the documents written to the
//! search index.

use serde::{Deserialize, Serialize};

/// Source representation of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Source row identifier
    pub rowid: i64,
    /// Message text content (absent for attachments, reactions, ...)
    pub text: Option<String>,
    /// Foreign key to the handle table, 0 for group conversations
    pub handle_id: i64,
    /// True if message was sent by current user
    pub is_from_me: bool,
    /// Raw stored timestamp, relative to the 2001-01-01 epoch
    pub date: i64,
}

/// Source representation of a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleRecord {
    /// Source row identifier, referenced by `message.handle_id`
    pub rowid: i64,
    /// Contact identifier (phone number or account handle)
    pub id: String,
}

/// A document as stored in the search index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedDocument {
    /// Message text, passed through unchanged
    pub text: Option<String>,
    /// Send time rendered as `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// Sending participant
    pub sender: String,
    /// Receiving participant
    pub receiver: String,
}

/// Where documents are written in the search backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    /// Index name
    pub index: String,
    /// Legacy document type; omitted from requests when `None`
    pub doc_type: Option<String>,
}

impl IndexTarget {
    /// Target `index` without a document type
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: None,
        }
    }

    /// Set the legacy document type
    #[must_use]
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }
}
