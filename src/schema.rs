//! Source database schema definitions
//!
//! Table and column names of the Messages `chat.db` file, for use with rusqlite.
//! Only the columns the indexer reads are listed.

/// Message table schema
pub mod message {
    /// Table name
    pub const TABLE: &str = "message";
    /// Implicit row identifier
    pub const ROWID: &str = "ROWID";
    /// Message text content column
    pub const TEXT: &str = "text";
    /// Foreign key to `handle.ROWID` (0 for group conversations)
    pub const HANDLE_ID: &str = "handle_id";
    /// Flag indicating if the message was sent by the local user
    pub const IS_FROM_ME: &str = "is_from_me";
    /// Send time, as an offset from 2001-01-01 00:00:00 UTC
    pub const DATE: &str = "date";
}

/// Handle table schema
pub mod handle {
    /// Table name
    pub const TABLE: &str = "handle";
    /// Implicit row identifier
    pub const ROWID: &str = "ROWID";
    /// Contact identifier column (phone number or account)
    pub const ID: &str = "id";
}
