//! Handle to contact resolution.
//!
//! Messages reference the other party through `handle_id`; the handle table
//! maps that id to a phone number or account. Handle `0` marks a group
//! conversation, which has no single resolvable handle.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::{Result, SearchIndexError};
use crate::models::{HandleRecord, MessageRecord};

/// Handle identifier reserved for group conversations
pub const GROUP_HANDLE_ID: i64 = 0;

/// One side of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    /// A contact identifier from the handle table
    Contact(String),
    /// The owner of the database (`"self"`)
    Me,
    /// A group conversation (`"group"`)
    Group,
    /// A handle id missing from the handle table, kept verbatim
    Unresolved(i64),
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contact(id) => f.write_str(id),
            Self::Me => f.write_str("self"),
            Self::Group => f.write_str("group"),
            Self::Unresolved(handle_id) => write!(f, "{handle_id}"),
        }
    }
}

/// Read-only lookup from handle id to contact identifier
#[derive(Debug, Clone, Default)]
pub struct ContactResolver {
    contacts: HashMap<i64, String>,
}

impl ContactResolver {
    /// Build the lookup from every row of the handle table.
    ///
    /// A handle id seen twice is an integrity error. A handle with the
    /// reserved group id is skipped.
    pub fn from_handles(handles: &[HandleRecord]) -> Result<Self> {
        let mut contacts = HashMap::with_capacity(handles.len());

        for handle in handles {
            if handle.rowid == GROUP_HANDLE_ID {
                warn!(contact = %handle.id, "Skipping handle with reserved group id 0");
                continue;
            }

            match contacts.entry(handle.rowid) {
                Entry::Occupied(_) => return Err(SearchIndexError::DuplicateHandle(handle.rowid)),
                Entry::Vacant(slot) => {
                    slot.insert(handle.id.clone());
                },
            }
        }

        debug!(contacts = contacts.len(), "Built contact lookup");
        Ok(Self { contacts })
    }

    /// Number of known handles
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True when no handles are known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Resolve a message's handle id
    #[must_use]
    pub fn resolve(&self, handle_id: i64) -> Participant {
        if handle_id == GROUP_HANDLE_ID {
            return Participant::Group;
        }

        self.contacts
            .get(&handle_id)
            .map_or(Participant::Unresolved(handle_id), |id| Participant::Contact(id.clone()))
    }

    /// Sender and receiver of `message`, in that order
    #[must_use]
    pub fn participants(&self, message: &MessageRecord) -> (Participant, Participant) {
        let other = self.resolve(message.handle_id);
        if message.is_from_me {
            (Participant::Me, other)
        } else {
            (other, Participant::Me)
        }
    }
}
