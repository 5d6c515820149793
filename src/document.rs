//! Projection of a source message into a search document.

use crate::contacts::{ContactResolver, Participant};
use crate::error::Result;
use crate::models::{IndexedDocument, MessageRecord};
use crate::timestamp::{self, TimeZoneSetting};

/// Build the index document for `message`.
///
/// Text is copied as-is, including `None`; the backend decides how an empty
/// field is indexed.
pub fn build_document(message: &MessageRecord, resolver: &ContactResolver, tz: TimeZoneSetting) -> Result<IndexedDocument> {
    let (sender, receiver) = resolver.participants(message);
    assemble(message, &sender, &receiver, tz)
}

/// Build the index document for `message` from already resolved participants
pub fn assemble(message: &MessageRecord, sender: &Participant, receiver: &Participant, tz: TimeZoneSetting) -> Result<IndexedDocument> {
    Ok(IndexedDocument {
        text: message.text.clone(),
        timestamp: timestamp::normalize(message.date, tz)?,
        sender: sender.to_string(),
        receiver: receiver.to_string(),
    })
}
