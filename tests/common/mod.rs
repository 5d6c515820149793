//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use imessage_search::search::{BulkItemOutcome, MatchQuery, SearchHit, SearchResponse};
use imessage_search::{IndexTarget, IndexedDocument, Result, SearchBackend};

/// A message row to insert into the fixture database
pub struct FixtureMessage<'a> {
    pub text: Option<&'a str>,
    pub handle_id: Option<i64>,
    pub is_from_me: bool,
    pub date: i64,
}

/// Create a chat.db with the Messages layout for the columns the indexer reads
pub fn create_chat_db(dir: &Path, handles: &[(i64, &str)], messages: &[FixtureMessage<'_>]) -> PathBuf {
    let path = dir.join("chat.db");
    let conn = Connection::open(&path).expect("Failed to create fixture database");

    conn.execute_batch(
        "CREATE TABLE handle (
            ROWID INTEGER PRIMARY KEY AUTOINCREMENT UNIQUE,
            id TEXT NOT NULL,
            country TEXT,
            service TEXT NOT NULL DEFAULT 'iMessage'
        );
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY AUTOINCREMENT,
            guid TEXT UNIQUE,
            text TEXT,
            handle_id INTEGER DEFAULT 0,
            service TEXT,
            date INTEGER,
            is_from_me INTEGER DEFAULT 0
        );",
    )
    .expect("Failed to create fixture tables");

    for (rowid, id) in handles {
        conn.execute("INSERT INTO handle (ROWID, id) VALUES (?1, ?2)", params![rowid, id])
            .expect("Failed to insert handle");
    }

    for (i, message) in messages.iter().enumerate() {
        conn.execute(
            "INSERT INTO message (guid, text, handle_id, service, date, is_from_me) VALUES (?1, ?2, ?3, 'iMessage', ?4, ?5)",
            params![format!("guid-{i}"), message.text, message.handle_id, message.date, message.is_from_me],
        )
        .expect("Failed to insert message");
    }

    path
}

/// Backend that keeps documents in memory and matches terms as whole words
#[derive(Default)]
pub struct InMemoryBackend {
    pub documents: Mutex<Vec<(IndexTarget, IndexedDocument)>>,
    pub refreshes: Mutex<Vec<String>>,
    /// Positions (across the whole run) the backend refuses
    pub reject: Vec<usize>,
    seen: Mutex<usize>,
}

impl InMemoryBackend {
    pub fn rejecting(positions: &[usize]) -> Self {
        Self {
            reject: positions.to_vec(),
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Vec<IndexedDocument> {
        self.documents.lock().unwrap().iter().map(|(_, doc)| doc.clone()).collect()
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn bulk_index(&self, target: &IndexTarget, documents: &[IndexedDocument]) -> Result<Vec<BulkItemOutcome>> {
        let mut stored = self.documents.lock().unwrap();
        let mut seen = self.seen.lock().unwrap();
        let mut outcomes = Vec::new();
        for document in documents {
            let position = *seen;
            *seen += 1;
            if self.reject.contains(&position) {
                outcomes.push(BulkItemOutcome {
                    status: 400,
                    error: Some("mapper_parsing_exception: rejected".to_string()),
                });
            } else {
                stored.push((target.clone(), document.clone()));
                outcomes.push(BulkItemOutcome { status: 201, error: None });
            }
        }
        Ok(outcomes)
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.refreshes.lock().unwrap().push(index.to_string());
        Ok(())
    }

    async fn match_query(&self, query: &MatchQuery) -> Result<SearchResponse> {
        let term = query.term.to_lowercase();
        let hits: Vec<SearchHit> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| target.index == query.index)
            .filter(|(_, doc)| {
                let value = match query.field.as_str() {
                    "text" => doc.text.clone().unwrap_or_default(),
                    "sender" => doc.sender.clone(),
                    "receiver" => doc.receiver.clone(),
                    _ => String::new(),
                };
                value
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word == term)
            })
            .map(|(_, doc)| SearchHit {
                score: Some(1.0),
                document: doc.clone(),
            })
            .collect();

        Ok(SearchResponse {
            total: hits.len() as u64,
            hits,
        })
    }
}
