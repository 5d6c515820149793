//! Read-only access to the Messages source database.
//!
//! [`ChatDatabase`] discovers table layouts at runtime (the schema reader) and
//! loads whole tables into statically declared records (the record loader).
//! Each record type states which columns it selects and builds itself from the
//! positional fields of a row.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Row};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Result, SearchIndexError};
use crate::models::{HandleRecord, MessageRecord};
use crate::schema::{handle, message};
use crate::validation::InputValidator;

/// A row type that can be loaded from a source table.
pub trait SourceRecord: Sized {
    /// Table the record is read from
    const TABLE: &'static str;
    /// Selected columns, in the positional order `from_row` reads them
    const COLUMNS: &'static [&'static str];
    /// Columns the table must declare for the record to load
    const REQUIRED: &'static [&'static str];

    /// Build a record from the positional fields of one row
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl SourceRecord for MessageRecord {
    const TABLE: &'static str = message::TABLE;
    const COLUMNS: &'static [&'static str] = &[
        message::ROWID,
        message::TEXT,
        message::HANDLE_ID,
        message::IS_FROM_ME,
        message::DATE,
    ];
    const REQUIRED: &'static [&'static str] = &[message::TEXT, message::HANDLE_ID, message::IS_FROM_ME, message::DATE];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rowid: row.get(0)?,
            text: row.get(1)?,
            handle_id: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            is_from_me: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
            date: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        })
    }
}

impl SourceRecord for HandleRecord {
    const TABLE: &'static str = handle::TABLE;
    const COLUMNS: &'static [&'static str] = &[handle::ROWID, handle::ID];
    const REQUIRED: &'static [&'static str] = &[handle::ID];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rowid: row.get(0)?,
            id: row.get(1)?,
        })
    }
}

/// Read-only handle on a Messages database file
pub struct ChatDatabase {
    conn: Connection,
    path: PathBuf,
    // Dropped after `conn`, so the copy outlives the connection reading it.
    _snapshot: Option<TempDir>,
}

impl ChatDatabase {
    /// Open the database at `path` read-only.
    ///
    /// With `snapshot` set, the file and its `-wal`/`-shm` companions are first
    /// copied to a temporary directory and the copy is opened instead, so the
    /// live database is never touched.
    pub fn open(path: &Path, snapshot: bool) -> Result<Self> {
        let shown = path.display().to_string();
        InputValidator::validate_source_path(path).map_err(|e| SearchIndexError::source_access(&shown, e))?;

        let (read_path, snapshot_dir) = if snapshot {
            let dir = Self::snapshot(path).map_err(|e| SearchIndexError::source_access(&shown, e))?;
            let file_name = path.file_name().unwrap_or_else(|| "chat.db".as_ref());
            (dir.path().join(file_name), Some(dir))
        } else {
            (path.to_path_buf(), None)
        };

        let conn = Connection::open_with_flags(&read_path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| SearchIndexError::source_access(&shown, e))?;

        // SQLite opens lazily; touch the schema so corrupt or locked files fail here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| SearchIndexError::source_access(&shown, e))?;

        info!(path = %shown, snapshot, "Opened source database");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            _snapshot: snapshot_dir,
        })
    }

    /// Path of the database as given to [`ChatDatabase::open`]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(path: &Path) -> std::io::Result<TempDir> {
        let dir = tempfile::Builder::new().prefix("imessage-search-").tempdir()?;
        let file_name = path.file_name().unwrap_or_else(|| "chat.db".as_ref());
        fs::copy(path, dir.path().join(file_name))?;

        for suffix in ["-wal", "-shm"] {
            let mut side = path.as_os_str().to_owned();
            side.push(suffix);
            let side = PathBuf::from(side);
            if side.is_file() {
                let mut target = file_name.to_owned();
                target.push(suffix);
                fs::copy(&side, dir.path().join(target))?;
            }
        }

        debug!(dir = %dir.path().display(), "Copied source database to snapshot");
        Ok(dir)
    }

    /// Column names of `table` in declaration order.
    ///
    /// Returns an empty list when the table does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;

        let mut columns = Vec::new();
        for name in names {
            columns.push(name?);
        }
        Ok(columns)
    }

    /// Fail with a schema mismatch unless `table` exists and declares every
    /// column in `required` (compared case-insensitively).
    pub fn require_columns(&self, table: &str, required: &[&str]) -> Result<()> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            return Err(SearchIndexError::SchemaMismatch(format!("table `{table}` not found")));
        }

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|wanted| !columns.iter().any(|c| c.eq_ignore_ascii_case(wanted)))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SearchIndexError::SchemaMismatch(format!(
                "table `{table}` is missing columns: {}",
                missing.join(", ")
            )))
        }
    }

    /// Load every row of `R::TABLE`, in the order the database returns them.
    pub fn load<R: SourceRecord>(&self) -> Result<Vec<R>> {
        self.require_columns(R::TABLE, R::REQUIRED)?;

        let sql = format!("SELECT {} FROM {}", R::COLUMNS.join(", "), R::TABLE);
        let mut stmt = self.conn.prepare(&sql)?;
        if stmt.column_count() != R::COLUMNS.len() {
            return Err(SearchIndexError::SchemaMismatch(format!(
                "table `{}` returned {} columns, expected {}",
                R::TABLE,
                stmt.column_count(),
                R::COLUMNS.len()
            )));
        }

        let rows = stmt.query_map([], R::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| row_error(R::TABLE, e))?);
        }

        debug!(table = R::TABLE, rows = records.len(), "Loaded source table");
        Ok(records)
    }

    /// Load the whole message table
    pub fn load_messages(&self) -> Result<Vec<MessageRecord>> {
        self.load()
    }

    /// Load the whole handle table
    pub fn load_handles(&self) -> Result<Vec<HandleRecord>> {
        self.load()
    }
}

fn row_error(table: &str, err: rusqlite::Error) -> SearchIndexError {
    match err {
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::InvalidColumnIndex(_)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => {
            SearchIndexError::SchemaMismatch(format!("row in `{table}` does not match its record: {err}"))
        },
        other => SearchIndexError::Database(other),
    }
}
