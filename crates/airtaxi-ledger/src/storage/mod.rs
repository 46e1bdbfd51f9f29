//! Ledger access layer.
//!
//! [`LedgerStore`] is the only way the lifecycle engine touches durable
//! state: point reads and writes, deletions, key-ordered range scans and
//! per-key history. [`SqliteLedger`] implements it on `SQLite`, keeping the
//! current value of every key alongside an append-only log of every write.

pub mod cursor;
pub mod migrations;
pub mod schema;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

pub use cursor::{CursorGuard, HistoryIter, LedgerIterator, StateIter};

/// Default number of rows fetched per page by scans and history replays.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A key and its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// The ledger key.
    pub key: String,
    /// The stored bytes.
    pub value: Vec<u8>,
}

/// One historical write or deletion of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyModification {
    /// Transaction that performed the write.
    pub tx_id: String,
    /// When the write was recorded.
    pub timestamp: DateTime<Utc>,
    /// The bytes written, or `None` for a deletion.
    pub value: Option<Vec<u8>>,
}

impl KeyModification {
    /// Whether this entry records a deletion.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// A durable, key-ordered, versioned key-value store.
///
/// Implementations carry no business rules. Every failure is returned
/// unchanged to the caller; nothing is retried at this layer.
pub trait LedgerStore {
    /// Iterator returned by [`LedgerStore::state_by_range`].
    type StateIter<'a>: LedgerIterator<Item = Result<KeyValue>>
    where
        Self: 'a;

    /// Iterator returned by [`LedgerStore::history_for_key`].
    type HistoryIter<'a>: LedgerIterator<Item = Result<KeyModification>>
    where
        Self: 'a;

    /// Read the current value of a key. Absent keys yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite the value of a key and append the write to its history.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn put_state(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the current value of a key. History is kept and a deletion
    /// entry is appended. Returns `false` if the key had no value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn delete_state(&self, key: &str) -> Result<bool>;

    /// Scan keys in `[start_key, end_key)` in ascending order. An empty
    /// `end_key` leaves the range unbounded above.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened.
    fn state_by_range(&self, start_key: &str, end_key: &str) -> Result<Self::StateIter<'_>>;

    /// Replay every write and deletion of a key, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be opened.
    fn history_for_key(&self, key: &str) -> Result<Self::HistoryIter<'_>>;

    /// Run `f` so that its writes commit together on `Ok` and are discarded
    /// on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a store error if the unit cannot be
    /// opened or committed.
    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T>;

    /// Run `f` and discard all of its writes regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a store error if the unit cannot be
    /// opened or rolled back.
    fn speculatively<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T>;
}

/// Where the next page of a range scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanFrom {
    /// At this key, inclusive.
    At(String),
    /// Strictly after this key.
    After(String),
}

/// `SQLite`-backed ledger.
#[derive(Debug)]
pub struct SqliteLedger {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Source of history timestamps.
    clock: Arc<dyn Clock>,
    /// Rows fetched per cursor page.
    page_size: usize,
    /// Cursors currently open against this ledger.
    open_cursors: Cell<usize>,
}

impl SqliteLedger {
    /// Open or create a ledger database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening ledger at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for file-backed ledgers
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Ledger opened at {}", path.display());
        Ok(Self::from_connection(path, conn))
    }

    /// Create an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self::from_connection(path, conn))
    }

    fn from_connection(path: PathBuf, conn: Connection) -> Self {
        Self {
            path,
            conn,
            clock: Arc::new(SystemClock),
            page_size: DEFAULT_PAGE_SIZE,
            open_cursors: Cell::new(0),
        }
    }

    /// Use the given clock for history timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set how many rows each cursor page fetches. Zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows fetched per cursor page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of range or history cursors currently open.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.get()
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get ledger statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<LedgerStats> {
        let live_keys: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM world_state", [], |row| row.get(0))?;
        let history_entries: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        let last_write: Option<String> = self
            .conn
            .query_row(
                "SELECT timestamp FROM history ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let last_write = last_write
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(LedgerStats {
            live_keys,
            history_entries,
            last_write,
            db_size_bytes,
        })
    }

    fn next_version(&self, key: &str) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE key = ?1",
            [key],
            |row| row.get(0),
        )?;
        Ok(count + 1)
    }

    fn append_history(&self, key: &str, value: Option<&[u8]>) -> Result<(i64, String)> {
        let version = self.next_version(key)?;
        let timestamp = self.clock.now();
        let tx_id = transaction_id(key, version, &timestamp, value);

        self.conn.execute(
            r"
            INSERT INTO history (key, tx_id, timestamp, value, is_delete)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![key, tx_id, timestamp.to_rfc3339(), value, value.is_none()],
        )?;
        Ok((version, tx_id))
    }

    fn with_savepoint<T>(
        &self,
        name: &'static str,
        commit: bool,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        let result = f();

        if commit && result.is_ok() {
            self.conn.execute_batch(&format!("RELEASE {name}"))?;
        } else if let Err(err) = self
            .conn
            .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
        {
            warn!("Failed to roll back savepoint {}: {}", name, err);
            if result.is_ok() {
                return Err(err.into());
            }
        }
        result
    }

    pub(crate) fn fetch_state_page(&self, from: &ScanFrom, end_key: &str) -> Result<Vec<KeyValue>> {
        let (lower, start) = match from {
            ScanFrom::At(key) => ("key >= ?1", key.as_str()),
            ScanFrom::After(key) => ("key > ?1", key.as_str()),
        };
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);

        let rows = if end_key.is_empty() {
            let sql = format!(
                "SELECT key, value FROM world_state WHERE {lower} ORDER BY key LIMIT ?2"
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params![start, limit], Self::row_to_key_value)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        } else {
            let sql = format!(
                "SELECT key, value FROM world_state WHERE {lower} AND key < ?3 ORDER BY key LIMIT ?2"
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params![start, limit, end_key], Self::row_to_key_value)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        trace!("Fetched {} state rows from {:?}", rows.len(), from);
        Ok(rows)
    }

    pub(crate) fn fetch_history_page(
        &self,
        key: &str,
        after_seq: i64,
    ) -> Result<Vec<(i64, KeyModification)>> {
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(
            r"
            SELECT seq, tx_id, timestamp, value, is_delete
            FROM history WHERE key = ?1 AND seq > ?2
            ORDER BY seq LIMIT ?3
            ",
        )?;

        let rows = stmt
            .query_map(params![key, after_seq, limit], Self::row_to_modification)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        trace!("Fetched {} history rows for {} after {}", rows.len(), key, after_seq);
        Ok(rows)
    }

    fn row_to_key_value(row: &rusqlite::Row) -> rusqlite::Result<KeyValue> {
        Ok(KeyValue {
            key: row.get(0)?,
            value: row.get(1)?,
        })
    }

    fn row_to_modification(row: &rusqlite::Row) -> rusqlite::Result<(i64, KeyModification)> {
        let seq: i64 = row.get(0)?;
        let tx_id: String = row.get(1)?;
        let timestamp_str: String = row.get(2)?;
        let value: Option<Vec<u8>> = row.get(3)?;
        let is_delete: bool = row.get(4)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok((
            seq,
            KeyModification {
                tx_id,
                timestamp,
                value: if is_delete { None } else { value },
            },
        ))
    }
}

impl LedgerStore for SqliteLedger {
    type StateIter<'a> = StateIter<'a>;
    type HistoryIter<'a> = HistoryIter<'a>;

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM world_state WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        trace!("get_state {} -> {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<()> {
        self.with_savepoint("put_state", true, || {
            let (version, tx_id) = self.append_history(key, Some(value))?;
            self.conn.execute(
                r"
                INSERT INTO world_state (key, value, version) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = excluded.version
                ",
                params![key, value, version],
            )?;
            debug!("Put {} version {} in tx {}", key, version, &tx_id[..16]);
            Ok(())
        })
    }

    fn delete_state(&self, key: &str) -> Result<bool> {
        self.with_savepoint("delete_state", true, || {
            let affected = self
                .conn
                .execute("DELETE FROM world_state WHERE key = ?1", [key])?;
            if affected == 0 {
                return Ok(false);
            }
            let (version, tx_id) = self.append_history(key, None)?;
            debug!("Deleted {} at version {} in tx {}", key, version, &tx_id[..16]);
            Ok(true)
        })
    }

    fn state_by_range(&self, start_key: &str, end_key: &str) -> Result<StateIter<'_>> {
        debug!("Opening range scan [{}, {})", start_key, end_key);
        Ok(StateIter::new(self, start_key, end_key))
    }

    fn history_for_key(&self, key: &str) -> Result<HistoryIter<'_>> {
        debug!("Opening history for {}", key);
        Ok(HistoryIter::new(self, key))
    }

    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.with_savepoint("submit", true, f)
    }

    fn speculatively<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.with_savepoint("evaluate", false, f)
    }
}

/// Derive a transaction id for one write.
fn transaction_id(key: &str, version: i64, timestamp: &DateTime<Utc>, value: Option<&[u8]>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.update(&version.to_le_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    match value {
        Some(bytes) => {
            hasher.update(&[1]);
            hasher.update(bytes);
        }
        None => {
            hasher.update(&[0]);
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Statistics about the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    /// Keys that currently hold a value.
    pub live_keys: i64,
    /// Writes and deletions recorded across all keys.
    pub history_entries: i64,
    /// Timestamp of the most recent write.
    pub last_write: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    fn create_test_ledger() -> SqliteLedger {
        SqliteLedger::open_in_memory().expect("failed to create test ledger")
    }

    fn keys(ledger: &SqliteLedger, start: &str, end: &str) -> Vec<String> {
        ledger
            .state_by_range(start, end)
            .unwrap()
            .map(|kv| kv.unwrap().key)
            .collect()
    }

    #[test]
    fn test_open_in_memory() {
        let ledger = SqliteLedger::open_in_memory();
        assert!(ledger.is_ok());
    }

    #[test]
    fn test_get_missing_key() {
        let ledger = create_test_ledger();
        assert!(ledger.get_state("AT0001").unwrap().is_none());
    }

    #[test]
    fn test_put_and_get() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"{\"model\":\"SF600\"}").unwrap();

        let value = ledger.get_state("AT0001").unwrap();
        assert_eq!(value.as_deref(), Some(&b"{\"model\":\"SF600\"}"[..]));
    }

    #[test]
    fn test_put_overwrites() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"first").unwrap();
        ledger.put_state("AT0001", b"second").unwrap();

        assert_eq!(ledger.get_state("AT0001").unwrap().unwrap(), b"second");
        assert_eq!(ledger.stats().unwrap().live_keys, 1);
        assert_eq!(ledger.stats().unwrap().history_entries, 2);
    }

    #[test]
    fn test_delete_keeps_history() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"value").unwrap();

        assert!(ledger.delete_state("AT0001").unwrap());
        assert!(ledger.get_state("AT0001").unwrap().is_none());

        let history: Vec<_> = ledger
            .history_for_key("AT0001")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_delete());
        assert!(history[1].is_delete());
        assert!(history[1].value.is_none());
    }

    #[test]
    fn test_delete_missing_key() {
        let ledger = create_test_ledger();
        assert!(!ledger.delete_state("AT0404").unwrap());
        assert_eq!(ledger.stats().unwrap().history_entries, 0);
    }

    #[test]
    fn test_range_is_ordered_and_end_exclusive() {
        let ledger = create_test_ledger();
        for key in ["AT0003", "AT0001", "ZZ9999", "AT0002", "AT9999"] {
            ledger.put_state(key, b"{}").unwrap();
        }

        assert_eq!(
            keys(&ledger, "AT0001", "AT9999"),
            vec!["AT0001", "AT0002", "AT0003"]
        );
    }

    #[test]
    fn test_range_unbounded_end() {
        let ledger = create_test_ledger();
        for key in ["AT0002", "AT0001", "ZZ9999"] {
            ledger.put_state(key, b"{}").unwrap();
        }

        assert_eq!(
            keys(&ledger, "AT0002", ""),
            vec!["AT0002", "ZZ9999"]
        );
    }

    #[test]
    fn test_range_pages_through_results() {
        let ledger = create_test_ledger().with_page_size(2);
        for i in 1..=7 {
            ledger.put_state(&format!("AT{i:04}"), b"{}").unwrap();
        }

        let found = keys(&ledger, "AT0001", "AT9999");
        assert_eq!(found.len(), 7);
        assert_eq!(found.first().map(String::as_str), Some("AT0001"));
        assert_eq!(found.last().map(String::as_str), Some("AT0007"));
    }

    #[test]
    fn test_range_exact_page_multiple() {
        let ledger = create_test_ledger().with_page_size(3);
        for i in 1..=6 {
            ledger.put_state(&format!("AT{i:04}"), b"{}").unwrap();
        }
        assert_eq!(keys(&ledger, "AT0001", "AT9999").len(), 6);
    }

    #[test]
    fn test_range_empty() {
        let ledger = create_test_ledger();
        assert!(keys(&ledger, "AT0001", "AT9999").is_empty());
    }

    #[test]
    fn test_history_oldest_first_across_pages() {
        let ledger = create_test_ledger().with_page_size(2);
        for i in 0..5 {
            ledger.put_state("AT0001", format!("v{i}").as_bytes()).unwrap();
        }

        let values: Vec<Vec<u8>> = ledger
            .history_for_key("AT0001")
            .unwrap()
            .map(|m| m.unwrap().value.unwrap())
            .collect();
        assert_eq!(
            values,
            vec![b"v0".to_vec(), b"v1".to_vec(), b"v2".to_vec(), b"v3".to_vec(), b"v4".to_vec()]
        );
    }

    #[test]
    fn test_history_is_per_key() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"a").unwrap();
        ledger.put_state("AT0002", b"b").unwrap();

        assert_eq!(ledger.history_for_key("AT0001").unwrap().count(), 1);
        assert_eq!(ledger.history_for_key("AT0404").unwrap().count(), 0);
    }

    #[test]
    fn test_history_uses_injected_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let ledger = create_test_ledger().with_clock(Arc::new(FixedClock(instant)));
        ledger.put_state("AT0001", b"x").unwrap();

        let entry = ledger.history_for_key("AT0001").unwrap().next().unwrap().unwrap();
        assert_eq!(entry.timestamp, instant);
    }

    #[test]
    fn test_transaction_ids_are_distinct() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"same").unwrap();
        ledger.put_state("AT0001", b"same").unwrap();

        let ids: Vec<String> = ledger
            .history_for_key("AT0001")
            .unwrap()
            .map(|m| m.unwrap().tx_id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[0].len(), 64);
    }

    #[test]
    fn test_cursors_released_on_drop() {
        let ledger = create_test_ledger();
        ledger.put_state("AT0001", b"{}").unwrap();
        ledger.put_state("AT0002", b"{}").unwrap();

        {
            let mut scan = ledger.state_by_range("AT0001", "AT9999").unwrap();
            let _ = scan.next();
            assert_eq!(ledger.open_cursors(), 1);
        }
        assert_eq!(ledger.open_cursors(), 0);

        let history = ledger.history_for_key("AT0001").unwrap();
        assert_eq!(ledger.open_cursors(), 1);
        history.close();
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_atomically_commits_on_ok() {
        let ledger = create_test_ledger();
        ledger
            .atomically(|| {
                ledger.put_state("AT0001", b"a")?;
                ledger.put_state("AT0002", b"b")
            })
            .unwrap();

        assert_eq!(ledger.stats().unwrap().live_keys, 2);
    }

    #[test]
    fn test_atomically_rolls_back_on_err() {
        let ledger = create_test_ledger();
        let result: Result<()> = ledger.atomically(|| {
            ledger.put_state("AT0001", b"a")?;
            Err(Error::already_exists("AT0002"))
        });

        assert!(result.unwrap_err().is_already_exists());
        assert!(ledger.get_state("AT0001").unwrap().is_none());
        assert_eq!(ledger.stats().unwrap().history_entries, 0);
    }

    #[test]
    fn test_speculatively_never_commits() {
        let ledger = create_test_ledger();
        let seen = ledger
            .speculatively(|| {
                ledger.put_state("AT0001", b"a")?;
                ledger.get_state("AT0001")
            })
            .unwrap();

        assert_eq!(seen.as_deref(), Some(&b"a"[..]));
        assert!(ledger.get_state("AT0001").unwrap().is_none());
    }

    #[test]
    fn test_adapter_failure_surfaces() {
        let ledger = create_test_ledger();
        ledger.conn.execute_batch("DROP TABLE world_state").unwrap();

        let err = ledger.get_state("AT0001").unwrap_err();
        assert!(err.is_adapter_failure());
    }

    #[test]
    fn test_stats_empty() {
        let ledger = create_test_ledger();
        let stats = ledger.stats().unwrap();

        assert_eq!(stats.live_keys, 0);
        assert_eq!(stats.history_entries, 0);
        assert!(stats.last_write.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_path() {
        let ledger = create_test_ledger();
        assert_eq!(ledger.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_page_size_floor() {
        let ledger = create_test_ledger().with_page_size(0);
        assert_eq!(ledger.page_size(), 1);
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");

        {
            let ledger = SqliteLedger::open(&db_path).unwrap();
            ledger.put_state("AT0001", b"{}").unwrap();
            assert_eq!(ledger.path(), db_path);
        }

        let reopened = SqliteLedger::open(&db_path).unwrap();
        assert!(reopened.get_state("AT0001").unwrap().is_some());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/ledger.db");

        let _ledger = SqliteLedger::open(&nested_path).unwrap();
        assert!(nested_path.exists());
    }
}
