//! Paged cursors over the ledger.
//!
//! Range scans and history replays are lazy: rows are fetched a page at a
//! time with keyset pagination, so a scan never holds a statement open
//! between pages and never skips or repeats rows. Each cursor owns a
//! [`CursorGuard`] that is counted by the ledger while the cursor lives and
//! released when it is closed or dropped, on every exit path.

use std::cell::Cell;

use tracing::trace;

use crate::error::Result;

use super::{KeyModification, KeyValue, ScanFrom, SqliteLedger};

/// An iterator backed by an open ledger cursor.
pub trait LedgerIterator: Iterator {
    /// Release the cursor. Dropping the iterator has the same effect.
    fn close(self);
}

/// Marks a cursor as open for as long as it lives.
#[derive(Debug)]
pub struct CursorGuard<'a> {
    open: &'a Cell<usize>,
    kind: &'static str,
}

impl<'a> CursorGuard<'a> {
    /// Register a new open cursor with the given counter.
    #[must_use]
    pub fn acquire(open: &'a Cell<usize>, kind: &'static str) -> Self {
        open.set(open.get() + 1);
        trace!("Opened {} cursor ({} open)", kind, open.get());
        Self { open, kind }
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.open.set(self.open.get().saturating_sub(1));
        trace!("Closed {} cursor ({} open)", self.kind, self.open.get());
    }
}

/// Forward cursor over `[start, end)` of the current state.
#[derive(Debug)]
pub struct StateIter<'a> {
    ledger: &'a SqliteLedger,
    end_key: String,
    from: ScanFrom,
    page: std::vec::IntoIter<KeyValue>,
    exhausted: bool,
    _guard: CursorGuard<'a>,
}

impl<'a> StateIter<'a> {
    pub(crate) fn new(ledger: &'a SqliteLedger, start_key: &str, end_key: &str) -> Self {
        Self {
            ledger,
            end_key: end_key.to_string(),
            from: ScanFrom::At(start_key.to_string()),
            page: Vec::new().into_iter(),
            exhausted: false,
            _guard: CursorGuard::acquire(&ledger.open_cursors, "range"),
        }
    }
}

impl Iterator for StateIter<'_> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(kv) = self.page.next() {
            return Some(Ok(kv));
        }
        if self.exhausted {
            return None;
        }

        match self.ledger.fetch_state_page(&self.from, &self.end_key) {
            Ok(rows) => {
                if rows.len() < self.ledger.page_size() {
                    self.exhausted = true;
                }
                if let Some(last) = rows.last() {
                    self.from = ScanFrom::After(last.key.clone());
                }
                self.page = rows.into_iter();
                self.page.next().map(Ok)
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

impl LedgerIterator for StateIter<'_> {
    fn close(self) {}
}

/// Cursor over the write history of one key, oldest first.
#[derive(Debug)]
pub struct HistoryIter<'a> {
    ledger: &'a SqliteLedger,
    key: String,
    after_seq: i64,
    page: std::vec::IntoIter<(i64, KeyModification)>,
    exhausted: bool,
    _guard: CursorGuard<'a>,
}

impl<'a> HistoryIter<'a> {
    pub(crate) fn new(ledger: &'a SqliteLedger, key: &str) -> Self {
        Self {
            ledger,
            key: key.to_string(),
            after_seq: 0,
            page: Vec::new().into_iter(),
            exhausted: false,
            _guard: CursorGuard::acquire(&ledger.open_cursors, "history"),
        }
    }
}

impl Iterator for HistoryIter<'_> {
    type Item = Result<KeyModification>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((_, modification)) = self.page.next() {
            return Some(Ok(modification));
        }
        if self.exhausted {
            return None;
        }

        match self.ledger.fetch_history_page(&self.key, self.after_seq) {
            Ok(rows) => {
                if rows.len() < self.ledger.page_size() {
                    self.exhausted = true;
                }
                if let Some((seq, _)) = rows.last() {
                    self.after_seq = *seq;
                }
                self.page = rows.into_iter();
                self.page.next().map(|(_, modification)| Ok(modification))
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

impl LedgerIterator for HistoryIter<'_> {
    fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerStore;

    #[test]
    fn test_guard_counts() {
        let open = Cell::new(0);
        let first = CursorGuard::acquire(&open, "range");
        let second = CursorGuard::acquire(&open, "history");
        assert_eq!(open.get(), 2);

        drop(first);
        assert_eq!(open.get(), 1);
        drop(second);
        assert_eq!(open.get(), 0);
    }

    #[test]
    fn test_state_iter_stays_exhausted() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.put_state("AT0001", b"{}").unwrap();

        let mut scan = ledger.state_by_range("AT0001", "AT9999").unwrap();
        assert!(scan.next().is_some());
        assert!(scan.next().is_none());

        // A write after exhaustion is not picked up by the same cursor.
        ledger.put_state("AT0002", b"{}").unwrap();
        assert!(scan.next().is_none());
    }

    #[test]
    fn test_state_iter_sees_rows_written_between_pages() {
        let ledger = SqliteLedger::open_in_memory().unwrap().with_page_size(1);
        ledger.put_state("AT0001", b"{}").unwrap();
        ledger.put_state("AT0002", b"{}").unwrap();

        let mut scan = ledger.state_by_range("AT0001", "AT9999").unwrap();
        assert_eq!(scan.next().unwrap().unwrap().key, "AT0001");
        ledger.put_state("AT0003", b"{}").unwrap();

        let rest: Vec<String> = scan.map(|kv| kv.unwrap().key).collect();
        assert_eq!(rest, vec!["AT0002", "AT0003"]);
    }

    #[test]
    fn test_failed_page_ends_scan_and_releases_guard() {
        let ledger = SqliteLedger::open_in_memory().unwrap().with_page_size(1);
        for key in ["AT0001", "AT0002", "AT0003"] {
            ledger.put_state(key, b"{}").unwrap();
        }

        let collect = |ledger: &SqliteLedger| -> Result<Vec<String>> {
            let mut scan = ledger.state_by_range("AT0001", "AT9999")?;
            let mut keys = Vec::new();
            for kv in scan.by_ref() {
                let kv = kv?;
                if kv.key == "AT0001" {
                    ledger.conn.execute_batch("DROP TABLE world_state")?;
                }
                keys.push(kv.key);
            }
            scan.close();
            Ok(keys)
        };

        let err = collect(&ledger).unwrap_err();
        assert!(err.is_adapter_failure());
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_history_iter_stops_after_error() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.put_state("AT0001", b"{}").unwrap();
        ledger.conn.execute_batch("DROP TABLE history").unwrap();

        let mut history = ledger.history_for_key("AT0001").unwrap();
        assert!(history.next().unwrap().is_err());
        assert!(history.next().is_none());
        drop(history);
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_close_releases_guard() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let scan = ledger.state_by_range("", "").unwrap();
        let history = ledger.history_for_key("AT0001").unwrap();
        assert_eq!(ledger.open_cursors(), 2);

        scan.close();
        history.close();
        assert_eq!(ledger.open_cursors(), 0);
    }
}
