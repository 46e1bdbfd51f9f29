//! `SQLite` schema definitions for the ledger.
//!
//! Current values live in `world_state`; every write and deletion is also
//! appended to `history`, which is never updated in place.

/// SQL statement to create the current-state table.
pub const CREATE_WORLD_STATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS world_state (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    version INTEGER NOT NULL
)
";

/// SQL statement to create the append-only history table.
pub const CREATE_HISTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL,
    tx_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    value BLOB,
    is_delete INTEGER NOT NULL DEFAULT 0
)
";

/// SQL statement to create an index for per-key history replay.
pub const CREATE_HISTORY_KEY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_history_key_seq ON history(key, seq)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_WORLD_STATE_TABLE,
    CREATE_HISTORY_TABLE,
    CREATE_HISTORY_KEY_INDEX,
    CREATE_METADATA_TABLE,
];
