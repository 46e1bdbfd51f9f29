//! Error types for the air taxi ledger.
//!
//! This module defines all error types used throughout the crate. Ledger
//! errors carry the offending key so the boundary can report it verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Ledger Errors ===
    /// Creation attempted on an occupied key.
    #[error("the air taxi {id} already exists")]
    AlreadyExists {
        /// The air taxi identifier.
        id: String,
    },

    /// A read or mutation attempted on a key with no current value.
    #[error("the air taxi {id} does not exist")]
    NotFound {
        /// The air taxi identifier.
        id: String,
    },

    /// A stored record could not be parsed.
    #[error("the air taxi {id} has a malformed record: {source}")]
    MalformedRecord {
        /// The air taxi identifier.
        id: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The operation is not legal in the record's current lifecycle state.
    #[error("cannot {operation} air taxi {id} while it is {state}")]
    InvalidTransition {
        /// The air taxi identifier.
        id: String,
        /// Name of the rejected operation.
        operation: &'static str,
        /// The lifecycle state the record was in.
        state: String,
    },

    /// The identifier does not match the configured id pattern.
    #[error("invalid air taxi id '{id}': must match {pattern}")]
    InvalidId {
        /// The rejected identifier.
        id: String,
        /// The pattern it failed to match.
        pattern: String,
    },

    // === Boundary Errors ===
    /// No transaction is registered under this name.
    #[error("unknown transaction: {name}")]
    UnknownTransaction {
        /// The requested transaction name.
        name: String,
    },

    /// A transaction was invoked with the wrong number of arguments.
    #[error("transaction {name} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// The transaction name.
        name: &'static str,
        /// Number of arguments the transaction takes.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new already-exists error.
    #[must_use]
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Check if this error means the key has no current value.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error means the key was already taken.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Check if this error came from the underlying store itself.
    #[must_use]
    pub fn is_adapter_failure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. } | Self::DatabaseQuery(_) | Self::DatabaseMigration { .. }
        )
    }
}
