//! `airtaxi-ledger` - A lifecycle ledger for registered air taxis
//!
//! This library records air taxis on an append-only, versioned key-value
//! ledger and tracks each one from creation through registration, flight
//! plan filing and approval, passenger boarding, and deregistration.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod record;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, LedgerConfig, TransitionPolicy};
pub use contract::AirTaxiContract;
pub use dispatch::{Dispatcher, TransactionDef};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{AirTaxi, HistoryResult, LifecycleState, QueryResult, StoredValue};
pub use storage::{LedgerStats, LedgerStore, SqliteLedger};
