//! CLI command definitions.
//!
//! Ledger subcommands translate into named transactions so that the binary
//! reaches the engine only through the dispatcher.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// How a transaction is run against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Commit on success.
    Submit,
    /// Run and discard writes.
    Evaluate,
}

/// A named transaction with its string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Transaction name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Submit or evaluate.
    pub mode: Mode,
}

impl Invocation {
    pub(crate) fn submit(name: &str, args: &[&str]) -> Self {
        Self::new(name, args, Mode::Submit)
    }

    pub(crate) fn evaluate(name: &str, args: &[&str]) -> Self {
        Self::new(name, args, Mode::Evaluate)
    }

    pub(crate) fn new(name: &str, args: &[&str], mode: Mode) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            mode,
        }
    }
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Air taxi identifier (e.g. AT0007)
    pub id: String,

    /// Vehicle manufacturer
    pub manufacturer: String,

    /// Vehicle model
    pub model: String,

    /// Manufacturer serial number
    pub serial_number: String,

    /// Date of manufacture
    pub date_manufactured: String,
}

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Air taxi identifier
    pub id: String,

    /// Registration mark
    pub tail_number: String,

    /// Registered operator
    pub owner: String,
}

/// Flight plan command arguments.
#[derive(Debug, Args)]
pub struct FilePlanCommand {
    /// Air taxi identifier
    pub id: String,

    /// Departure vertiport
    #[arg(long)]
    pub from: String,

    /// Scheduled departure
    #[arg(long)]
    pub departs: String,

    /// Arrival vertiport
    #[arg(long)]
    pub to: String,

    /// Scheduled arrival
    #[arg(long)]
    pub arrives: String,

    /// Passenger identifier
    #[arg(long)]
    pub passenger: String,

    /// Pilot identifier
    #[arg(long)]
    pub pilot: String,
}

/// Raw transaction invocation arguments.
#[derive(Debug, Args)]
pub struct InvokeCommand {
    /// Transaction name (e.g. queryAllAirTaxi)
    pub name: String,

    /// Transaction arguments, in order
    pub args: Vec<String>,

    /// Run without committing
    #[arg(short, long)]
    pub evaluate: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Air taxi identifier
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
