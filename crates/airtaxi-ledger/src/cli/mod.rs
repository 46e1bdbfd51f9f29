//! Command-line interface for the air taxi ledger.
//!
//! This module provides the CLI structure for the `atledger` binary and the
//! mapping from subcommands to ledger transactions.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, CreateCommand, FilePlanCommand, Invocation, InvokeCommand, Mode,
    RegisterCommand, StatusCommand,
};

/// atledger - Air taxi lifecycle ledger
///
/// Creates, registers and deregisters air taxis and tracks each one through
/// flight plan filing, approval, passenger embarkation and disembarkation.
#[derive(Debug, Parser)]
#[command(name = "atledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Pretty-print JSON results
    #[arg(long, global = true)]
    pub pretty: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether an air taxi exists
    Exists {
        /// Air taxi identifier
        id: String,
    },

    /// Create a new air taxi
    Create(CreateCommand),

    /// Show the current record of an air taxi
    Read {
        /// Air taxi identifier
        id: String,
    },

    /// Register an air taxi under a tail number and owner
    Register(RegisterCommand),

    /// Take an air taxi off the register
    Deregister {
        /// Air taxi identifier
        id: String,
    },

    /// List every air taxi in the configured key range
    List,

    /// Show every recorded version of an air taxi
    History {
        /// Air taxi identifier
        id: String,
    },

    /// Request an air taxi for a passenger
    Request,

    /// File a flight plan
    FilePlan(FilePlanCommand),

    /// Approve the filed flight plan
    Approve {
        /// Air taxi identifier
        id: String,
    },

    /// Board the passenger
    Embark {
        /// Air taxi identifier
        id: String,
    },

    /// Let the passenger off
    Disembark {
        /// Air taxi identifier
        id: String,
    },

    /// Seed the ledger with the sample fleet
    Init {
        /// Also register the first sample air taxi
        #[arg(long)]
        register: bool,
    },

    /// Run a transaction by name
    Invoke(InvokeCommand),

    /// List available transactions
    Transactions,

    /// Show the lifecycle state of an air taxi
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Transactions this command runs, in order.
    ///
    /// Commands that don't touch the ledger yield nothing.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        match self {
            Self::Exists { id } => vec![Invocation::evaluate("airTaxiExists", &[id.as_str()])],
            Self::Create(cmd) => vec![Invocation::submit(
                "createAirTaxi",
                &[
                    cmd.id.as_str(),
                    cmd.manufacturer.as_str(),
                    cmd.model.as_str(),
                    cmd.serial_number.as_str(),
                    cmd.date_manufactured.as_str(),
                ],
            )],
            Self::Read { id } => vec![Invocation::evaluate("readAirTaxi", &[id.as_str()])],
            Self::Register(cmd) => vec![Invocation::submit(
                "registerAirTaxi",
                &[cmd.id.as_str(), cmd.tail_number.as_str(), cmd.owner.as_str()],
            )],
            Self::Deregister { id } => vec![Invocation::submit("deregisterAirTaxi", &[id.as_str()])],
            Self::List => vec![Invocation::evaluate("queryAllAirTaxi", &[])],
            Self::History { id } => vec![Invocation::evaluate("readAirTaxiHistory", &[id.as_str()])],
            Self::Request => vec![Invocation::submit("requestTaxi", &[])],
            Self::FilePlan(cmd) => vec![Invocation::submit(
                "fileFlightPlan",
                &[
                    cmd.id.as_str(),
                    cmd.from.as_str(),
                    cmd.departs.as_str(),
                    cmd.to.as_str(),
                    cmd.arrives.as_str(),
                    cmd.passenger.as_str(),
                    cmd.pilot.as_str(),
                ],
            )],
            Self::Approve { id } => vec![Invocation::submit("approveFlightPlan", &[id.as_str()])],
            Self::Embark { id } => vec![Invocation::submit("embarkPassenger", &[id.as_str()])],
            Self::Disembark { id } => vec![Invocation::submit("disembarkPassenger", &[id.as_str()])],
            Self::Init { register } => {
                let mut runs = vec![Invocation::submit("initLedger", &[])];
                if *register {
                    runs.push(Invocation::submit("initRegisterAirTaxi", &[]));
                }
                runs
            }
            Self::Invoke(cmd) => {
                let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
                let mode = if cmd.evaluate {
                    Mode::Evaluate
                } else {
                    Mode::Submit
                };
                vec![Invocation::new(cmd.name.as_str(), &args, mode)]
            }
            Self::Status(cmd) => vec![Invocation::evaluate("readAirTaxi", &[cmd.id.as_str()])],
            Self::Transactions | Self::Config(_) => Vec::new(),
        }
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
