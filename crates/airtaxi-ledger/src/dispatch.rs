//! Named-transaction boundary over the lifecycle engine.
//!
//! Callers name an operation and pass its arguments as strings; results come
//! back as UTF-8 bytes. Submitted transactions commit all-or-nothing.
//! Evaluated transactions run against current state and never commit.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::contract::AirTaxiContract;
use crate::error::{Error, Result};
use crate::storage::LedgerStore;

type Handler<L> = fn(&AirTaxiContract<L>, &[String]) -> Result<Vec<u8>>;

/// One entry of the transaction table.
pub struct TransactionDef<L> {
    /// Name the transaction is invoked by.
    pub name: &'static str,
    /// Argument names, in order.
    pub params: &'static [&'static str],
    /// Whether the transaction only reads.
    pub read_only: bool,
    handler: Handler<L>,
}

impl<L> fmt::Debug for TransactionDef<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl<L> TransactionDef<L> {
    /// Number of arguments the transaction takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Routes named transactions to the engine.
#[derive(Debug)]
pub struct Dispatcher<L> {
    contract: AirTaxiContract<L>,
    table: Vec<TransactionDef<L>>,
}

impl<L: LedgerStore> Dispatcher<L> {
    /// Build the transaction table around an engine.
    #[must_use]
    pub fn new(contract: AirTaxiContract<L>) -> Self {
        let table = vec![
            TransactionDef {
                name: "initLedger",
                params: &[],
                read_only: false,
                handler: |c, _| c.init_ledger().map(|()| Vec::new()),
            },
            TransactionDef {
                name: "initRegisterAirTaxi",
                params: &[],
                read_only: false,
                handler: |c, _| c.init_register_air_taxi().map(|()| Vec::new()),
            },
            TransactionDef {
                name: "airTaxiExists",
                params: &["airTaxiId"],
                read_only: true,
                handler: |c, a| c.air_taxi_exists(&a[0]).map(boolean),
            },
            TransactionDef {
                name: "createAirTaxi",
                params: &[
                    "airTaxiId",
                    "manufacturer",
                    "model",
                    "serialNumber",
                    "dateManufactured",
                ],
                read_only: false,
                handler: |c, a| {
                    c.create_air_taxi(&a[0], &a[1], &a[2], &a[3], &a[4])
                        .map(|()| Vec::new())
                },
            },
            TransactionDef {
                name: "readAirTaxi",
                params: &["airTaxiId"],
                read_only: true,
                handler: |c, a| json(&c.read_air_taxi(&a[0])?),
            },
            TransactionDef {
                name: "registerAirTaxi",
                params: &["airTaxiId", "tailNumber", "owner"],
                read_only: false,
                handler: |c, a| {
                    c.register_air_taxi(&a[0], &a[1], &a[2])
                        .map(|()| Vec::new())
                },
            },
            TransactionDef {
                name: "deregisterAirTaxi",
                params: &["airTaxiId"],
                read_only: false,
                handler: |c, a| c.deregister_air_taxi(&a[0]).map(|()| Vec::new()),
            },
            TransactionDef {
                name: "queryAllAirTaxi",
                params: &[],
                read_only: true,
                handler: |c, _| json(&c.query_all_air_taxi()?),
            },
            TransactionDef {
                name: "readAirTaxiHistory",
                params: &["airTaxiId"],
                read_only: false,
                handler: |c, a| json(&c.read_air_taxi_history(&a[0])?),
            },
            TransactionDef {
                name: "requestTaxi",
                params: &[],
                read_only: false,
                handler: |c, _| json(&c.request_taxi()?),
            },
            TransactionDef {
                name: "fileFlightPlan",
                params: &[
                    "airTaxiId",
                    "departurePort",
                    "departureDateTime",
                    "arrivalPort",
                    "arrivalDateTime",
                    "passengerId",
                    "pilotId",
                ],
                read_only: false,
                handler: |c, a| {
                    c.file_flight_plan(&a[0], &a[1], &a[2], &a[3], &a[4], &a[5], &a[6])
                        .map(|()| Vec::new())
                },
            },
            TransactionDef {
                name: "approveFlightPlan",
                params: &["airTaxiId"],
                read_only: false,
                handler: |c, a| c.approve_flight_plan(&a[0]).map(|()| Vec::new()),
            },
            TransactionDef {
                name: "embarkPassenger",
                params: &["airTaxiId"],
                read_only: false,
                handler: |c, a| c.embark_passenger(&a[0]).map(|()| Vec::new()),
            },
            TransactionDef {
                name: "disembarkPassenger",
                params: &["airTaxiId"],
                read_only: false,
                handler: |c, a| c.disembark_passenger(&a[0]).map(|()| Vec::new()),
            },
        ];

        Self { contract, table }
    }

    /// The engine behind this dispatcher.
    #[must_use]
    pub fn contract(&self) -> &AirTaxiContract<L> {
        &self.contract
    }

    /// Every registered transaction, in registration order.
    #[must_use]
    pub fn transactions(&self) -> &[TransactionDef<L>] {
        &self.table
    }

    /// Run a transaction and commit its writes if it succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransaction`] or [`Error::ArgumentCount`] for
    /// a bad invocation, or whatever the engine fails with. No writes from a
    /// failed transaction are kept.
    pub fn submit_transaction(&self, name: &str, args: &[String]) -> Result<Vec<u8>> {
        let def = self.resolve(name, args)?;
        debug!("Submitting {} with {} argument(s)", def.name, args.len());

        let contract = &self.contract;
        let output = contract
            .ledger()
            .atomically(|| (def.handler)(contract, args))?;

        info!("Committed transaction {}", def.name);
        Ok(output)
    }

    /// Run a transaction against current state and discard its writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransaction`] or [`Error::ArgumentCount`] for
    /// a bad invocation, or whatever the engine fails with.
    pub fn evaluate_transaction(&self, name: &str, args: &[String]) -> Result<Vec<u8>> {
        let def = self.resolve(name, args)?;
        if def.read_only {
            debug!("Evaluating {}", def.name);
        } else {
            debug!("Evaluating {} as a dry run, writes will be discarded", def.name);
        }

        let contract = &self.contract;
        contract
            .ledger()
            .speculatively(|| (def.handler)(contract, args))
    }

    fn resolve(&self, name: &str, args: &[String]) -> Result<&TransactionDef<L>> {
        let def = self
            .table
            .iter()
            .find(|def| def.name == name)
            .ok_or_else(|| Error::UnknownTransaction {
                name: name.to_string(),
            })?;

        if args.len() != def.arity() {
            return Err(Error::ArgumentCount {
                name: def.name,
                expected: def.arity(),
                actual: args.len(),
            });
        }
        Ok(def)
    }
}

fn boolean(value: bool) -> Vec<u8> {
    value.to_string().into_bytes()
}

fn json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
