//! Air taxi lifecycle engine.
//!
//! [`AirTaxiContract`] owns the rules: which operations need an existing
//! record, what each one writes, and (under a strict
//! [`TransitionPolicy`]) which lifecycle states each one may start from.
//! It never caches records; every operation re-reads current state through
//! the [`LedgerStore`] and writes the whole record back.

use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{LedgerConfig, TransitionPolicy};
use crate::error::{Error, Result};
use crate::record::{AirTaxi, HistoryResult, LifecycleState, QueryResult, StoredValue};
use crate::storage::{KeyValue, LedgerIterator, LedgerStore};

/// Sample fleet written by [`AirTaxiContract::init_ledger`]:
/// id, manufacturer, model, serial number.
pub const SAMPLE_FLEET: [(&str, &str, &str, &str); 6] = [
    ("AT0001", "IJD", "Mavic Air 2S", "1K9PDC09182"),
    ("AT0002", "FomoCopter", "X2-100", "2FM20998PE4RU8I"),
    ("AT0003", "AirArk", "Ark X100", "3X2P9I76YXCV"),
    ("AT0004", "BusAir", "CityAirBus X8", "4CABX8I09787"),
    ("AT0005", "Beauing", "B780-100", "5B800FGTUHX95"),
    ("AT0006", "StarFleet", "SF600", "6PO8K90XCT68"),
];

/// Manufacture date shared by the sample fleet.
pub const SAMPLE_DATE_MANUFACTURED: &str = "01/04/2021";

/// Registration applied by [`AirTaxiContract::init_register_air_taxi`]:
/// id, tail number, owner.
pub const SAMPLE_REGISTRATION: (&str, &str, &str) = ("AT0001", "9V1BC", "VoloCity Air Taxi");

/// The air taxi lifecycle engine.
#[derive(Debug)]
pub struct AirTaxiContract<L> {
    ledger: L,
    clock: Arc<dyn Clock>,
    settings: LedgerConfig,
    id_pattern: Option<Regex>,
}

impl<L: LedgerStore> AirTaxiContract<L> {
    /// Create an engine over the given ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the date format or id pattern in `settings` is invalid.
    pub fn new(ledger: L, settings: LedgerConfig) -> Result<Self> {
        if StrftimeItems::new(&settings.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::ConfigValidation {
                message: format!("invalid date format: {}", settings.date_format),
            });
        }

        let id_pattern = settings
            .id_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid id pattern: {e}"),
            })?;

        Ok(Self {
            ledger,
            clock: Arc::new(SystemClock),
            settings,
            id_pattern,
        })
    }

    /// Use the given clock for registration and deregistration dates.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The rules this engine runs with.
    #[must_use]
    pub fn settings(&self) -> &LedgerConfig {
        &self.settings
    }

    /// Check whether an air taxi has a current, non-empty record.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger read fails.
    pub fn air_taxi_exists(&self, id: &str) -> Result<bool> {
        Ok(self
            .ledger
            .get_state(id)?
            .is_some_and(|value| !value.is_empty()))
    }

    /// Create a new air taxi carrying its manufacture details.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the id is taken, or
    /// [`Error::InvalidId`] if it fails the configured id pattern.
    pub fn create_air_taxi(
        &self,
        id: &str,
        manufacturer: &str,
        model: &str,
        serial_number: &str,
        date_manufactured: &str,
    ) -> Result<()> {
        if let Some(pattern) = &self.id_pattern {
            if !pattern.is_match(id) {
                return Err(Error::InvalidId {
                    id: id.to_string(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        if self.air_taxi_exists(id)? {
            return Err(Error::already_exists(id));
        }

        let taxi = AirTaxi::new(manufacturer, model, serial_number, date_manufactured);
        self.store(id, &taxi)?;
        info!("Created air taxi {} ({} {})", id, manufacturer, model);
        Ok(())
    }

    /// Read the current record of an air taxi.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record, or
    /// [`Error::MalformedRecord`] if the stored value does not parse.
    pub fn read_air_taxi(&self, id: &str) -> Result<AirTaxi> {
        let bytes = match self.ledger.get_state(id)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(Error::not_found(id)),
        };
        AirTaxi::from_slice(&bytes).map_err(|source| Error::MalformedRecord {
            id: id.to_string(),
            source,
        })
    }

    /// Register an air taxi under a tail number and owner.
    ///
    /// Stamps today's date and the configured approval authority.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    pub fn register_air_taxi(&self, id: &str, tail_number: &str, owner: &str) -> Result<()> {
        let today = self.today();
        let authority = self.settings.approval_authority.clone();
        self.update(id, "register", &[LifecycleState::Unregistered], |taxi| {
            taxi.tail_number = Some(tail_number.to_string());
            taxi.owner = Some(owner.to_string());
            taxi.date_registered = Some(today);
            taxi.approval_authority = Some(authority);
        })?;
        info!("Registered air taxi {} as {} for {}", id, tail_number, owner);
        Ok(())
    }

    /// Take an air taxi off the register. The record stays readable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    pub fn deregister_air_taxi(&self, id: &str) -> Result<()> {
        let today = self.today();
        self.update(
            id,
            "deregister",
            &[
                LifecycleState::Registered,
                LifecycleState::PlanFiled,
                LifecycleState::PlanApproved,
                LifecycleState::Embarked,
                LifecycleState::Disembarked,
            ],
            |taxi| {
                taxi.active = Some(false);
                taxi.date_deregistered = Some(today);
            },
        )?;
        info!("Deregistered air taxi {}", id);
        Ok(())
    }

    /// File a flight plan against an air taxi.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    #[allow(clippy::too_many_arguments)]
    pub fn file_flight_plan(
        &self,
        id: &str,
        departure_port: &str,
        departure_date_time: &str,
        arrival_port: &str,
        arrival_date_time: &str,
        passenger_id: &str,
        pilot_id: &str,
    ) -> Result<()> {
        let fresh_cycle = self.settings.transition_policy == TransitionPolicy::Strict;
        self.update(
            id,
            "file a flight plan for",
            &[
                LifecycleState::Registered,
                LifecycleState::PlanFiled,
                LifecycleState::Disembarked,
            ],
            |taxi| {
                taxi.departure_port = Some(departure_port.to_string());
                taxi.departure_date_time = Some(departure_date_time.to_string());
                taxi.arrival_port = Some(arrival_port.to_string());
                taxi.arrival_date_time = Some(arrival_date_time.to_string());
                taxi.passenger_id = Some(passenger_id.to_string());
                taxi.pilot_id = Some(pilot_id.to_string());
                if fresh_cycle {
                    taxi.flight_plan_approved = Some(false);
                    taxi.embarked = Some(false);
                    taxi.disembarked = Some(false);
                }
            },
        )?;
        info!(
            "Filed flight plan for air taxi {}: {} -> {}",
            id, departure_port, arrival_port
        );
        Ok(())
    }

    /// Approve the filed flight plan and start a fresh boarding cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    pub fn approve_flight_plan(&self, id: &str) -> Result<()> {
        self.update(
            id,
            "approve the flight plan of",
            &[LifecycleState::PlanFiled],
            |taxi| {
                taxi.flight_plan_approved = Some(true);
                taxi.embarked = Some(false);
                taxi.disembarked = Some(false);
            },
        )?;
        info!("Approved flight plan for air taxi {}", id);
        Ok(())
    }

    /// Mark the passenger as boarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    pub fn embark_passenger(&self, id: &str) -> Result<()> {
        self.update(
            id,
            "embark a passenger on",
            &[LifecycleState::PlanApproved],
            |taxi| taxi.embarked = Some(true),
        )?;
        info!("Passenger embarked on air taxi {}", id);
        Ok(())
    }

    /// Mark the passenger as having left the vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no record.
    pub fn disembark_passenger(&self, id: &str) -> Result<()> {
        self.update(
            id,
            "disembark a passenger from",
            &[LifecycleState::Embarked],
            |taxi| taxi.disembarked = Some(true),
        )?;
        info!("Passenger disembarked from air taxi {}", id);
        Ok(())
    }

    /// List every air taxi in the configured key range.
    ///
    /// Values that do not parse as a record are returned raw.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger scan fails.
    pub fn query_all_air_taxi(&self) -> Result<Vec<QueryResult>> {
        let start = &self.settings.scan_start_key;
        let end = &self.settings.scan_end_key;

        let mut cursor = self.ledger.state_by_range(start, end)?;
        let mut results = Vec::new();
        for entry in cursor.by_ref() {
            let KeyValue { key, value } = entry?;
            if value.is_empty() {
                continue;
            }
            let record = StoredValue::from_bytes(&value);
            if record.is_raw() {
                warn!("Air taxi {} holds an unparsable record, returning it raw", key);
            }
            results.push(QueryResult { key, record });
        }
        cursor.close();

        debug!("Range [{}, {}) returned {} air taxis", start, end, results.len());
        Ok(results)
    }

    /// Replay every recorded version of an air taxi, oldest first.
    ///
    /// Deletions are skipped. Values that do not parse are returned raw.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no current record.
    pub fn read_air_taxi_history(&self, id: &str) -> Result<Vec<HistoryResult>> {
        if !self.air_taxi_exists(id)? {
            return Err(Error::not_found(id));
        }

        let mut cursor = self.ledger.history_for_key(id)?;
        let mut results = Vec::new();
        for entry in cursor.by_ref() {
            let modification = entry?;
            let Some(value) = modification.value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let record = StoredValue::from_bytes(&value);
            if record.is_raw() {
                warn!(
                    "Air taxi {} has an unparsable version in tx {}, returning it raw",
                    id, modification.tx_id
                );
            }
            results.push(HistoryResult {
                key: id.to_string(),
                record,
                tx_id: modification.tx_id,
                timestamp: modification.timestamp,
            });
        }
        cursor.close();

        debug!("Air taxi {} has {} recorded versions", id, results.len());
        Ok(results)
    }

    /// Allocate an air taxi to a passenger request.
    ///
    /// Allocation is simulated: the configured taxi is always handed out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the allocated air taxi has no record.
    pub fn request_taxi(&self) -> Result<AirTaxi> {
        let id = &self.settings.allocated_taxi_id;
        let taxi = self.read_air_taxi(id)?;
        info!("Air taxi {} booked", id);
        Ok(taxi)
    }

    /// Seed the ledger with the sample fleet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if any sample id is taken.
    pub fn init_ledger(&self) -> Result<()> {
        for (id, manufacturer, model, serial_number) in SAMPLE_FLEET {
            self.create_air_taxi(
                id,
                manufacturer,
                model,
                serial_number,
                SAMPLE_DATE_MANUFACTURED,
            )?;
        }
        Ok(())
    }

    /// Register the first sample air taxi so it is operationally ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the sample fleet has not been seeded.
    pub fn init_register_air_taxi(&self) -> Result<()> {
        let (id, tail_number, owner) = SAMPLE_REGISTRATION;
        self.register_air_taxi(id, tail_number, owner)
    }

    /// The calendar date is the UTC one, whatever the host timezone.
    fn today(&self) -> String {
        self.clock
            .now()
            .format(&self.settings.date_format)
            .to_string()
    }

    fn store(&self, id: &str, taxi: &AirTaxi) -> Result<()> {
        let bytes = taxi.to_bytes()?;
        self.ledger.put_state(id, &bytes)
    }

    fn update(
        &self,
        id: &str,
        operation: &'static str,
        allowed_from: &[LifecycleState],
        mutate: impl FnOnce(&mut AirTaxi),
    ) -> Result<()> {
        let mut taxi = self.read_air_taxi(id)?;

        if self.settings.transition_policy == TransitionPolicy::Strict {
            let state = taxi.state();
            if !allowed_from.contains(&state) {
                return Err(Error::InvalidTransition {
                    id: id.to_string(),
                    operation,
                    state: state.to_string(),
                });
            }
        }

        mutate(&mut taxi);
        self.store(id, &taxi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::SqliteLedger;
    use chrono::{TimeZone, Utc};

    fn contract_with(settings: LedgerConfig) -> AirTaxiContract<SqliteLedger> {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()));
        let ledger = SqliteLedger::open_in_memory()
            .unwrap()
            .with_clock(clock.clone());
        AirTaxiContract::new(ledger, settings)
            .unwrap()
            .with_clock(clock)
    }

    fn contract() -> AirTaxiContract<SqliteLedger> {
        contract_with(LedgerConfig::default())
    }

    fn strict() -> AirTaxiContract<SqliteLedger> {
        contract_with(LedgerConfig {
            transition_policy: TransitionPolicy::Strict,
            ..LedgerConfig::default()
        })
    }

    fn writes(contract: &AirTaxiContract<SqliteLedger>) -> i64 {
        contract.ledger().stats().unwrap().history_entries
    }

    fn create(contract: &AirTaxiContract<SqliteLedger>, id: &str) {
        contract
            .create_air_taxi(id, "IJD", "Mavic Air 2S", "1K9PDC09182", "01/04/2021")
            .unwrap();
    }

    #[test]
    fn test_exists_false_then_true() {
        let contract = contract();
        assert!(!contract.air_taxi_exists("AT0001").unwrap());
        create(&contract, "AT0001");
        assert!(contract.air_taxi_exists("AT0001").unwrap());
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let contract = contract();
        contract.ledger().put_state("AT0001", b"").unwrap();

        assert!(!contract.air_taxi_exists("AT0001").unwrap());
        assert!(contract.read_air_taxi("AT0001").unwrap_err().is_not_found());
        create(&contract, "AT0001");
    }

    #[test]
    fn test_create_twice_keeps_first() {
        let contract = contract();
        create(&contract, "AT0001");

        let err = contract
            .create_air_taxi("AT0001", "AirArk", "Ark X100", "3X2P9I76YXCV", "02/04/2021")
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "the air taxi AT0001 already exists");

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.manufacturer.as_deref(), Some("IJD"));
        assert_eq!(writes(&contract), 1);
    }

    #[test]
    fn test_create_respects_id_pattern() {
        let contract = contract_with(LedgerConfig {
            id_pattern: Some(r"^AT\d{4}$".to_string()),
            ..LedgerConfig::default()
        });

        let err = contract
            .create_air_taxi("XX1", "IJD", "Mavic Air 2S", "1K9", "01/04/2021")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
        assert_eq!(writes(&contract), 0);

        create(&contract, "AT0042");
    }

    #[test]
    fn test_new_rejects_bad_settings() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let result = AirTaxiContract::new(
            ledger,
            LedgerConfig {
                id_pattern: Some("(".to_string()),
                ..LedgerConfig::default()
            },
        );
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_read_round_trip() {
        let contract = contract();
        create(&contract, "AT0001");

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(
            taxi,
            AirTaxi::new("IJD", "Mavic Air 2S", "1K9PDC09182", "01/04/2021")
        );
    }

    #[test]
    fn test_read_malformed_is_fatal() {
        let contract = contract();
        contract.ledger().put_state("AT0001", b"{broken").unwrap();

        let err = contract.read_air_taxi("AT0001").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref id, .. } if id == "AT0001"));
    }

    #[test]
    fn test_mutations_on_missing_id() {
        let contract = contract();

        let results = [
            contract.register_air_taxi("AT0404", "9V1BC", "Owner"),
            contract.deregister_air_taxi("AT0404"),
            contract.file_flight_plan("AT0404", "WSSS", "d", "WSSL", "a", "p", "q"),
            contract.approve_flight_plan("AT0404"),
            contract.embark_passenger("AT0404"),
            contract.disembark_passenger("AT0404"),
        ];
        for result in results {
            let err = result.unwrap_err();
            assert!(err.is_not_found());
            assert!(err.to_string().contains("AT0404"));
        }
        assert!(contract.read_air_taxi("AT0404").unwrap_err().is_not_found());
        assert!(contract
            .read_air_taxi_history("AT0404")
            .unwrap_err()
            .is_not_found());
        assert_eq!(writes(&contract), 0);
    }

    #[test]
    fn test_register_stamps_date_and_authority() {
        let contract = contract();
        create(&contract, "AT0001");
        contract
            .register_air_taxi("AT0001", "9V1BC", "VoloCity Air Taxi")
            .unwrap();

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.tail_number.as_deref(), Some("9V1BC"));
        assert_eq!(taxi.owner.as_deref(), Some("VoloCity Air Taxi"));
        assert_eq!(taxi.date_registered.as_deref(), Some("01/04/2024"));
        assert_eq!(taxi.approval_authority.as_deref(), Some("CAAS"));
        assert_eq!(taxi.manufacturer.as_deref(), Some("IJD"));
    }

    #[test]
    fn test_register_uses_configured_authority_and_format() {
        let contract = contract_with(LedgerConfig {
            approval_authority: "EASA".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            ..LedgerConfig::default()
        });
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "D-EVTL", "Volocopter").unwrap();

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.approval_authority.as_deref(), Some("EASA"));
        assert_eq!(taxi.date_registered.as_deref(), Some("2024-04-01"));
    }

    #[test]
    fn test_dates_use_utc_calendar_day() {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 4, 1, 23, 30, 0).unwrap()));
        let contract = contract().with_clock(clock);
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract.deregister_air_taxi("AT0001").unwrap();

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.date_registered.as_deref(), Some("01/04/2024"));
        assert_eq!(taxi.date_deregistered.as_deref(), Some("01/04/2024"));
    }

    #[test]
    fn test_updates_keep_unmodelled_fields() {
        let contract = contract();
        contract
            .ledger()
            .put_state(
                "AT0001",
                br#"{"manufacturer":"IJD","docType":"airtaxi","color":"red"}"#,
            )
            .unwrap();
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract
            .file_flight_plan("AT0001", "WSSS", "0800", "WSSL", "0810", "P1", "C1")
            .unwrap();

        let stored = contract.ledger().get_state("AT0001").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(value["docType"], "airtaxi");
        assert_eq!(value["color"], "red");
        assert_eq!(value["tailNumber"], "9V1BC");
        assert_eq!(value["departurePort"], "WSSS");

        let results = contract.query_all_air_taxi().unwrap();
        let taxi = results[0].record.record().unwrap();
        assert_eq!(taxi.extra["color"], "red");

        let history = contract.read_air_taxi_history("AT0001").unwrap();
        assert!(history
            .iter()
            .all(|h| h.record.record().unwrap().extra["docType"] == "airtaxi"));
    }

    #[test]
    fn test_deregister() {
        let contract = contract();
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract.deregister_air_taxi("AT0001").unwrap();

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.active, Some(false));
        assert_eq!(taxi.date_deregistered.as_deref(), Some("01/04/2024"));
        assert_eq!(taxi.state(), LifecycleState::Deregistered);
    }

    #[test]
    fn test_file_flight_plan_sets_all_fields() {
        let contract = contract();
        create(&contract, "AT0002");
        contract
            .file_flight_plan(
                "AT0002",
                "WSSS",
                "1 Apr 2024 0800",
                "WSSL",
                "1 Apr 2024 0810",
                "Rich Dot Com",
                "Ali Anchovies",
            )
            .unwrap();

        let taxi = contract.read_air_taxi("AT0002").unwrap();
        assert_eq!(taxi.departure_port.as_deref(), Some("WSSS"));
        assert_eq!(taxi.departure_date_time.as_deref(), Some("1 Apr 2024 0800"));
        assert_eq!(taxi.arrival_port.as_deref(), Some("WSSL"));
        assert_eq!(taxi.arrival_date_time.as_deref(), Some("1 Apr 2024 0810"));
        assert_eq!(taxi.passenger_id.as_deref(), Some("Rich Dot Com"));
        assert_eq!(taxi.pilot_id.as_deref(), Some("Ali Anchovies"));
        assert!(taxi.flight_plan_approved.is_none());
    }

    #[test]
    fn test_approve_resets_boarding_flags() {
        let contract = contract();
        create(&contract, "AT0001");
        contract.embark_passenger("AT0001").unwrap();
        contract.disembark_passenger("AT0001").unwrap();

        contract.approve_flight_plan("AT0001").unwrap();

        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.flight_plan_approved, Some(true));
        assert_eq!(taxi.embarked, Some(false));
        assert_eq!(taxi.disembarked, Some(false));
    }

    #[test]
    fn test_permissive_allows_out_of_order() {
        let contract = contract();
        create(&contract, "AT0001");

        contract.approve_flight_plan("AT0001").unwrap();
        contract.disembark_passenger("AT0001").unwrap();
        contract.deregister_air_taxi("AT0001").unwrap();
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
    }

    #[test]
    fn test_strict_full_cycle() {
        let contract = strict();
        create(&contract, "AT0001");

        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract
            .file_flight_plan("AT0001", "WSSS", "d", "WSSL", "a", "p", "q")
            .unwrap();
        assert_eq!(
            contract.read_air_taxi("AT0001").unwrap().state(),
            LifecycleState::PlanFiled
        );
        contract.approve_flight_plan("AT0001").unwrap();
        contract.embark_passenger("AT0001").unwrap();
        contract.disembark_passenger("AT0001").unwrap();

        // A new plan after landing starts a fresh cycle.
        contract
            .file_flight_plan("AT0001", "WSSL", "d2", "WSSS", "a2", "p", "q")
            .unwrap();
        assert_eq!(
            contract.read_air_taxi("AT0001").unwrap().state(),
            LifecycleState::PlanFiled
        );

        contract.deregister_air_taxi("AT0001").unwrap();
    }

    #[test]
    fn test_strict_rejects_out_of_order() {
        let contract = strict();
        create(&contract, "AT0001");
        let before = writes(&contract);

        let err = contract.approve_flight_plan("AT0001").unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(
            err.to_string(),
            "cannot approve the flight plan of air taxi AT0001 while it is unregistered"
        );

        assert!(contract.deregister_air_taxi("AT0001").is_err());
        assert!(contract.embark_passenger("AT0001").is_err());
        assert_eq!(writes(&contract), before);
    }

    #[test]
    fn test_strict_deregistered_is_terminal() {
        let contract = strict();
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract.deregister_air_taxi("AT0001").unwrap();

        assert!(contract.register_air_taxi("AT0001", "9V1BC", "Owner").is_err());
        assert!(contract.deregister_air_taxi("AT0001").is_err());
        assert!(contract
            .file_flight_plan("AT0001", "WSSS", "d", "WSSL", "a", "p", "q")
            .is_err());
        assert!(contract.read_air_taxi("AT0001").is_ok());
    }

    #[test]
    fn test_query_all_excludes_out_of_range() {
        let contract = contract();
        for id in ["AT0001", "AT0002", "AT0003"] {
            create(&contract, id);
        }
        contract.ledger().put_state("ZZ9999", b"{}").unwrap();

        let results = contract.query_all_air_taxi().unwrap();
        let keys: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["AT0001", "AT0002", "AT0003"]);
        assert_eq!(contract.ledger().open_cursors(), 0);
    }

    #[test]
    fn test_query_all_passes_raw_values_through() {
        let contract = contract();
        create(&contract, "AT0001");
        contract.ledger().put_state("AT0002", b"not json").unwrap();

        let results = contract.query_all_air_taxi().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].record.record().is_some());
        assert_eq!(results[1].record, StoredValue::Raw("not json".to_string()));
    }

    #[test]
    fn test_query_all_unbounded() {
        let contract = contract_with(LedgerConfig {
            scan_start_key: String::new(),
            scan_end_key: String::new(),
            ..LedgerConfig::default()
        });
        create(&contract, "AT0001");
        contract.ledger().put_state("ZZ9999", b"{}").unwrap();

        assert_eq!(contract.query_all_air_taxi().unwrap().len(), 2);
    }

    #[test]
    fn test_query_all_failure_releases_cursor() {
        let ledger = SqliteLedger::open_in_memory().unwrap().with_page_size(1);
        let contract = AirTaxiContract::new(ledger, LedgerConfig::default()).unwrap();
        for id in ["AT0001", "AT0002", "AT0003"] {
            create(&contract, id);
        }
        contract
            .ledger()
            .connection()
            .execute_batch("DROP TABLE world_state")
            .unwrap();

        let err = contract.query_all_air_taxi().unwrap_err();
        assert!(err.is_adapter_failure());
        assert_eq!(contract.ledger().open_cursors(), 0);
    }

    #[test]
    fn test_history_failure_releases_cursor() {
        let ledger = SqliteLedger::open_in_memory().unwrap().with_page_size(1);
        let contract = AirTaxiContract::new(ledger, LedgerConfig::default()).unwrap();
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract
            .ledger()
            .connection()
            .execute_batch("DROP TABLE history")
            .unwrap();

        let err = contract.read_air_taxi_history("AT0001").unwrap_err();
        assert!(err.is_adapter_failure());
        assert_eq!(contract.ledger().open_cursors(), 0);
    }

    #[test]
    fn test_history_in_write_order() {
        let contract = contract();
        create(&contract, "AT0001");
        contract.register_air_taxi("AT0001", "9V1BC", "Owner").unwrap();
        contract.approve_flight_plan("AT0001").unwrap();

        let history = contract.read_air_taxi_history("AT0001").unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|h| h.key == "AT0001"));

        let first = history[0].record.record().unwrap();
        assert!(first.tail_number.is_none());
        let second = history[1].record.record().unwrap();
        assert_eq!(second.tail_number.as_deref(), Some("9V1BC"));
        assert!(second.flight_plan_approved.is_none());
        let third = history[2].record.record().unwrap();
        assert_eq!(third.flight_plan_approved, Some(true));
        assert_eq!(contract.ledger().open_cursors(), 0);
    }

    #[test]
    fn test_history_skips_deletions() {
        let contract = contract();
        create(&contract, "AT0001");
        contract.ledger().delete_state("AT0001").unwrap();
        create(&contract, "AT0001");

        let history = contract.read_air_taxi_history("AT0001").unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_raw_versions() {
        let contract = contract();
        contract.ledger().put_state("AT0001", b"legacy text").unwrap();
        contract.ledger().put_state("AT0001", b"{}").unwrap();

        let history = contract.read_air_taxi_history("AT0001").unwrap();
        assert!(history[0].record.is_raw());
        assert!(!history[1].record.is_raw());
    }

    #[test]
    fn test_request_taxi_returns_allocated() {
        let contract = contract();
        contract.init_ledger().unwrap();

        let taxi = contract.request_taxi().unwrap();
        assert_eq!(taxi.manufacturer.as_deref(), Some("IJD"));
    }

    #[test]
    fn test_request_taxi_missing() {
        let contract = contract();
        assert!(contract.request_taxi().unwrap_err().is_not_found());
    }

    #[test]
    fn test_init_ledger_and_register() {
        let contract = contract();
        contract.init_ledger().unwrap();
        contract.init_register_air_taxi().unwrap();

        assert_eq!(contract.query_all_air_taxi().unwrap().len(), SAMPLE_FLEET.len());
        let taxi = contract.read_air_taxi("AT0001").unwrap();
        assert_eq!(taxi.tail_number.as_deref(), Some("9V1BC"));
        assert_eq!(taxi.state(), LifecycleState::Registered);

        assert!(contract.init_ledger().unwrap_err().is_already_exists());
    }
}
