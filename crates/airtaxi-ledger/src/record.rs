//! Core record types for the air taxi ledger.
//!
//! An [`AirTaxi`] is stored as one JSON object per key. Every field is
//! optional on the wire and unset fields are omitted, so a freshly created
//! record carries only its manufacture details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered (or registrable) air taxi and its current flight plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirTaxi {
    /// Vehicle manufacturer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Vehicle model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Manufacturer serial number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Date of manufacture, as supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_manufactured: Option<String>,

    /// Registration mark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_number: Option<String>,
    /// Registered operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Date the registration was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_registered: Option<String>,
    /// Authority that approved the registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_authority: Option<String>,

    /// `Some(false)` once deregistered. Absent means active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Date the deregistration was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_deregistered: Option<String>,

    /// Departure vertiport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_port: Option<String>,
    /// Scheduled departure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date_time: Option<String>,
    /// Arrival vertiport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_port: Option<String>,
    /// Scheduled arrival.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_date_time: Option<String>,
    /// Passenger on the filed plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_id: Option<String>,
    /// Pilot on the filed plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pilot_id: Option<String>,

    /// Whether the filed plan has been approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_plan_approved: Option<bool>,
    /// Whether the passenger has boarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embarked: Option<bool>,
    /// Whether the passenger has left the vehicle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disembarked: Option<bool>,

    /// Stored fields this type does not model. Carried through updates
    /// untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AirTaxi {
    /// Create a record carrying only its manufacture details.
    #[must_use]
    pub fn new(
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
        date_manufactured: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: Some(manufacturer.into()),
            model: Some(model.into()),
            serial_number: Some(serial_number.into()),
            date_manufactured: Some(date_manufactured.into()),
            ..Self::default()
        }
    }

    /// Parse a stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a JSON object of the record shape.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Whether the vehicle is still on the register.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    /// Whether a registration has been recorded.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.tail_number.is_some()
    }

    /// Derive the lifecycle state from the record's flags.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if !self.is_active() {
            LifecycleState::Deregistered
        } else if !self.is_registered() {
            LifecycleState::Unregistered
        } else if self.disembarked == Some(true) {
            LifecycleState::Disembarked
        } else if self.embarked == Some(true) {
            LifecycleState::Embarked
        } else if self.flight_plan_approved == Some(true) {
            LifecycleState::PlanApproved
        } else if self.departure_port.is_some() {
            LifecycleState::PlanFiled
        } else {
            LifecycleState::Registered
        }
    }
}

/// Named composite of the record flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created but not yet registered.
    Unregistered,
    /// On the register with no flight plan.
    Registered,
    /// A flight plan has been filed.
    PlanFiled,
    /// The filed plan has been approved.
    PlanApproved,
    /// The passenger is aboard.
    Embarked,
    /// The passenger has left the vehicle.
    Disembarked,
    /// Removed from the register.
    Deregistered,
}

impl LifecycleState {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::PlanFiled => "plan_filed",
            Self::PlanApproved => "plan_approved",
            Self::Embarked => "embarked",
            Self::Disembarked => "disembarked",
            Self::Deregistered => "deregistered",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value as seen by multi-record queries.
///
/// Values that do not parse as a record are passed through as raw text
/// rather than failing the whole query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    /// The value parsed as a record.
    Parsed(AirTaxi),
    /// The value as lossy UTF-8 text.
    Raw(String),
}

impl StoredValue {
    /// Classify raw stored bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match AirTaxi::from_slice(bytes) {
            Ok(record) => Self::Parsed(record),
            Err(_) => Self::Raw(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// The parsed record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&AirTaxi> {
        match self {
            Self::Parsed(record) => Some(record),
            Self::Raw(_) => None,
        }
    }

    /// Whether the value failed to parse.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// One entry of a range query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The ledger key.
    pub key: String,
    /// The value under the key.
    pub record: StoredValue,
}

/// One historical write of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    /// The ledger key.
    pub key: String,
    /// The value written.
    pub record: StoredValue,
    /// Transaction that performed the write.
    pub tx_id: String,
    /// When the write was recorded.
    pub timestamp: DateTime<Utc>,
}
