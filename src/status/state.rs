use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::holded::types::coerce_number;

/// Normalized order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Cancelled,
}

impl OrderStatus {
    /// Normalizes a raw API status. `2` is the API's cancelled code and maps
    /// to [`OrderStatus::Cancelled`]; anything else unknown is `None`.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let number = coerce_number(raw)?;
        if number.fract() != 0.0 {
            return None;
        }
        Self::from_code(number as i64)
    }

    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Accepted),
            -1 | 2 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Stored code: 0, 1 or -1.
    pub fn code(self) -> i64 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Accepted => 1,
            OrderStatus::Cancelled => -1,
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Accepted)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Accepted => write!(f, "accepted"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

const SEEN_MARKER: &str = "seen";

/// A StatusMap entry: a known status, or the marker for an order observed
/// with a status that could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum StoredStatus {
    Known(OrderStatus),
    Seen,
}

impl TryFrom<Value> for StoredStatus {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::String(s) if s == SEEN_MARKER => Ok(StoredStatus::Seen),
            Value::Number(n) => n
                .as_i64()
                .filter(|code| *code != 2)
                .and_then(OrderStatus::from_code)
                .map(StoredStatus::Known)
                .ok_or_else(|| format!("unknown stored status {value}")),
            _ => Err(format!("unknown stored status {value}")),
        }
    }
}

impl From<StoredStatus> for Value {
    fn from(status: StoredStatus) -> Self {
        match status {
            StoredStatus::Known(status) => Value::from(status.code()),
            StoredStatus::Seen => Value::from(SEEN_MARKER),
        }
    }
}

impl StoredStatus {
    pub fn known(self) -> Option<OrderStatus> {
        match self {
            StoredStatus::Known(status) => Some(status),
            StoredStatus::Seen => None,
        }
    }
}

/// What changed for an order since the previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleEvent {
    New,
    Reopened,
    Cancelled,
    NoChange,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::New => write!(f, "NEW"),
            LifecycleEvent::Reopened => write!(f, "REOPENED"),
            LifecycleEvent::Cancelled => write!(f, "CANCELLED"),
            LifecycleEvent::NoChange => write!(f, "NONE"),
        }
    }
}

/// Classifies an observation from the stored entry (`None` = first seen) and
/// the normalized current status.
///
/// - first seen → `New`, whatever the status
/// - cancelled → pending/accepted → `Reopened`
/// - pending/accepted → cancelled → `Cancelled`
/// - anything else → `NoChange`; pending ↔ accepted is silent
pub fn classify(previous: Option<StoredStatus>, current: Option<OrderStatus>) -> LifecycleEvent {
    let Some(previous) = previous else {
        return LifecycleEvent::New;
    };
    match (previous.known(), current) {
        (Some(OrderStatus::Cancelled), Some(now)) if now.is_open() => LifecycleEvent::Reopened,
        (Some(before), Some(OrderStatus::Cancelled)) if before.is_open() => {
            LifecycleEvent::Cancelled
        }
        _ => LifecycleEvent::NoChange,
    }
}

/// The entry to store after an observation, or `None` to leave it alone.
///
/// A classifiable status is always stored. An unclassifiable one only writes
/// the seen marker on first sight, so it cannot trigger `New` again.
pub fn next_stored(
    previous: Option<StoredStatus>,
    current: Option<OrderStatus>,
) -> Option<StoredStatus> {
    match (previous, current) {
        (_, Some(status)) => Some(StoredStatus::Known(status)),
        (None, None) => Some(StoredStatus::Seen),
        (Some(_), None) => None,
    }
}
