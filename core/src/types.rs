//! Shared primitive types and request checks used by every service.

use crate::error::{PiggError, PiggResult};
use chrono::{SecondsFormat, Utc};

/// Opaque customer identifier, owned by the customer table.
pub type CustomerId = String;

/// RFC 3339 UTC timestamp as stored in the database.
pub type Timestamp = String;

pub const CUSTOMER_ID: &str = "Customer ID";

/// Current time in the stored timestamp format.
pub fn now() -> Timestamp {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Presence check. `None` and the empty string are both missing.
pub fn require<'a>(field: &'static str, value: Option<&'a str>) -> PiggResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PiggError::MissingField { field }),
    }
}
