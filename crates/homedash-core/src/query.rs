//! Query client abstraction for the telemetry store.
//!
//! This module provides the [`TelemetryStore`] trait that abstracts over the
//! real time-series database and the mock store used in tests, plus the
//! loosely-typed row it returns.

use core::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use homedash_types::SensorAlias;

use crate::error::QueryResult;

/// Name of the timestamp column, always selected first.
pub const TIME_COLUMN: &str = "time";

/// The measurement class and ordered field list for one query.
///
/// Rows come back with the timestamp first and then one column per field,
/// in exactly the order listed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    /// Measurement (series) name, e.g. `Telemetry`.
    pub measurement: String,
    /// Field names in select order.
    pub fields: Vec<String>,
}

impl FieldSet {
    /// Create a field set.
    pub fn new<I, S>(measurement: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            measurement: measurement.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field set for room climate: humidity then temperature.
    pub fn climate(measurement: impl Into<String>) -> Self {
        Self::new(measurement, ["Humidity", "Temperature"])
    }

    /// Field set for a single level value.
    pub fn level(measurement: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(measurement, [field.into()])
    }

    /// All columns the row will carry, timestamp included.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(TIME_COLUMN).chain(self.fields.iter().map(String::as_str))
    }
}

/// A single cell as the store typed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// A string, which is how timestamps arrive.
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// The newest row for one alias, as returned by the store.
///
/// Column 0 is the timestamp; the rest follow the requested field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    /// Column names reported by the store.
    pub columns: Vec<String>,
    /// Cell values, positionally matching `columns`.
    pub values: Vec<RawValue>,
}

impl RawRow {
    /// Create a row.
    pub fn new(columns: Vec<String>, values: Vec<RawValue>) -> Self {
        Self { columns, values }
    }

    /// Build a row for a field set from its values, in select order.
    pub fn for_fields(fields: &FieldSet, values: Vec<RawValue>) -> Self {
        Self {
            columns: fields.columns().map(str::to_string).collect(),
            values,
        }
    }

    /// Cell at a column index.
    pub fn get(&self, index: usize) -> Option<&RawValue> {
        self.values.get(index)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read access to a time-series telemetry store.
///
/// Implementations must tolerate concurrent outstanding queries from the
/// same process; the refresh and theme schedules share one instance.
///
/// # Example
///
/// ```ignore
/// use homedash_core::{FieldSet, TelemetryStore};
///
/// async fn humidity<S: TelemetryStore + ?Sized>(store: &S, alias: &SensorAlias) {
///     let row = store.fetch_latest(alias, &FieldSet::climate("Telemetry")).await?;
///     println!("{:?}", row.get(1));
/// }
/// ```
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Fetch the newest row for `alias`, ordered by time descending, limit one.
    ///
    /// Implementations do not retry and do not cache.
    async fn fetch_latest(&self, alias: &SensorAlias, fields: &FieldSet) -> QueryResult<RawRow>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_climate_field_order() {
        let fields = FieldSet::climate("Telemetry");
        let columns: Vec<_> = fields.columns().collect();
        assert_eq!(columns, vec!["time", "Humidity", "Temperature"]);
    }

    #[test]
    fn test_level_field_set() {
        let fields = FieldSet::level("Flowers", "Moisture");
        assert_eq!(fields.measurement, "Flowers");
        assert_eq!(fields.fields, vec!["Moisture".to_string()]);
    }

    #[test]
    fn test_raw_value_deserialize() {
        let values: Vec<RawValue> =
            serde_json::from_str(r#"["2024-03-01T10:00:00Z", 45.5, null, 12, true]"#).unwrap();
        assert_eq!(values[0], RawValue::Text("2024-03-01T10:00:00Z".into()));
        assert_eq!(values[1], RawValue::Number(45.5));
        assert_eq!(values[2], RawValue::Null);
        assert_eq!(values[3], RawValue::Number(12.0));
        assert_eq!(values[4], RawValue::Bool(true));
    }

    #[test]
    fn test_raw_row_for_fields() {
        let fields = FieldSet::level("Flowers", "Moisture");
        let row = RawRow::for_fields(&fields, vec!["2024-03-01T10:00:00Z".into(), 14.0.into()]);
        assert_eq!(row.columns, vec!["time", "Moisture"]);
        assert_eq!(row.len(), 2);
        assert!(!row.is_empty());
        assert!(row.get(2).is_none());
    }
}
