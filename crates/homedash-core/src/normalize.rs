//! Conversion of raw store rows into typed readings.
//!
//! Rows are read positionally: column 0 is the timestamp and the remaining
//! columns follow the field order of the [`FieldSet`](crate::FieldSet) that
//! produced them. For climate rows that is humidity, then temperature.
//!
//! Timestamps are ISO-8601 strings. A trailing `Z` is rewritten to an
//! explicit `+00:00` before parsing, and the instant is then re-expressed
//! in a fixed display offset (UTC+1 by default, no daylight saving).

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::offset;
use time::{OffsetDateTime, UtcOffset};

use homedash_types::{LevelReading, Measurement, ParseError, ParseResult};

use crate::query::{RawRow, RawValue};

/// Column index of the timestamp.
pub const TIME_INDEX: usize = 0;
/// Column index of humidity in a climate row.
pub const HUMIDITY_INDEX: usize = 1;
/// Column index of temperature in a climate row.
pub const TEMPERATURE_INDEX: usize = 2;
/// Column index of the value in a level row.
pub const LEVEL_INDEX: usize = 1;

/// Fixed offset used to present observation times.
///
/// This is a configuration constant, never derived from the host locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct DisplayOffset(UtcOffset);

impl DisplayOffset {
    /// UTC+1.
    pub const DEFAULT: Self = Self(offset!(+1));

    /// Build an offset from whole minutes east of UTC.
    pub fn from_minutes(minutes: i32) -> Result<Self, time::error::ComponentRange> {
        UtcOffset::from_whole_seconds(minutes.saturating_mul(60)).map(Self)
    }

    /// Offset in whole minutes east of UTC.
    pub fn minutes(self) -> i32 {
        self.0.whole_seconds() / 60
    }

    /// The underlying offset.
    pub fn offset(self) -> UtcOffset {
        self.0
    }
}

impl Default for DisplayOffset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i32> for DisplayOffset {
    type Error = time::error::ComponentRange;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

impl From<DisplayOffset> for i32 {
    fn from(offset: DisplayOffset) -> Self {
        offset.minutes()
    }
}

/// Parse a store timestamp and move it into the display offset.
///
/// Accepts RFC 3339 text with `Z` or a numeric offset. Text without any
/// offset is taken as UTC, which is what the store records.
///
/// # Examples
///
/// ```
/// use homedash_core::normalize::{DisplayOffset, parse_timestamp};
/// use homedash_types::format_observed;
///
/// let at = parse_timestamp("2024-03-01T10:00:00Z", DisplayOffset::DEFAULT).unwrap();
/// assert_eq!(format_observed(at), "11:00:00 01/03/2024");
/// ```
pub fn parse_timestamp(raw: &str, display: DisplayOffset) -> ParseResult<OffsetDateTime> {
    let trimmed = raw.trim();
    let text: Cow<'_, str> = match trimmed.strip_suffix('Z') {
        Some(stripped) => Cow::Owned(format!("{}+00:00", stripped)),
        None => Cow::Borrowed(trimmed),
    };

    OffsetDateTime::parse(&text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(&format!("{}+00:00", text), &Rfc3339))
        .map(|at| at.to_offset(display.offset()))
        .map_err(|_| ParseError::invalid_timestamp(raw))
}

/// Converts raw rows into [`Measurement`] and [`LevelReading`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    display: DisplayOffset,
}

impl Normalizer {
    /// Create a normalizer presenting times in the given offset.
    pub fn new(display: DisplayOffset) -> Self {
        Self { display }
    }

    /// The display offset in use.
    pub fn display_offset(&self) -> DisplayOffset {
        self.display
    }

    /// Normalize a climate row (`time, humidity, temperature`).
    ///
    /// Values are not checked for physical plausibility.
    pub fn normalize_measurement(&self, row: &RawRow) -> ParseResult<Measurement> {
        let observed_at = self.timestamp(row)?;
        let humidity_percent = number(row, HUMIDITY_INDEX, "Humidity")?;
        let temperature_celsius = number(row, TEMPERATURE_INDEX, "Temperature")?;

        Ok(Measurement {
            temperature_celsius,
            humidity_percent,
            observed_at,
        })
    }

    /// Normalize a level row (`time, value`).
    pub fn normalize_level(&self, row: &RawRow) -> ParseResult<LevelReading> {
        let observed_at = self.timestamp(row)?;
        let value = number(row, LEVEL_INDEX, "value")?;

        Ok(LevelReading { value, observed_at })
    }

    fn timestamp(&self, row: &RawRow) -> ParseResult<OffsetDateTime> {
        match row.get(TIME_INDEX) {
            Some(RawValue::Text(text)) => parse_timestamp(text, self.display),
            Some(RawValue::Null) | None => {
                Err(ParseError::missing_field(column_name(row, TIME_INDEX, "time"), TIME_INDEX))
            }
            Some(other) => Err(ParseError::invalid_timestamp(other.to_string())),
        }
    }
}

/// Name for a column, preferring what the store reported.
fn column_name<'a>(row: &'a RawRow, index: usize, fallback: &'a str) -> &'a str {
    row.columns
        .get(index)
        .map(String::as_str)
        .unwrap_or(fallback)
}

/// Read a numeric cell. Numeric strings are accepted.
fn number(row: &RawRow, index: usize, fallback: &str) -> ParseResult<f64> {
    let field = column_name(row, index, fallback);
    match row.get(index) {
        Some(RawValue::Number(n)) => Ok(*n),
        Some(RawValue::Text(text)) => {
            text.trim()
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    field: field.to_string(),
                    value: text.clone(),
                })
        }
        Some(RawValue::Bool(b)) => Err(ParseError::InvalidNumber {
            field: field.to_string(),
            value: b.to_string(),
        }),
        Some(RawValue::Null) | None => Err(ParseError::missing_field(field, index)),
    }
}
