//! Core types for dashboard telemetry and presentation state.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identifier of a physical sensor in the telemetry store.
///
/// Aliases are stable for the lifetime of the process and are never empty;
/// the only way to build one is through [`SensorAlias::new`], which rejects
/// blank input.
///
/// # Examples
///
/// ```
/// use homedash_types::SensorAlias;
///
/// let alias = SensorAlias::new("workRoomTempSensor").unwrap();
/// assert_eq!(alias.as_str(), "workRoomTempSensor");
/// assert!(SensorAlias::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct SensorAlias(String);

/// Returned when an empty or whitespace-only sensor alias is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sensor alias cannot be empty")]
pub struct EmptyAliasError;

impl SensorAlias {
    /// Create an alias, rejecting empty or whitespace-only strings.
    pub fn new(alias: impl Into<String>) -> Result<Self, EmptyAliasError> {
        let alias = alias.into();
        if alias.trim().is_empty() {
            return Err(EmptyAliasError);
        }
        Ok(Self(alias))
    }

    /// Borrow the alias text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SensorAlias {
    type Error = EmptyAliasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SensorAlias> for String {
    fn from(alias: SensorAlias) -> Self {
        alias.0
    }
}

impl fmt::Display for SensorAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a dashboard slot displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SlotKind {
    /// Temperature and humidity of a room.
    Climate,
    /// A single level value, such as plant soil moisture.
    Level,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Climate => write!(f, "climate"),
            SlotKind::Level => write!(f, "level"),
        }
    }
}

/// A temperature and humidity reading.
///
/// `observed_at` is always a valid instant, already expressed in the
/// display offset. A reading whose timestamp could not be parsed never
/// becomes a `Measurement`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Temperature in degrees Celsius.
    pub temperature_celsius: f64,
    /// Relative humidity in percent.
    pub humidity_percent: f64,
    /// When the sensor took the reading.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub observed_at: OffsetDateTime,
}

/// A single-value reading (moisture, illumination).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelReading {
    /// The raw value as reported by the sensor.
    pub value: f64,
    /// When the sensor took the reading.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub observed_at: OffsetDateTime,
}

/// Discretized level tier, always in `0..=4`.
///
/// Used to pick one of five icons for a level card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct Bucket(u8);

impl Bucket {
    /// Highest bucket index.
    pub const MAX: u8 = 4;

    /// Build a bucket from a step-function index.
    ///
    /// Returns `None` if the index is out of range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .filter(|i| *i <= Self::MAX)
            .map(Self)
    }

    /// The zero-based index.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// The one-based tier, matching icon names `level1` .. `level5`.
    #[must_use]
    pub fn tier(self) -> u8 {
        self.0 + 1
    }
}

impl TryFrom<u8> for Bucket {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value as usize)
            .ok_or_else(|| format!("bucket {} out of range 0..={}", value, Self::MAX))
    }
}

impl From<Bucket> for u8 {
    fn from(bucket: Bucket) -> Self {
        bucket.0
    }
}

/// Display theme chosen from ambient illumination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ThemeState {
    /// Bright surroundings.
    #[default]
    Light,
    /// Dim surroundings.
    Dark,
}

impl fmt::Display for ThemeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeState::Light => write!(f, "light"),
            ThemeState::Dark => write!(f, "dark"),
        }
    }
}

/// A normalized reading together with its derived classification.
///
/// This is the single "metric card" model shared by every slot kind.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "lowercase")
)]
pub enum Card {
    /// Room climate with its humidity alert flag.
    Climate {
        measurement: Measurement,
        humidity_alert: bool,
    },
    /// Level reading with its bucket.
    Level { reading: LevelReading, bucket: Bucket },
}

impl Card {
    /// When the underlying reading was observed.
    #[must_use]
    pub fn observed_at(&self) -> OffsetDateTime {
        match self {
            Card::Climate { measurement, .. } => measurement.observed_at,
            Card::Level { reading, .. } => reading.observed_at,
        }
    }
}

/// How current a slot's card is.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "status", content = "card", rename_all = "lowercase")
)]
pub enum SlotStatus {
    /// Fetched and normalized during this cycle.
    Fresh(Card),
    /// This cycle failed; the card is carried over from an earlier cycle.
    Stale(Card),
    /// This cycle failed and there has never been a good reading.
    Absent,
}

impl SlotStatus {
    /// The card to display, if any.
    #[must_use]
    pub fn card(&self) -> Option<&Card> {
        match self {
            SlotStatus::Fresh(card) | SlotStatus::Stale(card) => Some(card),
            SlotStatus::Absent => None,
        }
    }

    /// Whether this slot was refreshed in the current cycle.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, SlotStatus::Fresh(_))
    }

    /// Degrade to the value a failed cycle should show.
    ///
    /// Fresh and stale cards become stale; absent stays absent.
    #[must_use]
    pub fn into_stale(self) -> Self {
        match self {
            SlotStatus::Fresh(card) | SlotStatus::Stale(card) => SlotStatus::Stale(card),
            SlotStatus::Absent => SlotStatus::Absent,
        }
    }
}

/// One dashboard slot within a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotEntry {
    /// Stable slot identifier (e.g. `workRoom`).
    pub id: String,
    /// Heading shown above the card.
    pub title: String,
    /// Optional picture shown next to a level card.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub icon: Option<String>,
    /// Current content of the slot.
    pub status: SlotStatus,
}

/// Immutable result of one refresh cycle.
///
/// Snapshots are never edited after construction. Each cycle builds a new one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PresentationSnapshot {
    /// When the cycle finished.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub fetched_at: OffsetDateTime,
    /// At least one slot failed during this cycle.
    pub partial: bool,
    /// Slots in configuration order.
    pub slots: Vec<SlotEntry>,
}

impl PresentationSnapshot {
    /// Look up a slot by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SlotEntry> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    /// Number of slots refreshed in this cycle.
    #[must_use]
    pub fn fresh_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.status.is_fresh()).count()
    }
}

/// Format an instant as `HH:MM:SS DD/MM/YYYY` in its own offset.
///
/// # Examples
///
/// ```
/// use homedash_types::format_observed;
/// use time::macros::datetime;
///
/// assert_eq!(format_observed(datetime!(2024-03-01 11:00:00 +01:00)), "11:00:00 01/03/2024");
/// ```
#[must_use]
pub fn format_observed(at: OffsetDateTime) -> String {
    format!(
        "{:02}:{:02}:{:02} {:02}/{:02}/{:04}",
        at.hour(),
        at.minute(),
        at.second(),
        at.day(),
        u8::from(at.month()),
        at.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn climate_card() -> Card {
        Card::Climate {
            measurement: Measurement {
                temperature_celsius: 21.5,
                humidity_percent: 45.0,
                observed_at: datetime!(2024-03-01 11:00:00 +01:00),
            },
            humidity_alert: false,
        }
    }

    #[test]
    fn test_sensor_alias_rejects_blank() {
        assert_eq!(SensorAlias::new(""), Err(EmptyAliasError));
        assert_eq!(SensorAlias::new(" \t"), Err(EmptyAliasError));
        assert!(SensorAlias::new("bedRoomTempSensor").is_ok());
    }

    #[test]
    fn test_sensor_alias_display() {
        let alias = SensorAlias::new("flowerOlivaSensor").unwrap();
        assert_eq!(alias.to_string(), "flowerOlivaSensor");
    }

    #[test]
    fn test_bucket_range() {
        assert_eq!(Bucket::from_index(0).map(Bucket::index), Some(0));
        assert_eq!(Bucket::from_index(4).map(Bucket::tier), Some(5));
        assert!(Bucket::from_index(5).is_none());
    }

    #[test]
    fn test_theme_default_is_light() {
        assert_eq!(ThemeState::default(), ThemeState::Light);
        assert_eq!(ThemeState::Dark.to_string(), "dark");
    }

    #[test]
    fn test_slot_status_into_stale() {
        let fresh = SlotStatus::Fresh(climate_card());
        let stale = fresh.into_stale();
        assert!(matches!(stale, SlotStatus::Stale(_)));
        assert_eq!(stale.clone().into_stale(), stale);
        assert_eq!(SlotStatus::Absent.into_stale(), SlotStatus::Absent);
    }

    #[test]
    fn test_card_accessors() {
        let card = climate_card();
        assert_eq!(card.observed_at(), datetime!(2024-03-01 10:00:00 UTC));
    }

    #[test]
    fn test_format_observed_pads_fields() {
        let at = datetime!(2024-01-05 03:04:05 +01:00);
        assert_eq!(format_observed(at), "03:04:05 05/01/2024");
    }

    #[test]
    fn test_snapshot_lookup_and_counts() {
        let snapshot = PresentationSnapshot {
            fetched_at: datetime!(2024-03-01 10:05:00 UTC),
            partial: true,
            slots: vec![
                SlotEntry {
                    id: "workRoom".to_string(),
                    title: "Office".to_string(),
                    icon: None,
                    status: SlotStatus::Fresh(climate_card()),
                },
                SlotEntry {
                    id: "bedRoom".to_string(),
                    title: "Bedroom".to_string(),
                    icon: None,
                    status: SlotStatus::Absent,
                },
            ],
        };

        assert_eq!(snapshot.fresh_count(), 1);
        assert!(snapshot.get("bedRoom").is_some());
        assert!(snapshot.get("kitchen").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_snapshot_serialization() {
        let entry = SlotEntry {
            id: "workRoom".to_string(),
            title: "Office".to_string(),
            icon: None,
            status: SlotStatus::Stale(climate_card()),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"status\":\"stale\""));
        assert!(json.contains("\"kind\":\"climate\""));
        assert!(json.contains("2024-03-01T11:00:00+01:00"));
        assert!(!json.contains("icon"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sensor_alias_deserialize_rejects_empty() {
        let result: Result<SensorAlias, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
        let alias: SensorAlias = serde_json::from_str("\"livRoomTempSensor\"").unwrap();
        assert_eq!(alias.as_str(), "livRoomTempSensor");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_bucket_deserialize_range() {
        let bucket: Bucket = serde_json::from_str("3").unwrap();
        assert_eq!(bucket.index(), 3);
        assert!(serde_json::from_str::<Bucket>("7").is_err());
    }
}
