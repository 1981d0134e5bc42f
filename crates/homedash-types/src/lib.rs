//! Data model for the home telemetry dashboard engine.
//!
//! This crate holds the types that travel between the refresh engine
//! (homedash-core) and whatever renders the dashboard. It does no I/O.
//!
//! # Features
//!
//! - Typed readings: [`Measurement`] and [`LevelReading`]
//! - Derived presentation values: [`Bucket`], [`ThemeState`], [`Card`]
//! - The per-cycle [`PresentationSnapshot`]
//! - Error types for row normalization
//!
//! # Example
//!
//! ```
//! use homedash_types::{PresentationSnapshot, SlotStatus};
//!
//! fn placeholders(snapshot: &PresentationSnapshot) -> usize {
//!     snapshot
//!         .slots
//!         .iter()
//!         .filter(|slot| matches!(slot.status, SlotStatus::Absent))
//!         .count()
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Bucket, Card, EmptyAliasError, LevelReading, Measurement, PresentationSnapshot, SensorAlias,
    SlotEntry, SlotKind, SlotStatus, ThemeState, format_observed,
};
