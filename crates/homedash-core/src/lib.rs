//! Telemetry refresh and presentation-state engine for the home dashboard.
//!
//! This crate polls a time-series telemetry store, turns the loosely-typed
//! rows it returns into typed readings, derives what a dashboard should
//! show, and hands the result to a rendering layer.
//!
//! # Features
//!
//! - **Query client**: [`TelemetryStore`] trait with an InfluxDB 1.x HTTP
//!   implementation (feature `influx`, on by default)
//! - **Normalization**: timestamp parsing and display offset handling
//! - **Derivation rules**: humidity alerts, level buckets, theme selection
//! - **Refresh orchestration**: concurrent per-slot fetches with timeouts,
//!   retries and stale-or-absent degradation
//! - **Theme control**: illumination-driven light/dark switching with
//!   change-only notification
//! - **Testing**: [`MockStore`] with failure injection and latency simulation
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use homedash_core::influx::InfluxClient;
//! use homedash_core::{
//!     ChannelRenderer, Engine, EngineConfig, FieldSet, IlluminationSource, SlotConfig,
//! };
//! use homedash_types::SensorAlias;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InfluxClient::new(
//!         "http://automation.lan:8086",
//!         "garden",
//!         std::time::Duration::from_secs(10),
//!     )?;
//!
//!     let slots = vec![
//!         SlotConfig::climate("workRoom", "Study", SensorAlias::new("workRoomTempSensor")?),
//!         SlotConfig::level("olive", "Olive", SensorAlias::new("flowerOlivaSensor")?),
//!     ];
//!     let illumination = IlluminationSource {
//!         alias: SensorAlias::new("livRoomLightSensor")?,
//!         fields: FieldSet::level("Telemetry", "Illumination"),
//!     };
//!
//!     let renderer = Arc::new(ChannelRenderer::default());
//!     let mut events = renderer.subscribe();
//!
//!     let handle = Engine::new(Arc::new(store), EngineConfig::new(slots, illumination), renderer)
//!         .start();
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod events;
#[cfg(feature = "influx")]
pub mod influx;
pub mod mock;
pub mod normalize;
pub mod query;
pub mod refresh;
pub mod retry;
pub mod theme;
pub mod thresholds;
pub mod view;

// Re-export types crate
pub use homedash_types;

// Core exports
pub use engine::{Engine, EngineConfig, EngineHandle};
pub use error::{CycleError, QueryError, QueryResult};
pub use events::{ChannelRenderer, DashboardEvent, EventReceiver, EventSender, Renderer};
pub use mock::MockStore;
pub use normalize::{DisplayOffset, Normalizer, parse_timestamp};
pub use query::{FieldSet, RawRow, RawValue, TelemetryStore};
pub use refresh::{CyclePhase, RefreshOptions, RefreshOrchestrator, SlotConfig, SlotHealth};
pub use retry::{RetryConfig, with_retry};
pub use theme::{IlluminationSource, ThemeController};
pub use thresholds::Thresholds;
pub use view::{CardView, card_view};

#[cfg(feature = "influx")]
pub use influx::InfluxClient;
