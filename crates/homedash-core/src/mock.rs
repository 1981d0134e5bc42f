//! Mock telemetry store for testing.
//!
//! This module provides an in-memory store that can be used for unit and
//! integration testing without a running time-series database.
//!
//! The [`MockStore`] implements the [`TelemetryStore`] trait, so it can be
//! handed to the engine wherever the real client goes.
//!
//! # Features
//!
//! - **Per-alias rows**: Each alias answers with its own newest row
//! - **Failure injection**: Make a single alias fail permanently or transiently
//! - **Latency simulation**: Delay answers for one alias to model a slow sensor

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use homedash_types::SensorAlias;

use crate::error::{QueryError, QueryResult};
use crate::query::{FieldSet, RawRow, RawValue, TelemetryStore};

#[derive(Debug, Default, Clone)]
struct AliasState {
    values: Option<Vec<RawValue>>,
    failure: Option<QueryError>,
    remaining_failures: u32,
    latency: Duration,
    queries: u32,
}

/// An in-memory telemetry store for testing.
///
/// Aliases with no configured row answer with [`QueryError::NotFound`].
///
/// # Example
///
/// ```
/// use homedash_core::{FieldSet, MockStore, TelemetryStore};
/// use homedash_types::SensorAlias;
///
/// #[tokio::main]
/// async fn main() {
///     let store = MockStore::new();
///     store.set_climate("workRoomTempSensor", "2024-03-01T10:00:00Z", 45.0, 21.5).await;
///
///     let alias = SensorAlias::new("workRoomTempSensor").unwrap();
///     let row = store.fetch_latest(&alias, &FieldSet::climate("Telemetry")).await.unwrap();
///     assert_eq!(row.len(), 3);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    aliases: RwLock<HashMap<String, AliasState>>,
    query_count: AtomicU32,
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Test control methods ---

    /// Set the cell values returned for an alias, timestamp first.
    pub async fn set_values(&self, alias: &str, values: Vec<RawValue>) {
        self.aliases
            .write()
            .await
            .entry(alias.to_string())
            .or_default()
            .values = Some(values);
    }

    /// Set a climate row: humidity then temperature.
    pub async fn set_climate(&self, alias: &str, time: &str, humidity: f64, temperature: f64) {
        self.set_values(alias, vec![time.into(), humidity.into(), temperature.into()])
            .await;
    }

    /// Set a single-value level row.
    pub async fn set_level(&self, alias: &str, time: &str, value: f64) {
        self.set_values(alias, vec![time.into(), value.into()]).await;
    }

    /// Forget the row for an alias so it answers with `NotFound`.
    pub async fn clear(&self, alias: &str) {
        if let Some(state) = self.aliases.write().await.get_mut(alias) {
            state.values = None;
        }
    }

    /// Make every query for an alias fail with `error`, or stop failing with `None`.
    pub async fn set_failure(&self, alias: &str, error: Option<QueryError>) {
        self.aliases
            .write()
            .await
            .entry(alias.to_string())
            .or_default()
            .failure = error;
    }

    /// Configure transient failures.
    ///
    /// The next `count` queries for `alias` fail with a connection error,
    /// then the configured row is returned again.
    pub async fn set_transient_failures(&self, alias: &str, count: u32) {
        self.aliases
            .write()
            .await
            .entry(alias.to_string())
            .or_default()
            .remaining_failures = count;
    }

    /// Set simulated latency for an alias.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub async fn set_latency(&self, alias: &str, latency: Duration) {
        self.aliases
            .write()
            .await
            .entry(alias.to_string())
            .or_default()
            .latency = latency;
    }

    /// Get the number of queries answered across all aliases.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Get the number of queries made for one alias.
    pub async fn queries_for(&self, alias: &str) -> u32 {
        self.aliases
            .read()
            .await
            .get(alias)
            .map(|state| state.queries)
            .unwrap_or(0)
    }
}

#[async_trait]
impl TelemetryStore for MockStore {
    async fn fetch_latest(&self, alias: &SensorAlias, fields: &FieldSet) -> QueryResult<RawRow> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        // Snapshot the state so the lock is not held across the simulated delay.
        let state = {
            let mut aliases = self.aliases.write().await;
            let state = aliases.entry(alias.as_str().to_string()).or_default();
            state.queries += 1;
            let snapshot = state.clone();
            state.remaining_failures = state.remaining_failures.saturating_sub(1);
            snapshot
        };

        if !state.latency.is_zero() {
            tokio::time::sleep(state.latency).await;
        }

        if state.remaining_failures > 0 {
            return Err(QueryError::ConnectionError(format!(
                "mock transient failure for '{}'",
                alias
            )));
        }

        if let Some(error) = state.failure {
            return Err(error);
        }

        match state.values {
            Some(values) => Ok(RawRow::for_fields(fields, values)),
            None => Err(QueryError::not_found(alias.as_str())),
        }
    }
}
