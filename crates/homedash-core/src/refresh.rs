//! Periodic refresh of every dashboard slot.
//!
//! The [`RefreshOrchestrator`] drives one cycle per tick:
//!
//! 1. **Fetching**: one spawned task per slot queries the store, with a
//!    per-attempt timeout and the configured retry policy.
//! 2. **Normalizing**: each row becomes a typed reading and then a [`Card`].
//! 3. **Aggregating**: failed slots fall back to their previous card
//!    (marked stale) or to `Absent`.
//! 4. **Published**: the new snapshot replaces the old one and is handed
//!    to the renderer.
//!
//! A slot failure never aborts the cycle and a cycle never stops the loop.
//! If the loop is cancelled mid-cycle, in-flight queries are abandoned and
//! nothing is published.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

use homedash_types::{
    Card, ParseResult, PresentationSnapshot, SensorAlias, SlotEntry, SlotKind, SlotStatus,
};

use crate::error::{CycleError, QueryError, QueryResult, panic_message};
use crate::events::Renderer;
use crate::normalize::Normalizer;
use crate::query::{FieldSet, RawRow, TelemetryStore};
use crate::retry::{RetryConfig, with_retry};
use crate::thresholds::Thresholds;

/// Default time between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Default deadline for a single store call.
pub const DEFAULT_SLOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Measurement holding room climate rows.
pub const CLIMATE_MEASUREMENT: &str = "Telemetry";

/// Measurement holding plant level rows.
pub const LEVEL_MEASUREMENT: &str = "Flowers";

/// Field holding the plant level value.
pub const LEVEL_FIELD: &str = "Moisture";

/// Consecutive failures logged at `warn` before escalating.
const WARN_FAILURES: u32 = 3;

/// One configured dashboard slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConfig {
    /// Stable identifier, unique within the dashboard.
    pub id: String,
    /// Heading shown on the card.
    pub title: String,
    /// Sensor alias queried for this slot.
    pub alias: SensorAlias,
    /// Climate or level.
    pub kind: SlotKind,
    /// Optional picture for the card.
    pub icon: Option<String>,
    /// Measurement and fields to select.
    pub fields: FieldSet,
}

impl SlotConfig {
    /// A room climate slot reading humidity and temperature.
    pub fn climate(id: impl Into<String>, title: impl Into<String>, alias: SensorAlias) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            alias,
            kind: SlotKind::Climate,
            icon: None,
            fields: FieldSet::climate(CLIMATE_MEASUREMENT),
        }
    }

    /// A single-value level slot.
    pub fn level(id: impl Into<String>, title: impl Into<String>, alias: SensorAlias) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            alias,
            kind: SlotKind::Level,
            icon: None,
            fields: FieldSet::level(LEVEL_MEASUREMENT, LEVEL_FIELD),
        }
    }

    /// Set the card picture.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Override the measurement and fields.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }
}

/// Timing and retry settings for the refresh loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOptions {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Deadline for each store call.
    pub slot_timeout: Duration,
    /// Retry policy for connection failures.
    pub retry: RetryConfig,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            slot_timeout: DEFAULT_SLOT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }
}

/// Where the current cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// Slot queries are outstanding.
    Fetching,
    /// Rows are being turned into cards.
    Normalizing,
    /// Fresh and carried-over cards are being combined.
    Aggregating,
    /// The snapshot has been handed out.
    Published,
}

/// Failure bookkeeping for one slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotHealth {
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Most recent failure.
    pub last_error: Option<CycleError>,
    /// When the slot last produced a fresh card.
    pub last_success: Option<OffsetDateTime>,
}

/// Drives the periodic refresh cycle and owns the latest snapshot.
pub struct RefreshOrchestrator {
    store: Arc<dyn TelemetryStore>,
    slots: Vec<SlotConfig>,
    normalizer: Normalizer,
    thresholds: Thresholds,
    options: RefreshOptions,
    renderer: Arc<dyn Renderer>,
    health: Vec<SlotHealth>,
    snapshot_tx: watch::Sender<Option<Arc<PresentationSnapshot>>>,
    phase_tx: watch::Sender<CyclePhase>,
}

impl std::fmt::Debug for RefreshOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("slots", &self.slots.len())
            .field("options", &self.options)
            .field("phase", &*self.phase_tx.borrow())
            .finish()
    }
}

impl RefreshOrchestrator {
    /// Create an orchestrator for a fixed set of slots.
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        slots: Vec<SlotConfig>,
        normalizer: Normalizer,
        thresholds: Thresholds,
        options: RefreshOptions,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let health = vec![SlotHealth::default(); slots.len()];
        Self {
            store,
            slots,
            normalizer,
            thresholds,
            options,
            renderer,
            health,
            snapshot_tx: watch::Sender::new(None),
            phase_tx: watch::Sender::new(CyclePhase::Idle),
        }
    }

    /// Subscribe to published snapshots.
    ///
    /// Holds `None` until the first cycle completes.
    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<PresentationSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to cycle phase changes.
    pub fn phases(&self) -> watch::Receiver<CyclePhase> {
        self.phase_tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<PresentationSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Per-slot health, in slot order.
    pub fn health(&self) -> &[SlotHealth] {
        &self.health
    }

    /// The configured slots.
    pub fn slots(&self) -> &[SlotConfig] {
        &self.slots
    }

    /// Run cycles on the configured interval until `cancel` fires.
    ///
    /// The first cycle starts immediately. Overrunning cycles push the
    /// next tick back instead of queuing catch-up ticks. A cycle that
    /// panics (for example inside the renderer) is logged and the loop
    /// carries on with the next tick.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Starting refresh loop for {} slot(s) (interval: {}s)",
            self.slots.len(),
            self.options.interval.as_secs()
        );

        let mut ticker = interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown during refresh cycle, abandoning in-flight queries");
                    break;
                }
                outcome = AssertUnwindSafe(self.run_cycle()).catch_unwind() => {
                    if let Err(payload) = outcome {
                        error!("Refresh cycle panicked: {}", panic_message(payload.as_ref()));
                        self.set_phase(CyclePhase::Idle);
                    }
                }
            }
        }

        self.phase_tx.send_replace(CyclePhase::Idle);
        info!("Refresh loop stopped");
    }

    /// Run one complete cycle and publish its snapshot.
    pub async fn run_cycle(&mut self) -> Arc<PresentationSnapshot> {
        debug!("Starting refresh cycle for {} slot(s)", self.slots.len());

        self.set_phase(CyclePhase::Fetching);
        let rows = self.fetch_all().await;

        self.set_phase(CyclePhase::Normalizing);
        let cards: Vec<Result<Card, CycleError>> = self
            .slots
            .iter()
            .zip(rows)
            .map(|(slot, row)| {
                let row = row?;
                self.derive_card(slot, &row)
                    .map_err(|e| CycleError::parse(&slot.id, e))
            })
            .collect();

        self.set_phase(CyclePhase::Aggregating);
        let snapshot = Arc::new(self.aggregate(cards));
        log_summary(&snapshot);

        self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
        self.set_phase(CyclePhase::Published);
        self.renderer.on_snapshot(Arc::clone(&snapshot));
        self.set_phase(CyclePhase::Idle);

        snapshot
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.phase_tx.send_replace(phase);
    }

    /// Fan out one task per slot and wait for all of them.
    ///
    /// Results come back in slot order. Dropping the returned future aborts
    /// every outstanding task.
    async fn fetch_all(&self) -> Vec<Result<RawRow, CycleError>> {
        let handles: Vec<_> = self
            .slots
            .iter()
            .map(|slot| {
                AbortOnDropHandle::new(tokio::spawn(fetch_slot(
                    Arc::clone(&self.store),
                    slot.alias.clone(),
                    slot.fields.clone(),
                    self.options.retry.clone(),
                    self.options.slot_timeout,
                )))
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(&self.slots)
            .map(|(joined, slot)| match joined {
                Ok(result) => result.map_err(|e| CycleError::query(&slot.id, e)),
                Err(e) => Err(CycleError::Aborted {
                    slot: slot.id.clone(),
                    reason: e.to_string(),
                }),
            })
            .collect()
    }

    fn derive_card(&self, slot: &SlotConfig, row: &RawRow) -> ParseResult<Card> {
        match slot.kind {
            SlotKind::Climate => self
                .normalizer
                .normalize_measurement(row)
                .map(|m| self.thresholds.climate_card(m)),
            SlotKind::Level => self
                .normalizer
                .normalize_level(row)
                .map(|r| self.thresholds.level_card(r)),
        }
    }

    /// Combine this cycle's results with the previous snapshot.
    fn aggregate(&mut self, cards: Vec<Result<Card, CycleError>>) -> PresentationSnapshot {
        let previous = self.latest();
        let fetched_at =
            OffsetDateTime::now_utc().to_offset(self.normalizer.display_offset().offset());
        let mut partial = false;
        let mut entries = Vec::with_capacity(self.slots.len());

        for (index, result) in cards.into_iter().enumerate() {
            let status = match result {
                Ok(card) => {
                    self.record_success(index, fetched_at);
                    SlotStatus::Fresh(card)
                }
                Err(e) => {
                    partial = true;
                    let fallback = previous
                        .as_ref()
                        .and_then(|snapshot| snapshot.get(e.slot()))
                        .map(|entry| entry.status.clone().into_stale())
                        .unwrap_or(SlotStatus::Absent);
                    self.record_failure(index, e);
                    fallback
                }
            };

            let slot = &self.slots[index];
            entries.push(SlotEntry {
                id: slot.id.clone(),
                title: slot.title.clone(),
                icon: slot.icon.clone(),
                status,
            });
        }

        PresentationSnapshot {
            fetched_at,
            partial,
            slots: entries,
        }
    }

    fn record_success(&mut self, index: usize, at: OffsetDateTime) {
        let health = &mut self.health[index];
        if health.consecutive_failures > WARN_FAILURES {
            info!(
                "Slot '{}' recovered after {} failed cycles",
                self.slots[index].id, health.consecutive_failures
            );
        }
        health.consecutive_failures = 0;
        health.last_success = Some(at);
    }

    fn record_failure(&mut self, index: usize, error: CycleError) {
        let health = &mut self.health[index];
        health.consecutive_failures += 1;
        let failures = health.consecutive_failures;

        if failures <= WARN_FAILURES {
            warn!("{} (failed cycle {})", error, failures);
        } else if failures == WARN_FAILURES + 1 {
            error!(
                "{} after {} cycles, further failures are logged at debug level",
                error, failures
            );
        } else {
            debug!("{} (failed cycle {})", error, failures);
        }

        health.last_error = Some(error);
    }
}

/// Fetch the newest row for one slot with timeout and retries.
async fn fetch_slot(
    store: Arc<dyn TelemetryStore>,
    alias: SensorAlias,
    fields: FieldSet,
    retry: RetryConfig,
    timeout: Duration,
) -> QueryResult<RawRow> {
    let operation = format!("fetch_latest({})", alias);
    let store = &store;
    let alias = &alias;
    let fields = &fields;

    with_retry(&retry, &operation, move || async move {
        match tokio::time::timeout(timeout, store.fetch_latest(alias, fields)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::timeout("fetch_latest", timeout)),
        }
    })
    .await
}

/// Log the values of the cycle in slot order.
fn log_summary(snapshot: &PresentationSnapshot) {
    let mut temperature = Vec::new();
    let mut humidity = Vec::new();
    let mut levels = Vec::new();

    for entry in &snapshot.slots {
        match entry.status.card() {
            Some(Card::Climate { measurement, .. }) => {
                temperature.push(measurement.temperature_celsius);
                humidity.push(measurement.humidity_percent);
            }
            Some(Card::Level { reading, .. }) => levels.push(reading.value),
            None => {}
        }
    }

    info!(
        "Refresh cycle complete: {}/{} slots fresh{}",
        snapshot.fresh_count(),
        snapshot.slots.len(),
        if snapshot.partial { " (partial)" } else { "" }
    );
    info!("Temperature: {:?}", temperature);
    info!("Humidity: {:?}", humidity);
    info!("Levels: {:?}", levels);
}
