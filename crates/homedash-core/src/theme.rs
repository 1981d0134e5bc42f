//! Illumination-driven theme selection.
//!
//! The [`ThemeController`] owns the process-wide [`ThemeState`]. It polls a
//! single illumination sensor on its own cadence and notifies the renderer
//! only when the decided theme differs from the current one. Query or
//! parse failures leave the state untouched.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use homedash_types::{SensorAlias, ThemeState};

use crate::error::{QueryError, panic_message};
use crate::events::Renderer;
use crate::normalize::Normalizer;
use crate::query::{FieldSet, TelemetryStore};
use crate::thresholds::Thresholds;

/// Default time between illumination checks.
pub const DEFAULT_THEME_INTERVAL: Duration = Duration::from_secs(60);

/// Where to read illumination from.
#[derive(Debug, Clone, PartialEq)]
pub struct IlluminationSource {
    /// Sensor reporting illumination.
    pub alias: SensorAlias,
    /// Measurement and the single field holding the illumination value.
    pub fields: FieldSet,
}

/// Owns the theme state and decides transitions.
pub struct ThemeController {
    store: Arc<dyn TelemetryStore>,
    source: IlluminationSource,
    normalizer: Normalizer,
    thresholds: Thresholds,
    interval: Duration,
    timeout: Duration,
    renderer: Arc<dyn Renderer>,
    state_tx: watch::Sender<ThemeState>,
}

impl std::fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeController")
            .field("source", &self.source)
            .field("interval", &self.interval)
            .field("state", &*self.state_tx.borrow())
            .finish()
    }
}

impl ThemeController {
    /// Create a controller starting in [`ThemeState::Light`].
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        source: IlluminationSource,
        normalizer: Normalizer,
        thresholds: Thresholds,
        interval: Duration,
        timeout: Duration,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            store,
            source,
            normalizer,
            thresholds,
            interval,
            timeout,
            renderer,
            state_tx: watch::Sender::new(ThemeState::default()),
        }
    }

    /// The current theme.
    pub fn state(&self) -> ThemeState {
        *self.state_tx.borrow()
    }

    /// Subscribe to theme transitions.
    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.state_tx.subscribe()
    }

    /// Apply the theme rule to an illumination value.
    ///
    /// Returns the new theme if it changed, `None` otherwise. The renderer
    /// is notified only on a change.
    pub fn observe(&self, illumination: f64) -> Option<ThemeState> {
        let next = self.thresholds.theme_for(illumination);
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if !changed {
            debug!("Illumination {} keeps theme {}", illumination, next);
            return None;
        }

        info!("Theme changed to {} (illumination {})", next, illumination);
        self.renderer.on_theme_changed(next);
        Some(next)
    }

    /// Query illumination once and apply it.
    pub async fn check(&self) -> Option<ThemeState> {
        let fetched = tokio::time::timeout(
            self.timeout,
            self.store.fetch_latest(&self.source.alias, &self.source.fields),
        )
        .await
        .unwrap_or_else(|_| Err(QueryError::timeout("fetch_latest", self.timeout)));

        let row = match fetched {
            Ok(row) => row,
            Err(e) => {
                warn!("Theme check for '{}' failed: {}", self.source.alias, e);
                return None;
            }
        };

        match self.normalizer.normalize_level(&row) {
            Ok(reading) => self.observe(reading.value),
            Err(e) => {
                warn!("Theme check for '{}' failed: {}", self.source.alias, e);
                None
            }
        }
    }

    /// Check on the configured interval until `cancel` fires.
    ///
    /// A check that panics is logged and the next tick runs as usual.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Starting theme controller for '{}' (interval: {}s)",
            self.source.alias,
            self.interval.as_secs()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = AssertUnwindSafe(self.check()).catch_unwind() => {
                    if let Err(payload) = outcome {
                        error!("Theme check panicked: {}", panic_message(payload.as_ref()));
                    }
                }
            }
        }

        info!("Theme controller stopped");
    }
}
