//! Wiring for the two schedules.
//!
//! An [`Engine`] owns a [`RefreshOrchestrator`] and a [`ThemeController`]
//! that share one store and one renderer. [`Engine::start`] spawns both
//! loops and returns an [`EngineHandle`] used to observe state and to shut
//! everything down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use homedash_types::{PresentationSnapshot, ThemeState};

use crate::events::Renderer;
use crate::normalize::Normalizer;
use crate::query::TelemetryStore;
use crate::refresh::{CyclePhase, RefreshOptions, RefreshOrchestrator, SlotConfig};
use crate::theme::{DEFAULT_THEME_INTERVAL, IlluminationSource, ThemeController};
use crate::thresholds::Thresholds;

/// How long shutdown waits for the loops to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything needed to build an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Dashboard slots, in display order.
    pub slots: Vec<SlotConfig>,
    /// Refresh cadence, per-call timeout and retry policy.
    pub refresh: RefreshOptions,
    /// Sensor driving the theme.
    pub illumination: IlluminationSource,
    /// Time between illumination checks.
    pub theme_interval: Duration,
    /// Row decoding and display offset.
    pub normalizer: Normalizer,
    /// Alert, bucket and theme cut points.
    pub thresholds: Thresholds,
}

impl EngineConfig {
    /// Config with default timing, thresholds and display offset.
    pub fn new(slots: Vec<SlotConfig>, illumination: IlluminationSource) -> Self {
        Self {
            slots,
            refresh: RefreshOptions::default(),
            illumination,
            theme_interval: DEFAULT_THEME_INTERVAL,
            normalizer: Normalizer::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// The refresh and theme schedules, ready to start.
#[derive(Debug)]
pub struct Engine {
    refresh: RefreshOrchestrator,
    theme: ThemeController,
}

impl Engine {
    /// Build both schedules over a shared store and renderer.
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        config: EngineConfig,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let theme = ThemeController::new(
            Arc::clone(&store),
            config.illumination,
            config.normalizer,
            config.thresholds.clone(),
            config.theme_interval,
            config.refresh.slot_timeout,
            Arc::clone(&renderer),
        );
        let refresh = RefreshOrchestrator::new(
            store,
            config.slots,
            config.normalizer,
            config.thresholds,
            config.refresh,
            renderer,
        );
        Self { refresh, theme }
    }

    /// Mutable access to the orchestrator, e.g. for a single manual cycle.
    pub fn refresh_mut(&mut self) -> &mut RefreshOrchestrator {
        &mut self.refresh
    }

    /// The theme controller.
    pub fn theme(&self) -> &ThemeController {
        &self.theme
    }

    /// Spawn both loops.
    pub fn start(self) -> EngineHandle {
        let cancel = CancellationToken::new();
        let snapshots = self.refresh.snapshots();
        let phases = self.refresh.phases();
        let theme = self.theme.subscribe();

        info!("Starting dashboard engine");
        let tasks = vec![
            tokio::spawn(self.refresh.run(cancel.child_token())),
            tokio::spawn(self.theme.run(cancel.child_token())),
        ];

        EngineHandle {
            cancel,
            snapshots,
            phases,
            theme,
            tasks,
        }
    }
}

/// Handle to a running [`Engine`].
#[derive(Debug)]
pub struct EngineHandle {
    cancel: CancellationToken,
    snapshots: watch::Receiver<Option<Arc<PresentationSnapshot>>>,
    phases: watch::Receiver<CyclePhase>,
    theme: watch::Receiver<ThemeState>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Receiver for published snapshots.
    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<PresentationSnapshot>>> {
        self.snapshots.clone()
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Option<Arc<PresentationSnapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Receiver for the refresh cycle phase.
    pub fn phases(&self) -> watch::Receiver<CyclePhase> {
        self.phases.clone()
    }

    /// Receiver for theme transitions.
    pub fn theme(&self) -> watch::Receiver<ThemeState> {
        self.theme.clone()
    }

    /// A token that is cancelled when the engine shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop both loops and wait for them to finish.
    ///
    /// In-flight queries are abandoned. Loops that do not stop within the
    /// grace period are aborted.
    pub async fn shutdown(self) {
        info!("Shutting down dashboard engine");
        self.cancel.cancel();

        for task in self.tasks {
            let abort = task.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => warn!("Engine task ended abnormally: {}", e),
                Err(_) => {
                    warn!("Engine task did not stop within {:?}, aborting", SHUTDOWN_GRACE);
                    abort.abort();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChannelRenderer;
    use crate::mock::MockStore;
    use crate::query::FieldSet;
    use homedash_types::SensorAlias;

    fn config() -> EngineConfig {
        EngineConfig::new(
            vec![SlotConfig::climate(
                "workRoom",
                "Study",
                SensorAlias::new("workRoomTempSensor").unwrap(),
            )],
            IlluminationSource {
                alias: SensorAlias::new("luxSensor").unwrap(),
                fields: FieldSet::level("Telemetry", "Illumination"),
            },
        )
    }

    #[tokio::test]
    async fn test_engine_publishes_and_shuts_down() {
        let store = Arc::new(MockStore::new());
        store.set_climate("workRoomTempSensor", "2024-03-01T10:00:00Z", 50.0, 21.0).await;
        store.set_level("luxSensor", "2024-03-01T10:00:00Z", 2.0).await;

        let engine = Engine::new(store, config(), Arc::new(ChannelRenderer::default()));
        let handle = engine.start();

        let mut snapshots = handle.snapshots();
        snapshots.wait_for(Option::is_some).await.unwrap();
        assert_eq!(handle.latest().unwrap().fresh_count(), 1);

        let mut theme = handle.theme();
        theme.wait_for(|t| *t == ThemeState::Dark).await.unwrap();

        let token = handle.cancellation_token();
        handle.shutdown().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_manual_cycle_before_start() {
        let store = Arc::new(MockStore::new());
        let mut engine = Engine::new(store, config(), Arc::new(ChannelRenderer::default()));

        let snapshot = engine.refresh_mut().run_cycle().await;
        assert!(snapshot.partial);
        assert_eq!(engine.theme().state(), ThemeState::Light);
    }
}
