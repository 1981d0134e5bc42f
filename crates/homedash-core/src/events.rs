//! Rendering collaborator interface and dashboard event channel.
//!
//! The engine hands every completed snapshot and every theme transition to
//! a [`Renderer`]. Renderers are called from the task that drives the
//! respective schedule and must marshal onto their own update mechanism.

use std::sync::Arc;

use tokio::sync::broadcast;

use homedash_types::{PresentationSnapshot, ThemeState};

/// Receives presentation state from the engine.
pub trait Renderer: Send + Sync {
    /// Called once per completed refresh cycle.
    fn on_snapshot(&self, snapshot: Arc<PresentationSnapshot>);

    /// Called only when the theme actually transitions.
    fn on_theme_changed(&self, theme: ThemeState);
}

/// Events delivered by a [`ChannelRenderer`].
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DashboardEvent {
    /// A refresh cycle published a new snapshot.
    Snapshot(Arc<PresentationSnapshot>),
    /// The theme changed.
    ThemeChanged(ThemeState),
}

/// Sender for dashboard events.
pub type EventSender = broadcast::Sender<DashboardEvent>;

/// Receiver for dashboard events.
pub type EventReceiver = broadcast::Receiver<DashboardEvent>;

/// A renderer that forwards everything onto a broadcast channel.
///
/// Useful when the actual display runs its own event loop, and in tests.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    sender: EventSender,
}

impl ChannelRenderer {
    /// Create a new channel renderer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, event: DashboardEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }
}

impl Default for ChannelRenderer {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Renderer for ChannelRenderer {
    fn on_snapshot(&self, snapshot: Arc<PresentationSnapshot>) {
        self.send(DashboardEvent::Snapshot(snapshot));
    }

    fn on_theme_changed(&self, theme: ThemeState) {
        self.send(DashboardEvent::ThemeChanged(theme));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_channel_renderer_forwards_events() {
        let renderer = ChannelRenderer::default();
        let mut rx = renderer.subscribe();
        assert_eq!(renderer.receiver_count(), 1);

        let snapshot = Arc::new(PresentationSnapshot {
            fetched_at: datetime!(2024-03-01 11:00:00 +01:00),
            partial: false,
            slots: Vec::new(),
        });
        renderer.on_snapshot(Arc::clone(&snapshot));
        renderer.on_theme_changed(ThemeState::Dark);

        match rx.recv().await.unwrap() {
            DashboardEvent::Snapshot(received) => assert!(Arc::ptr_eq(&received, &snapshot)),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            DashboardEvent::ThemeChanged(ThemeState::Dark)
        ));
    }

    #[test]
    fn test_send_without_receivers_is_ignored() {
        let renderer = ChannelRenderer::new(4);
        renderer.on_theme_changed(ThemeState::Light);
        assert_eq!(renderer.receiver_count(), 0);
    }
}
