//! A rendering collaborator that writes the dashboard to the log.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use homedash_core::view::Accent;
use homedash_core::{CardView, Renderer, card_view};
use homedash_types::{PresentationSnapshot, ThemeState};

#[derive(Debug, Default)]
struct Screen {
    theme: ThemeState,
    snapshot: Option<Arc<PresentationSnapshot>>,
}

/// Logs one line per card whenever the snapshot or the theme changes.
///
/// The last snapshot is kept so a theme change can redraw every card with
/// the new icon set.
#[derive(Debug, Default)]
pub struct LogRenderer {
    screen: Mutex<Screen>,
}

impl LogRenderer {
    /// Create a renderer starting in the light theme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the current screen to card views.
    pub fn cards(&self) -> Vec<CardView> {
        let screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        render(&screen)
    }
}

fn render(screen: &Screen) -> Vec<CardView> {
    screen
        .snapshot
        .as_ref()
        .map(|snapshot| {
            snapshot
                .slots
                .iter()
                .map(|entry| card_view(entry, screen.theme))
                .collect()
        })
        .unwrap_or_default()
}

fn log_cards(cards: &[CardView]) {
    for card in cards {
        let values = card
            .lines
            .iter()
            .map(|line| match line.accent {
                Accent::Alert => format!("{} (!)", line.text),
                Accent::Normal => line.text.clone(),
            })
            .collect::<Vec<_>>()
            .join(" / ");

        let level = card.level_icon.as_deref().unwrap_or("");
        if card.stale {
            warn!("[{}] {} {} | {}", card.title, values, level, card.timestamp_label);
        } else {
            info!("[{}] {} {} | {}", card.title, values, level, card.timestamp_label);
        }
    }
}

impl Renderer for LogRenderer {
    fn on_snapshot(&self, snapshot: Arc<PresentationSnapshot>) {
        let cards = {
            let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
            screen.snapshot = Some(snapshot);
            render(&screen)
        };
        log_cards(&cards);
    }

    fn on_theme_changed(&self, theme: ThemeState) {
        let cards = {
            let mut screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
            screen.theme = theme;
            render(&screen)
        };
        info!("Switched to {} theme, redrawing {} card(s)", theme, cards.len());
        log_cards(&cards);
    }
}
