//! Pure render model for dashboard cards.
//!
//! A [`CardView`] is recomputed from the last snapshot entry and the current
//! theme whenever either changes. Nothing here holds state, so a theme
//! change is applied by calling [`card_view`] again for every slot.

use serde::Serialize;

use homedash_types::{Card, SlotEntry, SlotStatus, ThemeState, format_observed};

/// Timestamp placeholder for slots that have never been read.
pub const TIMESTAMP_PLACEHOLDER: &str = "--:--:-- --/--/----";

/// Emphasis of a value line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    /// Regular text colour.
    Normal,
    /// Out-of-band value.
    Alert,
}

/// One icon plus value row on a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueLine {
    pub icon: String,
    pub text: String,
    pub accent: Accent,
}

/// Everything a display needs to paint one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    /// Heading.
    pub title: String,
    /// Slot picture (plants), if configured.
    pub icon: Option<String>,
    /// Value rows, empty for absent slots.
    pub lines: Vec<ValueLine>,
    /// Level tier icon for level cards.
    pub level_icon: Option<String>,
    /// `Last updated: ...` footer.
    pub timestamp_label: String,
    /// Whether the data is carried over from an earlier cycle.
    pub stale: bool,
}

fn image(theme: ThemeState, name: &str) -> String {
    match theme {
        ThemeState::Light => format!("images/{}.png", name),
        ThemeState::Dark => format!("images/dark/{}.png", name),
    }
}

/// Build the render model for a slot under a theme.
pub fn card_view(entry: &SlotEntry, theme: ThemeState) -> CardView {
    let stale = matches!(entry.status, SlotStatus::Stale(_));

    let (lines, level_icon) = match entry.status.card() {
        Some(Card::Climate {
            measurement,
            humidity_alert,
        }) => (
            vec![
                ValueLine {
                    icon: image(theme, "temperature"),
                    text: format!("{:.1}", measurement.temperature_celsius),
                    accent: Accent::Normal,
                },
                ValueLine {
                    icon: image(theme, "humidity"),
                    text: format!("{:.1}", measurement.humidity_percent),
                    accent: if *humidity_alert {
                        Accent::Alert
                    } else {
                        Accent::Normal
                    },
                },
            ],
            None,
        ),
        Some(Card::Level { bucket, .. }) => (
            Vec::new(),
            Some(image(theme, &format!("level{}", bucket.tier()))),
        ),
        None => (Vec::new(), None),
    };

    let observed = entry
        .status
        .card()
        .map(|card| format_observed(card.observed_at()))
        .unwrap_or_else(|| TIMESTAMP_PLACEHOLDER.to_string());

    let timestamp_label = if stale {
        format!("Last updated: {} (stale)", observed)
    } else {
        format!("Last updated: {}", observed)
    };

    CardView {
        title: entry.title.clone(),
        icon: entry.icon.clone(),
        lines,
        level_icon,
        timestamp_label,
        stale,
    }
}
