//! Derivation rules: humidity alerts, level buckets and theme selection.
//!
//! All rules are pure functions of the reading and the configured cut
//! points. A single step function, [`step_index`], backs both the level
//! buckets and the illumination theme decision.
//!
//! # Example
//!
//! ```
//! use homedash_core::Thresholds;
//! use homedash_types::ThemeState;
//!
//! let thresholds = Thresholds::default();
//!
//! assert!(thresholds.humidity_alert(35.0));
//! assert!(!thresholds.humidity_alert(40.0));
//! assert_eq!(thresholds.level_bucket(12.9).index(), 1);
//! assert_eq!(thresholds.theme_for(19.9), ThemeState::Dark);
//! ```

use serde::{Deserialize, Serialize};

use homedash_types::{Bucket, Card, LevelReading, Measurement, ThemeState};

/// Index of the first cut point strictly greater than `value`.
///
/// Cut points are evaluated in ascending order with strict less-than, so a
/// value equal to a cut point falls into the upper bucket. Values at or
/// above the last cut point return `cuts.len()`.
///
/// # Examples
///
/// ```
/// use homedash_core::thresholds::step_index;
///
/// assert_eq!(step_index(9.9, &[10.0, 13.0]), 0);
/// assert_eq!(step_index(10.0, &[10.0, 13.0]), 1);
/// assert_eq!(step_index(50.0, &[10.0, 13.0]), 2);
/// ```
pub fn step_index(value: f64, cuts: &[f64]) -> usize {
    cuts.iter()
        .position(|cut| value < *cut)
        .unwrap_or(cuts.len())
}

/// Configurable cut points for every derivation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Humidity below this alerts.
    pub humidity_low: f64,
    /// Humidity above this alerts.
    pub humidity_high: f64,
    /// Ascending cut points separating the five level buckets.
    pub level_cuts: [f64; 4],
    /// Illumination below this selects the dark theme.
    pub dark_below: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            humidity_low: 40.0,
            humidity_high: 60.0,
            level_cuts: [10.0, 13.0, 16.0, 19.0],
            dark_below: 20.0,
        }
    }
}

impl Thresholds {
    /// Whether humidity is outside the comfortable band.
    ///
    /// The band edges themselves are not alerting.
    pub fn humidity_alert(&self, humidity_percent: f64) -> bool {
        humidity_percent < self.humidity_low || humidity_percent > self.humidity_high
    }

    /// Bucket a level value into one of five tiers.
    pub fn level_bucket(&self, value: f64) -> Bucket {
        // Four cut points yield an index in 0..=4, which is always a valid bucket.
        Bucket::from_index(step_index(value, &self.level_cuts)).unwrap_or_default()
    }

    /// Pick the theme for an illumination value.
    pub fn theme_for(&self, illumination: f64) -> ThemeState {
        match step_index(illumination, &[self.dark_below]) {
            0 => ThemeState::Dark,
            _ => ThemeState::Light,
        }
    }

    /// Derive the climate card for a measurement.
    pub fn climate_card(&self, measurement: Measurement) -> Card {
        let humidity_alert = self.humidity_alert(measurement.humidity_percent);
        Card::Climate {
            measurement,
            humidity_alert,
        }
    }

    /// Derive the level card for a reading.
    pub fn level_card(&self, reading: LevelReading) -> Card {
        let bucket = self.level_bucket(reading.value);
        Card::Level { reading, bucket }
    }

    /// Whether the level cut points are strictly ascending.
    pub fn level_cuts_ascending(&self) -> bool {
        self.level_cuts.windows(2).all(|pair| pair[0] < pair[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::datetime;

    #[test]
    fn test_humidity_alert_boundaries() {
        let t = Thresholds::default();
        assert!(t.humidity_alert(39.9));
        assert!(!t.humidity_alert(40.0));
        assert!(!t.humidity_alert(50.0));
        assert!(!t.humidity_alert(60.0));
        assert!(t.humidity_alert(60.1));
    }

    #[test]
    fn test_level_bucket_boundaries() {
        let t = Thresholds::default();
        let cases = [
            (9.9, 0),
            (10.0, 1),
            (12.9, 1),
            (13.0, 2),
            (15.9, 2),
            (16.0, 3),
            (18.9, 3),
            (19.0, 4),
            (250.0, 4),
            (-3.0, 0),
        ];
        for (value, expected) in cases {
            assert_eq!(t.level_bucket(value).index(), expected, "value {}", value);
        }
    }

    #[test]
    fn test_theme_boundaries() {
        let t = Thresholds::default();
        assert_eq!(t.theme_for(19.9), ThemeState::Dark);
        assert_eq!(t.theme_for(20.0), ThemeState::Light);
        assert_eq!(t.theme_for(20.1), ThemeState::Light);
        assert_eq!(t.theme_for(0.0), ThemeState::Dark);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds {
            humidity_low: 30.0,
            humidity_high: 70.0,
            level_cuts: [1.0, 2.0, 3.0, 4.0],
            dark_below: 5.0,
        };
        assert!(!t.humidity_alert(35.0));
        assert_eq!(t.level_bucket(3.5).index(), 3);
        assert_eq!(t.theme_for(10.0), ThemeState::Light);
    }

    #[test]
    fn test_step_index_empty_cuts() {
        assert_eq!(step_index(5.0, &[]), 0);
    }

    #[test]
    fn test_level_cuts_ascending() {
        assert!(Thresholds::default().level_cuts_ascending());
        let t = Thresholds {
            level_cuts: [10.0, 10.0, 16.0, 19.0],
            ..Default::default()
        };
        assert!(!t.level_cuts_ascending());
    }

    #[test]
    fn test_cards_carry_derivations() {
        let t = Thresholds::default();
        let card = t.climate_card(Measurement {
            temperature_celsius: 22.0,
            humidity_percent: 65.0,
            observed_at: datetime!(2024-03-01 11:00:00 +01:00),
        });
        assert!(matches!(card, Card::Climate { humidity_alert: true, .. }));

        let card = t.level_card(LevelReading {
            value: 14.0,
            observed_at: datetime!(2024-03-01 11:00:00 +01:00),
        });
        assert!(matches!(card, Card::Level { bucket, .. } if bucket.index() == 2));
    }

    #[test]
    fn test_thresholds_partial_config() {
        let t: Thresholds = serde_json::from_str(r#"{"dark_below": 35.0}"#).unwrap();
        assert_eq!(t.dark_below, 35.0);
        assert_eq!(t.humidity_low, 40.0);
    }

    proptest! {
        /// Buckets never decrease as the value grows.
        #[test]
        fn level_bucket_is_monotonic(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
            let t = Thresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.level_bucket(lo) <= t.level_bucket(hi));
        }

        /// Alerting matches the strict band definition.
        #[test]
        fn humidity_alert_matches_band(h in -50.0f64..150.0) {
            let t = Thresholds::default();
            prop_assert_eq!(t.humidity_alert(h), h < 40.0 || h > 60.0);
        }

        /// Theme is dark exactly below the cut point.
        #[test]
        fn theme_matches_cut(lux in -10.0f64..1000.0) {
            let t = Thresholds::default();
            let expected = if lux < 20.0 { ThemeState::Dark } else { ThemeState::Light };
            prop_assert_eq!(t.theme_for(lux), expected);
        }
    }
}
