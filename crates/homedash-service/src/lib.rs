//! Host process for the home telemetry dashboard engine.
//!
//! This crate provides:
//! - TOML configuration with validation
//! - Construction of the InfluxDB query client from configuration
//! - A logging rendering collaborator
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/homedash/dashboard.toml`:
//!
//! ```toml
//! [store]
//! url = "http://automation.lan:8086"
//! database = "garden"
//! timeout_secs = 10
//!
//! [refresh]
//! interval_secs = 300
//! slot_timeout_secs = 30
//! retries = 1
//!
//! [theme]
//! interval_secs = 60
//! alias = "livRoomLightSensor"
//! measurement = "Telemetry"
//! field = "Illumination"
//!
//! [display]
//! utc_offset_minutes = 60
//!
//! [thresholds]
//! humidity_low = 40.0
//! humidity_high = 60.0
//! level_cuts = [10.0, 13.0, 16.0, 19.0]
//! dark_below = 20.0
//!
//! [[slots]]
//! id = "workRoom"
//! title = "Study"
//! alias = "workRoomTempSensor"
//! kind = "climate"
//!
//! [[slots]]
//! id = "flowerOliva"
//! title = "Olive"
//! alias = "flowerOlivaSensor"
//! kind = "level"
//! icon = "images/olive.png"
//! ```

use std::time::Duration;

use homedash_core::InfluxClient;
use homedash_core::influx::{ClientBuildError, Credentials};

pub mod config;
pub mod renderer;

pub use config::{Config, ConfigError, ValidationError};
pub use renderer::LogRenderer;

/// Build the query client described by the `[store]` section.
pub fn build_store(config: &config::StoreConfig) -> Result<InfluxClient, ClientBuildError> {
    let client = InfluxClient::new(
        &config.url,
        &config.database,
        Duration::from_secs(config.timeout_secs),
    )?;

    Ok(match &config.username {
        Some(username) => client.with_credentials(Credentials {
            username: username.clone(),
            password: config.password.clone().unwrap_or_default(),
        }),
        None => client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_store_from_defaults() {
        let store = build_store(&config::StoreConfig::default()).unwrap();
        assert_eq!(store.base_url(), "http://automation.lan:8086");
        assert_eq!(store.database(), "garden");
    }

    #[test]
    fn test_build_store_rejects_bad_url() {
        let config = config::StoreConfig {
            url: "ftp://automation.lan".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            build_store(&config),
            Err(ClientBuildError::InvalidUrl(_))
        ));
    }
}
