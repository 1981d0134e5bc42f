//! Dashboard configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use homedash_core::refresh::{CLIMATE_MEASUREMENT, LEVEL_FIELD, LEVEL_MEASUREMENT};
use homedash_core::{
    DisplayOffset, EngineConfig, FieldSet, IlluminationSource, Normalizer, RefreshOptions,
    RetryConfig, SlotConfig, Thresholds,
};
use homedash_types::{SensorAlias, SlotKind};

/// Minimum schedule interval in seconds (10 seconds).
pub const MIN_INTERVAL: u64 = 10;
/// Maximum schedule interval in seconds (1 hour).
pub const MAX_INTERVAL: u64 = 3600;
/// Largest accepted retry count per slot and cycle.
pub const MAX_RETRIES: u32 = 5;
/// Largest accepted display offset in minutes (18 hours).
pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telemetry store connection.
    pub store: StoreConfig,
    /// Refresh schedule.
    pub refresh: RefreshConfig,
    /// Theme schedule.
    pub theme: ThemeConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Alert, bucket and theme cut points.
    pub thresholds: Thresholds,
    /// Dashboard slots in display order.
    pub slots: Vec<SlotSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            refresh: RefreshConfig::default(),
            theme: ThemeConfig::default(),
            display: DisplayConfig::default(),
            thresholds: Thresholds::default(),
            slots: default_slots(),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing file yields the built-in defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_toml()?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Store URL is http(s) and the database name is set
    /// - Intervals are within reasonable bounds (10s - 1 hour)
    /// - Display offset is within ±18 hours
    /// - Humidity band and level cut points are ordered
    /// - Theme alias is set
    /// - Slot ids are present and unique, slot aliases are set
    ///
    /// # Example
    ///
    /// ```
    /// use homedash_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.store.validate());
        errors.extend(self.refresh.validate());
        errors.extend(self.theme.validate());
        errors.extend(self.display.validate());
        errors.extend(validate_thresholds(&self.thresholds));

        let mut seen_ids = HashSet::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let prefix = format!("slots[{}]", i);
            errors.extend(slot.validate(&prefix));

            if !slot.id.is_empty() && !seen_ids.insert(slot.id.as_str()) {
                errors.push(ValidationError {
                    field: format!("{}.id", prefix),
                    message: format!("duplicate slot id '{}'", slot.id),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the engine configuration.
    ///
    /// Runs [`Config::validate`] first, so every alias and offset is known
    /// to be usable.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;

        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| slot.to_slot_config(&format!("slots[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;

        let illumination = IlluminationSource {
            alias: alias("theme.alias", &self.theme.alias)?,
            fields: FieldSet::level(&self.theme.measurement, &self.theme.field),
        };

        let offset = DisplayOffset::from_minutes(self.display.utc_offset_minutes).map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "display.utc_offset_minutes".to_string(),
                message: e.to_string(),
            }])
        })?;

        Ok(EngineConfig {
            slots,
            refresh: RefreshOptions {
                interval: Duration::from_secs(self.refresh.interval_secs),
                slot_timeout: Duration::from_secs(self.refresh.slot_timeout_secs),
                retry: RetryConfig::new(self.refresh.retries),
            },
            illumination,
            theme_interval: Duration::from_secs(self.theme.interval_secs),
            normalizer: Normalizer::new(offset),
            thresholds: self.thresholds.clone(),
        })
    }
}

fn alias(field: &str, value: &str) -> Result<SensorAlias, ConfigError> {
    SensorAlias::new(value).map_err(|e| {
        ConfigError::Validation(vec![ValidationError {
            field: field.to_string(),
            message: e.to_string(),
        }])
    })
}

/// Telemetry store connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the InfluxDB HTTP API.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Username for authenticated servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authenticated servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://automation.lan:8086".to_string(),
            database: "garden".to_string(),
            timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}

impl StoreConfig {
    /// Validate store settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            errors.push(ValidationError {
                field: "store.url".to_string(),
                message: format!("'{}' must start with http:// or https://", self.url),
            });
        }

        if self.database.trim().is_empty() {
            errors.push(ValidationError {
                field: "store.database".to_string(),
                message: "database name cannot be empty".to_string(),
            });
        }

        if self.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "store.timeout_secs".to_string(),
                message: "timeout must be at least 1 second".to_string(),
            });
        }

        if self.password.is_some() && self.username.is_none() {
            errors.push(ValidationError {
                field: "store.password".to_string(),
                message: "password given without username".to_string(),
            });
        }

        errors
    }
}

/// Refresh schedule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between refresh cycles.
    pub interval_secs: u64,
    /// Deadline for each slot query in seconds.
    pub slot_timeout_secs: u64,
    /// Retries after a connection failure.
    pub retries: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            slot_timeout_secs: 30,
            retries: 1,
        }
    }
}

impl RefreshConfig {
    /// Validate refresh settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate_interval("refresh.interval_secs", self.interval_secs);

        if self.slot_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "refresh.slot_timeout_secs".to_string(),
                message: "slot timeout must be at least 1 second".to_string(),
            });
        } else if self.slot_timeout_secs >= self.interval_secs {
            errors.push(ValidationError {
                field: "refresh.slot_timeout_secs".to_string(),
                message: format!(
                    "slot timeout {} must be shorter than the refresh interval {}",
                    self.slot_timeout_secs, self.interval_secs
                ),
            });
        } else if self.retries <= MAX_RETRIES && self.worst_case_secs() >= self.interval_secs {
            errors.push(ValidationError {
                field: "refresh.retries".to_string(),
                message: format!(
                    "{} attempts of {}s each do not fit in the refresh interval {}",
                    self.retries + 1,
                    self.slot_timeout_secs,
                    self.interval_secs
                ),
            });
        }

        if self.retries > MAX_RETRIES {
            errors.push(ValidationError {
                field: "refresh.retries".to_string(),
                message: format!(
                    "{} retries is too many (maximum {})",
                    self.retries, MAX_RETRIES
                ),
            });
        }

        errors
    }

    /// Longest a slot can spend in store calls, backoff excluded.
    fn worst_case_secs(&self) -> u64 {
        self.slot_timeout_secs
            .saturating_mul(u64::from(self.retries) + 1)
    }
}

/// Theme schedule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Seconds between illumination checks.
    pub interval_secs: u64,
    /// Illumination sensor alias.
    pub alias: String,
    /// Measurement holding illumination.
    pub measurement: String,
    /// Illumination field.
    pub field: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            alias: "livRoomLightSensor".to_string(),
            measurement: CLIMATE_MEASUREMENT.to_string(),
            field: "Illumination".to_string(),
        }
    }
}

impl ThemeConfig {
    /// Validate theme settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate_interval("theme.interval_secs", self.interval_secs);

        if self.alias.trim().is_empty() {
            errors.push(ValidationError {
                field: "theme.alias".to_string(),
                message: "illumination sensor alias cannot be empty".to_string(),
            });
        }
        if self.measurement.trim().is_empty() || self.field.trim().is_empty() {
            errors.push(ValidationError {
                field: "theme".to_string(),
                message: "measurement and field cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Fixed offset from UTC for shown times, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DisplayOffset::DEFAULT.minutes(),
        }
    }
}

impl DisplayConfig {
    /// Validate display settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            vec![ValidationError {
                field: "display.utc_offset_minutes".to_string(),
                message: format!(
                    "offset {} is outside ±{} minutes",
                    self.utc_offset_minutes, MAX_OFFSET_MINUTES
                ),
            }]
        } else {
            Vec::new()
        }
    }
}

/// One dashboard slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSettings {
    /// Unique slot identifier.
    pub id: String,
    /// Card heading.
    pub title: String,
    /// Sensor alias in the store.
    pub alias: String,
    /// `climate` or `level`.
    pub kind: SlotKind,
    /// Optional card picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Measurement override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<String>,
    /// Level field override (level slots only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl SlotSettings {
    fn new(id: &str, title: &str, alias: &str, kind: SlotKind) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            alias: alias.to_string(),
            kind,
            icon: None,
            measurement: None,
            field: None,
        }
    }

    /// Validate slot settings.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.id", prefix),
                message: "slot id cannot be empty".to_string(),
            });
        }

        if self.alias.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.alias", prefix),
                message: "sensor alias cannot be empty".to_string(),
            });
        }

        if self.kind == SlotKind::Climate && self.field.is_some() {
            errors.push(ValidationError {
                field: format!("{}.field", prefix),
                message: "field override applies only to level slots".to_string(),
            });
        }

        errors
    }

    /// Convert to the engine's slot type.
    pub fn to_slot_config(&self, prefix: &str) -> Result<SlotConfig, ConfigError> {
        let alias = alias(&format!("{}.alias", prefix), &self.alias)?;
        let fields = match self.kind {
            SlotKind::Climate => FieldSet::climate(
                self.measurement.as_deref().unwrap_or(CLIMATE_MEASUREMENT),
            ),
            SlotKind::Level => FieldSet::level(
                self.measurement.as_deref().unwrap_or(LEVEL_MEASUREMENT),
                self.field.as_deref().unwrap_or(LEVEL_FIELD),
            ),
        };

        let mut slot = match self.kind {
            SlotKind::Climate => SlotConfig::climate(&self.id, &self.title, alias),
            SlotKind::Level => SlotConfig::level(&self.id, &self.title, alias),
        }
        .with_fields(fields);
        slot.icon = self.icon.clone();
        Ok(slot)
    }
}

/// The stock dashboard: four rooms and two plants.
fn default_slots() -> Vec<SlotSettings> {
    let mut oleander = SlotSettings::new(
        "flowerOleandr",
        "Oleander",
        "flowerOleandrSensor",
        SlotKind::Level,
    );
    oleander.icon = Some("images/oleandr.png".to_string());
    let mut olive = SlotSettings::new("flowerOliva", "Olive", "flowerOlivaSensor", SlotKind::Level);
    olive.icon = Some("images/olive.png".to_string());

    vec![
        SlotSettings::new("workRoom", "Study", "workRoomTempSensor", SlotKind::Climate),
        SlotSettings::new("bedRoom", "Bedroom", "bedRoomTempSensor", SlotKind::Climate),
        SlotSettings::new("livRoom", "Living room", "livRoomTempSensor", SlotKind::Climate),
        SlotSettings::new("SashaRoom", "Den", "SashaRoomTempSensor", SlotKind::Climate),
        oleander,
        olive,
    ]
}

fn validate_interval(field: &str, secs: u64) -> Vec<ValidationError> {
    if secs < MIN_INTERVAL {
        vec![ValidationError {
            field: field.to_string(),
            message: format!(
                "interval {} is too short (minimum {} seconds)",
                secs, MIN_INTERVAL
            ),
        }]
    } else if secs > MAX_INTERVAL {
        vec![ValidationError {
            field: field.to_string(),
            message: format!(
                "interval {} is too long (maximum {} seconds / 1 hour)",
                secs, MAX_INTERVAL
            ),
        }]
    } else {
        Vec::new()
    }
}

fn validate_thresholds(thresholds: &Thresholds) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let scalars = [
        ("thresholds.humidity_low", thresholds.humidity_low),
        ("thresholds.humidity_high", thresholds.humidity_high),
        ("thresholds.dark_below", thresholds.dark_below),
    ];
    for (field, value) in scalars {
        if !value.is_finite() {
            errors.push(ValidationError {
                field: field.to_string(),
                message: format!("{} is not a finite number", value),
            });
        }
    }

    if thresholds.humidity_low > thresholds.humidity_high {
        errors.push(ValidationError {
            field: "thresholds.humidity_low".to_string(),
            message: format!(
                "humidity_low {} is above humidity_high {}",
                thresholds.humidity_low, thresholds.humidity_high
            ),
        });
    }

    if !thresholds.level_cuts_ascending() {
        errors.push(ValidationError {
            field: "thresholds.level_cuts".to_string(),
            message: format!(
                "cut points {:?} must be strictly ascending",
                thresholds.level_cuts
            ),
        });
    }

    errors
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The field path (e.g., `store.url` or `slots[0].alias`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("homedash")
        .join("dashboard.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_fields(config: &Config) -> Vec<String> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store.database, "garden");
        assert_eq!(config.refresh.interval_secs, 300);
        assert_eq!(config.theme.interval_secs, 60);
        assert_eq!(config.display.utc_offset_minutes, 60);
        assert_eq!(config.slots.len(), 6);
        assert_eq!(config.slots[0].alias, "workRoomTempSensor");
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_slot_settings_serde() {
        let toml = r#"
            id = "olive"
            title = "Olive"
            alias = "flowerOlivaSensor"
            kind = "level"
            icon = "images/olive.png"
        "#;
        let slot: SlotSettings = toml::from_str(toml).unwrap();
        assert_eq!(slot.kind, SlotKind::Level);
        assert_eq!(slot.icon.as_deref(), Some("images/olive.png"));
        assert_eq!(slot.field, None);
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [store]
            url = "http://localhost:8086"
            database = "home"
            timeout_secs = 5

            [refresh]
            interval_secs = 120
            retries = 2

            [theme]
            alias = "hallLightSensor"

            [display]
            utc_offset_minutes = 120

            [thresholds]
            humidity_low = 35.0
            dark_below = 15.0

            [[slots]]
            id = "kitchen"
            title = "Kitchen"
            alias = "kitchenTempSensor"
            kind = "climate"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.store.url, "http://localhost:8086");
        assert_eq!(config.refresh.interval_secs, 120);
        assert_eq!(config.refresh.slot_timeout_secs, 30);
        assert_eq!(config.theme.alias, "hallLightSensor");
        assert_eq!(config.theme.field, "Illumination");
        assert_eq!(config.thresholds.humidity_low, 35.0);
        assert_eq!(config.thresholds.humidity_high, 60.0);
        assert_eq!(config.thresholds.dark_below, 15.0);
        assert_eq!(config.slots.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("dashboard.toml");

        let mut config = Config::default();
        config.store.url = "https://influx.example.net".to_string();
        config.slots.truncate(2);

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/dashboard.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not [valid toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("homedash/dashboard.toml"));
    }

    #[test]
    fn test_store_validation() {
        let mut config = Config::default();
        config.store.url = "automation.lan:8086".to_string();
        config.store.database = " ".to_string();
        config.store.timeout_secs = 0;
        config.store.password = Some("secret".to_string());

        let fields = validation_fields(&config);
        assert_eq!(
            fields,
            vec![
                "store.url",
                "store.database",
                "store.timeout_secs",
                "store.password"
            ]
        );
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = Config::default();
        config.refresh.interval_secs = 5;
        config.theme.interval_secs = 7200;
        let fields = validation_fields(&config);
        assert!(fields.contains(&"refresh.interval_secs".to_string()));
        assert!(fields.contains(&"theme.interval_secs".to_string()));
    }

    #[test]
    fn test_slot_timeout_must_fit_interval() {
        let mut config = Config::default();
        config.refresh.interval_secs = 30;
        config.refresh.slot_timeout_secs = 30;
        assert_eq!(validation_fields(&config), vec!["refresh.slot_timeout_secs"]);
    }

    #[test]
    fn test_retries_must_fit_interval() {
        let mut config = Config::default();
        config.refresh.interval_secs = 100;
        config.refresh.slot_timeout_secs = 40;
        config.refresh.retries = 1;
        assert!(config.validate().is_ok());

        config.refresh.retries = 2;
        assert_eq!(validation_fields(&config), vec!["refresh.retries"]);

        config.refresh.interval_secs = 3600;
        config.refresh.slot_timeout_secs = 1;
        config.refresh.retries = u32::MAX;
        assert_eq!(validation_fields(&config), vec!["refresh.retries"]);
    }

    #[test]
    fn test_offset_bounds() {
        let mut config = Config::default();
        config.display.utc_offset_minutes = -19 * 60;
        assert_eq!(validation_fields(&config), vec!["display.utc_offset_minutes"]);
    }

    #[test]
    fn test_threshold_validation() {
        let mut config = Config::default();
        config.thresholds.humidity_low = 70.0;
        config.thresholds.level_cuts = [10.0, 9.0, 16.0, 19.0];
        assert_eq!(
            validation_fields(&config),
            vec!["thresholds.humidity_low", "thresholds.level_cuts"]
        );
    }

    #[test]
    fn test_non_finite_thresholds_rejected() {
        let config: Config = toml::from_str(
            r#"
            [thresholds]
            humidity_low = nan
            dark_below = inf
            "#,
        )
        .unwrap();
        assert!(config.thresholds.humidity_low.is_nan());
        assert_eq!(
            validation_fields(&config),
            vec!["thresholds.humidity_low", "thresholds.dark_below"]
        );

        let mut config = Config::default();
        config.thresholds.humidity_high = f64::NAN;
        assert_eq!(validation_fields(&config), vec!["thresholds.humidity_high"]);
    }

    #[test]
    fn test_slot_validation() {
        let mut config = Config::default();
        config.theme.alias = String::new();
        config.slots = vec![
            SlotSettings::new("", "Nameless", "a", SlotKind::Climate),
            SlotSettings::new("den", "Den", "  ", SlotKind::Climate),
            SlotSettings::new("den", "Den again", "b", SlotKind::Level),
        ];
        config.slots[0].field = Some("Moisture".to_string());

        assert_eq!(
            validation_fields(&config),
            vec![
                "theme.alias",
                "slots[0].id",
                "slots[0].field",
                "slots[1].alias",
                "slots[2].id"
            ]
        );
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = ConfigError::Validation(vec![
            ValidationError {
                field: "store.url".to_string(),
                message: "bad".to_string(),
            },
            ValidationError {
                field: "slots[0].id".to_string(),
                message: "empty".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Configuration validation failed"));
        assert!(msg.contains("  - store.url: bad"));
        assert!(msg.contains("  - slots[0].id: empty"));
    }

    #[test]
    fn test_engine_config_conversion() {
        let mut config = Config::default();
        config.refresh.retries = 3;
        config.display.utc_offset_minutes = 120;
        config.slots[4].measurement = Some("Plants".to_string());
        config.slots[4].field = Some("Soil".to_string());

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.slots.len(), 6);
        assert_eq!(engine.refresh.interval, Duration::from_secs(300));
        assert_eq!(engine.refresh.retry.max_retries, 3);
        assert_eq!(engine.theme_interval, Duration::from_secs(60));
        assert_eq!(engine.normalizer.display_offset().minutes(), 120);
        assert_eq!(engine.slots[0].fields, FieldSet::climate("Telemetry"));
        assert_eq!(engine.slots[4].fields, FieldSet::level("Plants", "Soil"));
        assert_eq!(engine.slots[5].fields, FieldSet::level("Flowers", "Moisture"));
        assert_eq!(engine.slots[5].icon.as_deref(), Some("images/olive.png"));
        assert_eq!(engine.illumination.alias.as_str(), "livRoomLightSensor");
    }

    #[test]
    fn test_engine_config_rejects_invalid() {
        let mut config = Config::default();
        config.slots[0].alias = String::new();
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::Validation(_))
        ));
    }
}
