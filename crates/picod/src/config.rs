//! Configuration file parsing and validation.
//!
//! picod uses a single TOML file: a `[hass]` section for the Home Assistant
//! connection, an optional `[logging]` section, and one `[remotes.<name>]`
//! table per physical remote. The raw deserialized form is converted to a
//! validated form before any controller is armed; any violation is fatal at
//! startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use crate::entity::Domain;
use crate::entity::EntityId;

const DEFAULT_DIM_DELAY: f64 = 0.05;
const DEFAULT_DIM_INTERVAL: u32 = 5;
const DEFAULT_LONG_PRESS_DURATION: f64 = 3.0;
const DEFAULT_HOLD_CAP: f64 = 30.0;
const DEFAULT_POLL_INTERVAL: f64 = 0.1;

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

/// Raw TOML document, types enforced by serde but references not yet
/// checked against their namespaces.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    logging: LoggingConfig,

    hass: RawHassConfig,

    #[serde(default)]
    remotes: BTreeMap<String, RawRemoteConfig>,
}

#[derive(Debug, Deserialize)]
struct RawHassConfig {
    url: String,
    token: String,

    #[serde(default)]
    poll_interval: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRemoteConfig {
    sensor: String,
    entity: String,

    #[serde(default)]
    input_number: Option<String>,

    min_brightness: u32,
    max_brightness: u32,

    #[serde(default)]
    dim_delay: Option<f64>,

    #[serde(default)]
    dim_interval: Option<u32>,

    #[serde(default)]
    favorite_long_press_duration: Option<f64>,

    #[serde(default)]
    hold_cap: Option<f64>,
}

/// Validated top-level configuration.
#[derive(Debug)]
pub struct Config {
    pub logging: LoggingConfig,
    pub hass: HassConfig,
    pub remotes: BTreeMap<String, RemoteConfig>,
}

/// Home Assistant connection settings.
#[derive(Debug)]
pub struct HassConfig {
    /// Base URL, e.g. "http://homeassistant.local:8123"
    pub url: String,

    /// Long-lived access token
    pub token: String,

    /// Sensor watch poll interval
    pub poll_interval: Duration,
}

/// Validated per-remote configuration, immutable for the lifetime of the
/// controller it arms.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Button-code source, sensor namespace
    pub sensor: EntityId,

    /// Dim/on/off/favorite target, light or group namespace
    pub entity: EntityId,

    /// Favorite persistent store, input_number namespace
    pub input_number: Option<EntityId>,

    pub min_brightness: u32,
    pub max_brightness: u32,

    /// Poll interval during dimming
    pub dim_delay: Duration,

    /// Brightness step per poll
    pub dim_interval: u32,

    /// Hold duration that turns a center press into a store action
    pub favorite_long_press: Duration,

    /// Upper bound on any hold-polling loop
    pub hold_cap: Duration,
}

/// A single validation failure, identified by its field path.
#[derive(Debug, Clone)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("\n  ")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration:\n  {}", format_violations(.0))]
    Invalid(Vec<Violation>),
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    /// Validate every field of every remote, collecting all violations so
    /// a broken config is reported in one pass.
    fn try_from(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();

        if raw.hass.url.is_empty() {
            violations.push(Violation {
                field: "hass.url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if raw.hass.token.is_empty() {
            violations.push(Violation {
                field: "hass.token".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        check_interval(&mut violations, "hass.poll_interval", raw.hass.poll_interval);

        let mut remotes = BTreeMap::new();
        for (name, raw_remote) in raw.remotes {
            match validate_remote(&name, raw_remote) {
                Ok(remote) => {
                    remotes.insert(name, remote);
                }
                Err(mut errors) => violations.append(&mut errors),
            }
        }

        if !violations.is_empty() {
            return Err(ConfigError::Invalid(violations));
        }

        Ok(Config {
            logging: raw.logging,
            hass: HassConfig {
                url: raw.hass.url,
                token: raw.hass.token,
                poll_interval: Duration::from_secs_f64(
                    raw.hass.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
                ),
            },
            remotes,
        })
    }
}

fn validate_remote(name: &str, raw: RawRemoteConfig) -> Result<RemoteConfig, Vec<Violation>> {
    let mut violations = Vec::new();
    let field = |suffix: &str| format!("remotes.{}.{}", name, suffix);

    let sensor = EntityId::new(raw.sensor);
    if sensor.domain() != Domain::Sensor {
        violations.push(Violation {
            field: field("sensor"),
            message: format!(
                "{} is not in the sensor namespace, example: sensor.my_pico",
                sensor
            ),
        });
    }

    let entity = EntityId::new(raw.entity);
    if !matches!(entity.domain(), Domain::Light | Domain::Group) {
        violations.push(Violation {
            field: field("entity"),
            message: format!(
                "{} is not a light or group, example: light.my_light or group.my_lights",
                entity
            ),
        });
    }

    let input_number = raw.input_number.map(EntityId::new);
    if let Some(store) = &input_number {
        if store.domain() != Domain::InputNumber {
            violations.push(Violation {
                field: field("input_number"),
                message: format!(
                    "{} is not an input_number, example: input_number.my_favorite",
                    store
                ),
            });
        }
    }

    if raw.min_brightness > raw.max_brightness {
        violations.push(Violation {
            field: field("min_brightness"),
            message: format!(
                "must not exceed max_brightness ({} > {})",
                raw.min_brightness, raw.max_brightness
            ),
        });
    }

    check_interval(&mut violations, &field("dim_delay"), raw.dim_delay);
    check_interval(
        &mut violations,
        &field("favorite_long_press_duration"),
        raw.favorite_long_press_duration,
    );
    check_interval(&mut violations, &field("hold_cap"), raw.hold_cap);

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(RemoteConfig {
        sensor,
        entity,
        input_number,
        min_brightness: raw.min_brightness,
        max_brightness: raw.max_brightness,
        dim_delay: Duration::from_secs_f64(raw.dim_delay.unwrap_or(DEFAULT_DIM_DELAY)),
        dim_interval: raw.dim_interval.unwrap_or(DEFAULT_DIM_INTERVAL),
        favorite_long_press: Duration::from_secs_f64(
            raw.favorite_long_press_duration
                .unwrap_or(DEFAULT_LONG_PRESS_DURATION),
        ),
        hold_cap: Duration::from_secs_f64(raw.hold_cap.unwrap_or(DEFAULT_HOLD_CAP)),
    })
}

/// Tuning intervals must be finite and non-negative seconds.
fn check_interval(violations: &mut Vec<Violation>, field: &str, value: Option<f64>) {
    if let Some(seconds) = value {
        if !seconds.is_finite() || seconds < 0.0 {
            violations.push(Violation {
                field: field.to_string(),
                message: format!("must be a non-negative number of seconds, got {}", seconds),
            });
        }
    }
}
