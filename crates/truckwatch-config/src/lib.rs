//! Configuration for truckwatch.
//!
//! TOML config file, `TRUCKWATCH_*` environment overrides, platform paths,
//! and the JSON file that persists user preferences between runs.

mod file_store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use truckwatch_core::{DEFAULT_CENTER, DEFAULT_FEED_URL, Position, TlsVerification, TrackerConfig};

pub use file_store::FileStore;

const PREFERENCES_FILE: &str = "preferences.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub feed: FeedSection,

    #[serde(default)]
    pub location: LocationSection,

    #[serde(default)]
    pub preferences: PreferencesSection,
}

/// Presentation defaults for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// Where truck telemetry comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSection {
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.into()
}

/// Reference-point settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationSection {
    /// Used when the device never produced a fix.
    #[serde(default = "default_fallback_lat")]
    pub fallback_lat: f64,

    #[serde(default = "default_fallback_lng")]
    pub fallback_lng: f64,

    /// Fixed device position. Both or neither must be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            fallback_lat: default_fallback_lat(),
            fallback_lng: default_fallback_lng(),
            lat: None,
            lng: None,
        }
    }
}

fn default_fallback_lat() -> f64 {
    DEFAULT_CENTER.lat
}
fn default_fallback_lng() -> f64 {
    DEFAULT_CENTER.lng
}

impl LocationSection {
    pub fn fallback_center(&self) -> Result<Position, ConfigError> {
        checked_position("location.fallback", self.fallback_lat, self.fallback_lng)
    }

    /// The configured fixed device position, if any.
    pub fn fixed_position(&self) -> Result<Option<Position>, ConfigError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => checked_position("location", lat, lng).map(Some),
            (None, None) => Ok(None),
            _ => Err(ConfigError::Validation {
                field: "location".into(),
                reason: "lat and lng must be set together".into(),
            }),
        }
    }
}

fn checked_position(field: &str, lat: f64, lng: f64) -> Result<Position, ConfigError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("{lat}, {lng} is not a valid WGS84 coordinate"),
        });
    }
    Ok(Position::new(lat, lng))
}

/// Where user preferences are persisted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreferencesSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Translate into the tracker's runtime configuration.
    pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        let feed_url = url::Url::parse(&self.feed.url).map_err(|e| ConfigError::Validation {
            field: "feed.url".into(),
            reason: format!("invalid URL '{}': {e}", self.feed.url),
        })?;

        let tls = if self.feed.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.feed.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(TrackerConfig {
            feed_url,
            tls,
            timeout: Duration::from_secs(self.defaults.timeout),
            fallback_center: self.location.fallback_center()?,
        })
    }

    /// Preferences file: the configured override or the platform data dir.
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join(PREFERENCES_FILE))
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("tw", "truckwatch", "truckwatch")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "truckwatch", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for persisted state such as preferences.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "truckwatch"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is fine.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TRUCKWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_at_the_public_feed() {
        let cfg = Config::default();
        let tracker = cfg.tracker_config().unwrap();
        assert_eq!(tracker.feed_url.as_str(), DEFAULT_FEED_URL);
        assert_eq!(tracker.fallback_center, DEFAULT_CENTER);
        assert_eq!(tracker.timeout, Duration::from_secs(30));
        assert_eq!(tracker.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[feed]
url = "http://localhost:9000/trucks"
insecure = true

[location]
lat = 22.6
lng = 120.3
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(
            cfg.location.fixed_position().unwrap(),
            Some(Position::new(22.6, 120.3))
        );
        let tracker = cfg.tracker_config().unwrap();
        assert_eq!(tracker.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(tracker.feed_url.port(), Some(9000));
    }

    #[test]
    fn half_a_fixed_position_is_rejected() {
        let location = LocationSection {
            lat: Some(22.6),
            ..LocationSection::default()
        };
        assert!(matches!(
            location.fixed_position(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn invalid_feed_url_is_a_validation_error() {
        let mut cfg = Config::default();
        cfg.feed.url = "not a url".into();
        assert!(matches!(
            cfg.tracker_config(),
            Err(ConfigError::Validation { field, .. }) if field == "feed.url"
        ));
    }

    #[test]
    fn save_then_load_preserves_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.defaults.output = "json".into();
        cfg.preferences.path = Some(dir.path().join("prefs.json"));

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }
}
