//! CLI configuration: thin wrapper around `truckwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--config, --feed-url, --insecure, --timeout).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use truckwatch_core::{
    FixedPosition, GeoSupplier, Position, Preferences, TlsVerification, TrackerConfig,
    Unavailable,
};

use crate::cli::{GlobalOpts, LocationArgs};
use crate::error::CliError;

pub use truckwatch_config::{Config, FileStore, config_path, load_config_from};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file in effect: `--config` or the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and environment. A missing file yields defaults.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&active_config_path(global))?)
}

/// Translate config + global flags into a `TrackerConfig`.
///
/// CLI flag overrides take priority over config values.
pub fn resolve_tracker_config(
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<TrackerConfig, CliError> {
    let mut tracker = cfg.tracker_config()?;

    if let Some(ref raw) = global.feed_url {
        tracker.feed_url = raw.parse().map_err(|_| CliError::Validation {
            field: "feed-url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }
    if global.insecure {
        tracker.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        tracker.timeout = Duration::from_secs(secs);
    }
    Ok(tracker)
}

/// Open the on-disk preferences named by the config.
pub fn open_preferences(cfg: &Config) -> Result<Preferences, CliError> {
    let store = FileStore::open(cfg.preferences_path())?;
    Ok(Preferences::new(store))
}

/// Position from `--lat/--lng`, else from the config file.
pub fn resolve_position(
    location: &LocationArgs,
    cfg: &Config,
) -> Result<Option<Position>, CliError> {
    if let (Some(lat), Some(lng)) = (location.lat, location.lng) {
        let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
        if !in_range {
            return Err(CliError::Validation {
                field: "lat/lng".into(),
                reason: format!("{lat}, {lng} is not a valid coordinate"),
            });
        }
        return Ok(Some(Position::new(lat, lng)));
    }
    Ok(cfg.location.fixed_position()?)
}

/// A geo supplier for a known position, or one that always fails so the
/// tracker falls back to the default center.
pub fn static_geo(position: Option<Position>) -> Arc<dyn GeoSupplier> {
    match position {
        Some(p) => Arc::new(FixedPosition(p)),
        None => Arc::new(Unavailable),
    }
}
