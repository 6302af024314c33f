//! Shared helpers for command handlers.

use std::sync::Arc;

use truckwatch_core::{GeoSupplier, Tracker, Unavailable};

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::error::CliError;

/// Build a tracker from config, flag overrides, and on-disk preferences.
/// Nothing touches the network until the tracker is asked to refresh.
pub fn build_tracker(
    cfg: &Config,
    global: &GlobalOpts,
    geo: Arc<dyn GeoSupplier>,
) -> Result<Tracker, CliError> {
    let tracker_config = config::resolve_tracker_config(cfg, global)?;
    let source = Arc::new(tracker_config.feed_client()?);
    let prefs = config::open_preferences(cfg)?;
    tracing::debug!(feed = %tracker_config.feed_url, "tracker configured");
    Ok(Tracker::new(tracker_config, source, geo, prefs))
}

/// Tracker for commands that only touch preferences.
pub fn offline_tracker(global: &GlobalOpts) -> Result<Tracker, CliError> {
    let cfg = config::load(global)?;
    build_tracker(&cfg, global, Arc::new(Unavailable))
}
