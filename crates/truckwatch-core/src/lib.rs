//! Truck reconciliation, proximity alerting, and refresh lifecycle.
//!
//! This crate owns the domain logic of truckwatch, sitting between the
//! feed client in `truckwatch-api` and a presentation layer (the CLI):
//!
//! - **Domain model** ([`model`]): [`Truck`], [`Position`], [`Settings`],
//!   [`WatchSet`], and the feed/GPS status enums.
//!
//! - **[`normalize`]**: Turns heterogeneous raw feed records into trucks,
//!   rejecting records without a plate or usable coordinates.
//!
//! - **[`Reconciler`]**: The context object holding the latest batch,
//!   position, settings, watch list, and alert history. `recompute()`
//!   derives the display list and fires proximity alerts at most once per
//!   truck per fetch cycle.
//!
//! - **[`Tracker`]**: Async driver: one-shot and streamed position fixes
//!   via a [`GeoSupplier`], non-overlapping periodic fetches from a
//!   [`TelemetrySource`], persistence through [`Preferences`], and
//!   `watch`/`broadcast` channels for subscribers.

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod geo;
pub mod model;
pub mod normalize;
pub mod notice;
pub mod prefs;
pub mod source;
pub mod tracker;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_FEED_URL, TlsVerification, TrackerConfig};
pub use distance::haversine_m;
pub use engine::{
    AlertHistory, GpsErrorOutcome, ProximityAlert, Reconciler, Selection,
};
pub use error::CoreError;
pub use geo::{
    ChannelGeo, FixedPosition, GeoError, GeoFeed, GeoOptions, GeoSupplier, PositionWatch,
    Unavailable,
};
pub use model::{
    ApiStatus, DEFAULT_CENTER, GpsStatus, Position, SettingChange, SettingName, Settings, Truck,
    WatchChange, WatchSet,
};
pub use normalize::{normalize_batch, normalize_record};
pub use notice::{Notice, NoticeLevel};
pub use prefs::{MemoryStore, Preferences, PreferencesStore};
pub use source::TelemetrySource;
pub use tracker::{RefreshOutcome, Tracker};
pub use view::{search, sort_for_display};
