// ── Domain model ──

pub mod position;
pub mod settings;
pub mod status;
pub mod truck;
pub mod watch_set;

pub use position::{DEFAULT_CENTER, Position};
pub use settings::{
    ALERT_RADIUS_OPTIONS_M, POLL_INTERVAL_OPTIONS_SECS, SEARCH_RADIUS_OPTIONS_M, SettingChange,
    SettingName, Settings, legal_values,
};
pub use status::{ApiStatus, GpsStatus};
pub use truck::{
    DEFAULT_STATUS, EPOCH_TIMESTAMP, OFFLINE_STATUS, PLACEHOLDER_LOCATION, Truck,
    UNKNOWN_LOCATION,
};
pub use watch_set::{WatchChange, WatchSet, normalize_id};
