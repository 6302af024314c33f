// ── Preferences store ──
//
// Durable key/value storage for settings and the watch list. Every
// setting is stored under its own key so a single write never touches the
// others. Invalid or missing values read back as the compiled-in default.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{SettingChange, Settings, WatchSet};

pub const POLL_INTERVAL_KEY: &str = "poll_interval_ms";
pub const SEARCH_RADIUS_KEY: &str = "search_radius_m";
pub const ALERT_RADIUS_KEY: &str = "alert_radius_m";
pub const MUTED_KEY: &str = "muted";
pub const WATCHED_TRUCKS_KEY: &str = "watched_trucks";

/// Raw key/value persistence backend.
pub trait PreferencesStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), CoreError>;
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferencesStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Typed view over a [`PreferencesStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferencesStore>,
}

impl Preferences {
    pub fn new(store: impl PreferencesStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<dyn PreferencesStore>) -> Self {
        Self { store }
    }

    /// Ephemeral preferences backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Read all settings, substituting defaults for anything missing or
    /// outside its legal set.
    pub fn load_settings(&self) -> Settings {
        let defaults = Settings::default();
        let mut settings = defaults;

        if let Some(ms) = self.read_u64(POLL_INTERVAL_KEY) {
            settings = apply_or_default(settings, POLL_INTERVAL_KEY, || {
                (ms % 1000 == 0).then_some(SettingChange::PollIntervalSecs(ms / 1000))
            });
        }
        if let Some(m) = self.read_u64(SEARCH_RADIUS_KEY) {
            settings = apply_or_default(settings, SEARCH_RADIUS_KEY, || {
                u32::try_from(m).ok().map(SettingChange::SearchRadius)
            });
        }
        if let Some(m) = self.read_u64(ALERT_RADIUS_KEY) {
            settings = apply_or_default(settings, ALERT_RADIUS_KEY, || {
                u32::try_from(m).ok().map(SettingChange::AlertRadius)
            });
        }
        match self.store.get(MUTED_KEY) {
            Some(Value::Bool(muted)) => settings.muted = muted,
            Some(other) => warn!(key = MUTED_KEY, value = %other, "ignoring stored value"),
            None => {}
        }

        debug!(?settings, "loaded settings");
        settings
    }

    /// Read the watch list. Non-string entries are skipped and duplicates
    /// collapse.
    pub fn load_watch_set(&self) -> WatchSet {
        match self.store.get(WATCHED_TRUCKS_KEY) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(other) => {
                warn!(key = WATCHED_TRUCKS_KEY, value = %other, "ignoring stored watch list");
                WatchSet::new()
            }
            None => WatchSet::new(),
        }
    }

    /// Persist only the key touched by `change`.
    pub fn save_setting(&self, change: SettingChange) -> Result<(), CoreError> {
        let (key, value) = match change {
            SettingChange::PollIntervalSecs(secs) => {
                (POLL_INTERVAL_KEY, Value::from(secs.saturating_mul(1000)))
            }
            SettingChange::SearchRadius(m) => (SEARCH_RADIUS_KEY, Value::from(m)),
            SettingChange::AlertRadius(m) => (ALERT_RADIUS_KEY, Value::from(m)),
            SettingChange::Muted(muted) => (MUTED_KEY, Value::Bool(muted)),
        };
        self.store.set(key, value)
    }

    pub fn save_watch_set(&self, watched: &WatchSet) -> Result<(), CoreError> {
        let ids = watched.iter().map(Value::from).collect();
        self.store.set(WATCHED_TRUCKS_KEY, Value::Array(ids))
    }

    fn read_u64(&self, key: &str) -> Option<u64> {
        let value = self.store.get(key)?;
        let parsed = match &value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if parsed.is_none() {
            warn!(key, value = %value, "ignoring stored value");
        }
        parsed
    }
}

fn apply_or_default(
    settings: Settings,
    key: &str,
    change: impl FnOnce() -> Option<SettingChange>,
) -> Settings {
    change()
        .and_then(|c| settings.with_change(c).ok())
        .unwrap_or_else(|| {
            warn!(key, "stored value is not a legal option, using default");
            settings
        })
}
