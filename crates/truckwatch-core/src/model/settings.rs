// ── User settings ──
//
// Each setting has a small fixed set of legal values. Anything outside
// that set is rejected at the boundary so the persisted value is always
// one the engine understands.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;

/// Legal refresh intervals, in seconds.
pub const POLL_INTERVAL_OPTIONS_SECS: [u64; 6] = [5, 15, 30, 60, 120, 300];
/// Legal search radii, in meters.
pub const SEARCH_RADIUS_OPTIONS_M: [u32; 6] = [100, 200, 500, 1000, 2000, 5000];
/// Legal proximity-alert radii, in meters.
pub const ALERT_RADIUS_OPTIONS_M: [u32; 6] = [50, 100, 200, 300, 500, 1000];

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_SEARCH_RADIUS_M: u32 = 500;
const DEFAULT_ALERT_RADIUS_M: u32 = 500;

/// User-controlled knobs, each persisted independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub search_radius_m: u32,
    pub alert_radius_m: u32,
    pub muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_SECS * 1000,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            alert_radius_m: DEFAULT_ALERT_RADIUS_M,
            muted: false,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Return a copy with `change` applied, or a validation error if the
    /// value is not one of the legal options. `self` is never modified.
    pub fn with_change(&self, change: SettingChange) -> Result<Self, CoreError> {
        change.validate()?;
        let mut next = *self;
        match change {
            SettingChange::PollIntervalSecs(secs) => next.poll_interval_ms = secs * 1000,
            SettingChange::SearchRadius(m) => next.search_radius_m = m,
            SettingChange::AlertRadius(m) => next.alert_radius_m = m,
            SettingChange::Muted(muted) => next.muted = muted,
        }
        Ok(next)
    }
}

/// Setting names as accepted on the command line and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SettingName {
    PollInterval,
    SearchRadius,
    AlertRadius,
    Muted,
}

/// A single validated-on-apply setting change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    PollIntervalSecs(u64),
    SearchRadius(u32),
    AlertRadius(u32),
    Muted(bool),
}

impl SettingChange {
    /// Parse a textual value for the named setting.
    ///
    /// Numeric settings take a bare integer (seconds or meters); `muted`
    /// takes `true/false`, `on/off`, or `yes/no`.
    pub fn parse(name: SettingName, raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        let invalid = || CoreError::ValidationFailed {
            message: format!("'{raw}' is not a valid value for {name}"),
        };
        let change = match name {
            SettingName::PollInterval => Self::PollIntervalSecs(raw.parse().map_err(|_| invalid())?),
            SettingName::SearchRadius => Self::SearchRadius(raw.parse().map_err(|_| invalid())?),
            SettingName::AlertRadius => Self::AlertRadius(raw.parse().map_err(|_| invalid())?),
            SettingName::Muted => Self::Muted(parse_flag(raw).ok_or_else(invalid)?),
        };
        change.validate()?;
        Ok(change)
    }

    pub fn name(&self) -> SettingName {
        match self {
            Self::PollIntervalSecs(_) => SettingName::PollInterval,
            Self::SearchRadius(_) => SettingName::SearchRadius,
            Self::AlertRadius(_) => SettingName::AlertRadius,
            Self::Muted(_) => SettingName::Muted,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        let ok = match *self {
            Self::PollIntervalSecs(secs) => POLL_INTERVAL_OPTIONS_SECS.contains(&secs),
            Self::SearchRadius(m) => SEARCH_RADIUS_OPTIONS_M.contains(&m),
            Self::AlertRadius(m) => ALERT_RADIUS_OPTIONS_M.contains(&m),
            Self::Muted(_) => true,
        };
        if ok {
            Ok(())
        } else {
            Err(CoreError::ValidationFailed {
                message: format!(
                    "unsupported {}; expected one of {}",
                    self.name(),
                    legal_values(self.name())
                ),
            })
        }
    }
}

/// Human-readable list of legal values for a setting.
pub fn legal_values(name: SettingName) -> String {
    fn join<T: ToString>(opts: &[T]) -> String {
        opts.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
    match name {
        SettingName::PollInterval => join(&POLL_INTERVAL_OPTIONS_SECS),
        SettingName::SearchRadius => join(&SEARCH_RADIUS_OPTIONS_M),
        SettingName::AlertRadius => join(&ALERT_RADIUS_OPTIONS_M),
        SettingName::Muted => "true, false".into(),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_legal_options() {
        let s = Settings::default();
        assert!(POLL_INTERVAL_OPTIONS_SECS.contains(&(s.poll_interval_ms / 1000)));
        assert!(SEARCH_RADIUS_OPTIONS_M.contains(&s.search_radius_m));
        assert!(ALERT_RADIUS_OPTIONS_M.contains(&s.alert_radius_m));
        assert!(!s.muted);
    }

    #[test]
    fn with_change_rejects_illegal_values_and_keeps_original() {
        let s = Settings::default();
        let err = s.with_change(SettingChange::SearchRadius(750)).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn with_change_applies_legal_values() {
        let s = Settings::default()
            .with_change(SettingChange::PollIntervalSecs(60))
            .unwrap()
            .with_change(SettingChange::Muted(true))
            .unwrap();
        assert_eq!(s.poll_interval(), Duration::from_secs(60));
        assert!(s.muted);
    }

    #[test]
    fn parse_setting_names_and_values() {
        let name: SettingName = "search-radius".parse().unwrap();
        assert_eq!(
            SettingChange::parse(name, "1000").unwrap(),
            SettingChange::SearchRadius(1000)
        );
        assert_eq!(
            SettingChange::parse(SettingName::Muted, "Off").unwrap(),
            SettingChange::Muted(false)
        );
        assert!(SettingChange::parse(SettingName::AlertRadius, "75").is_err());
        assert!(SettingChange::parse(SettingName::PollInterval, "soon").is_err());
    }
}
