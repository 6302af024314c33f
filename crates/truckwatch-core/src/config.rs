// ── Tracker configuration ──
//
// Runtime settings the tracker needs that are not user preferences:
// where the feed lives, how to reach it, and where to stand when the
// device has no position.

use std::path::PathBuf;
use std::time::Duration;

use truckwatch_api::{FeedClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;
use crate::model::{DEFAULT_CENTER, Position};

/// Kaohsiung City open-data garbage truck positions.
pub const DEFAULT_FEED_URL: &str =
    "https://api.kcg.gov.tw/api/service/Get/aaf4ce4b-4ca8-43de-bfaf-6dc97e89cac0";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS certificate verification policy for the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    #[default]
    SystemDefaults,
    CustomCa(PathBuf),
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub feed_url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Reference point used when no GPS fix was ever obtained.
    pub fallback_center: Position,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            fallback_center: DEFAULT_CENTER,
        }
    }
}

impl TrackerConfig {
    /// Build the HTTP feed client described by this config.
    pub fn feed_client(&self) -> Result<FeedClient, CoreError> {
        let transport = TransportConfig {
            tls: TlsMode::from(&self.tls),
            ..TransportConfig::default()
        }
        .with_timeout(self.timeout);
        Ok(FeedClient::new(self.feed_url.clone(), &transport)?)
    }
}

/// Parsed form of [`DEFAULT_FEED_URL`].
pub fn default_feed_url() -> Url {
    Url::parse(DEFAULT_FEED_URL).expect("default feed URL is valid")
}
