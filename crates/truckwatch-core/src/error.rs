// ── Core error types ──
//
// User-facing errors from truckwatch-core. These are NOT feed-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<truckwatch_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Feed errors ──────────────────────────────────────────────────
    #[error("Cannot reach telemetry feed at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Telemetry feed timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Telemetry feed error: {message}")]
    Feed {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Watch-list errors ────────────────────────────────────────────
    #[error("Truck {id} is already on the watch list")]
    AlreadyWatched { id: String },

    #[error("Truck {id} is not on the watch list")]
    NotWatched { id: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("Preferences storage error: {message}")]
    Storage { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the next scheduled refresh may succeed on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Feed { status, .. } => status.is_some_and(|s| s >= 500 || s == 429),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<truckwatch_api::Error> for CoreError {
    fn from(err: truckwatch_api::Error) -> Self {
        match err {
            truckwatch_api::Error::Transport(ref e) => {
                if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Feed {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            truckwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid feed URL: {e}"),
            },
            truckwatch_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            truckwatch_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            truckwatch_api::Error::Http {
                status,
                body_preview,
            } => CoreError::Feed {
                message: format!("HTTP {status}: {body_preview}"),
                status: Some(status),
            },
            truckwatch_api::Error::Deserialization { message, body: _ } => CoreError::Feed {
                message: format!("malformed payload: {message}"),
                status: None,
            },
        }
    }
}
