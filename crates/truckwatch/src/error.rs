//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use truckwatch_config::ConfigError;
use truckwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Feed ─────────────────────────────────────────────────────────

    #[error("Could not reach the telemetry feed at {url}")]
    #[diagnostic(
        code(truckwatch::connection_failed),
        help(
            "Check your network connection and the feed URL.\n\
             URL: {url}\n\
             Override it with --feed-url or [feed] url in the config file."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS certificate verification failed")]
    #[diagnostic(
        code(truckwatch::tls_error),
        help(
            "The feed is using a certificate the system does not trust.\n\
             Use --insecure (-k) to accept it, or set [feed] ca_cert in the config file."
        )
    )]
    TlsError { reason: String },

    #[error("Telemetry feed error: {message}")]
    #[diagnostic(
        code(truckwatch::feed_error),
        help("The feed answered but not with usable data. It may be down; try again later.")
    )]
    Feed { message: String },

    // ── Watch list ───────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(truckwatch::not_found),
        help("Run: truckwatch {list_command} to see what is there")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(truckwatch::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(truckwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration & storage ──────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(truckwatch::config),
        help("Check the config file syntax and TRUCKWATCH_* environment variables.")
    )]
    Config(Box<figment::Error>),

    #[error("Could not save preferences: {message}")]
    #[diagnostic(code(truckwatch::storage))]
    Storage { message: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(truckwatch::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } | Self::Feed { .. } => {
                exit_code::CONNECTION
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            Self::Storage { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } if url.is_empty() => {
                CliError::TlsError { reason }
            }
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Feed { message, status: _ } => CliError::Feed { message },
            CoreError::AlreadyWatched { id } => CliError::Conflict {
                resource_type: "watched truck".into(),
                identifier: id,
            },
            CoreError::NotWatched { id } => CliError::NotFound {
                resource_type: "watched truck".into(),
                identifier: id,
                list_command: "watch list".into(),
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Storage { message } => CliError::Storage { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
