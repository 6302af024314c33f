//! Async client for municipal garbage-truck telemetry feeds.
//!
//! The feed payload is not contractually fixed, so this crate deliberately
//! stops at "a flat list of loosely-typed records". Normalization into
//! typed trucks happens in `truckwatch-core`.
//!
//! - **[`FeedClient`]** issues the HTTP request and unwraps the envelope.
//! - **[`unwrap_records`]** locates the record array in any known shape.
//! - **[`TransportConfig`]** carries TLS and timeout settings.

pub mod envelope;
pub mod error;
pub mod feed;
pub mod transport;

pub use envelope::{RawRecord, unwrap_records};
pub use error::Error;
pub use feed::FeedClient;
pub use transport::{TlsMode, TransportConfig};
