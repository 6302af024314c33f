// ── Telemetry source ──

use futures_util::future::{BoxFuture, FutureExt};
use truckwatch_api::{FeedClient, RawRecord};

use crate::error::CoreError;

/// Anything that can produce one batch of raw truck records per call.
pub trait TelemetrySource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<RawRecord>, CoreError>>;

    /// Where the records come from, for logs and error messages.
    fn describe(&self) -> String;
}

impl TelemetrySource for FeedClient {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<RawRecord>, CoreError>> {
        async move { self.fetch_batch().await.map_err(CoreError::from) }.boxed()
    }

    fn describe(&self) -> String {
        self.url().to_string()
    }
}
