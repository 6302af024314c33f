// ── Device position supply ──
//
// The engine never talks to a GPS device directly. A `GeoSupplier` hands
// out one-shot fixes and, where the platform supports it, a continuous
// stream of fixes that can be cancelled.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::model::Position;

const WATCH_BUFFER: usize = 16;

/// Why a position could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    Unavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

/// Request knobs passed to the supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the caller will accept.
    pub max_age: Duration,
}

impl GeoOptions {
    /// Initial fix at startup.
    pub const ONE_SHOT: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(10),
        max_age: Duration::from_secs(60),
    };

    /// Continuous tracking.
    pub const WATCH: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(10),
        max_age: Duration::from_secs(15),
    };
}

/// Source of device positions.
pub trait GeoSupplier: Send + Sync {
    /// Request a single fix.
    fn get_once(&self, opts: GeoOptions) -> BoxFuture<'_, Result<Position, GeoError>>;

    /// Subscribe to continuous fixes. `None` when the supplier has no
    /// stream to offer.
    fn watch(&self, opts: GeoOptions) -> Option<PositionWatch>;
}

/// Live subscription to position updates. Dropping it releases the
/// subscription.
#[derive(Debug)]
pub struct PositionWatch {
    rx: mpsc::Receiver<Result<Position, GeoError>>,
    cancel: CancellationToken,
}

impl PositionWatch {
    pub fn new(
        rx: mpsc::Receiver<Result<Position, GeoError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { rx, cancel }
    }

    /// Next fix or failure. `None` once cancelled or the producer is gone.
    pub async fn next(&mut self) -> Option<Result<Position, GeoError>> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Fixed position ───────────────────────────────────────────────────

/// Always reports the same position. Offers no stream.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

impl GeoSupplier for FixedPosition {
    fn get_once(&self, _opts: GeoOptions) -> BoxFuture<'_, Result<Position, GeoError>> {
        let position = self.0;
        async move { Ok(position) }.boxed()
    }

    fn watch(&self, _opts: GeoOptions) -> Option<PositionWatch> {
        None
    }
}

// ── No location service ──────────────────────────────────────────────

/// A device without positioning. Every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl GeoSupplier for Unavailable {
    fn get_once(&self, _opts: GeoOptions) -> BoxFuture<'_, Result<Position, GeoError>> {
        async { Err(GeoError::Unavailable) }.boxed()
    }

    fn watch(&self, _opts: GeoOptions) -> Option<PositionWatch> {
        None
    }
}

// ── Channel-fed supplier ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Sample {
    reading: Result<Position, GeoError>,
    at: Instant,
}

/// Producer half of a [`ChannelGeo`].
#[derive(Debug, Clone)]
pub struct GeoFeed {
    tx: watch::Sender<Option<Sample>>,
}

impl GeoFeed {
    pub fn push(&self, position: Position) {
        self.send(Ok(position));
    }

    pub fn fail(&self, error: GeoError) {
        self.send(Err(error));
    }

    fn send(&self, reading: Result<Position, GeoError>) {
        trace!(?reading, "geo sample");
        self.tx.send_replace(Some(Sample {
            reading,
            at: Instant::now(),
        }));
    }
}

/// Supplier fed by an external producer through a [`GeoFeed`].
#[derive(Debug, Clone)]
pub struct ChannelGeo {
    rx: watch::Receiver<Option<Sample>>,
}

impl ChannelGeo {
    pub fn new() -> (Self, GeoFeed) {
        let (tx, rx) = watch::channel(None);
        (Self { rx }, GeoFeed { tx })
    }
}

fn fresh(sample: Option<&Sample>, max_age: Duration) -> Option<Result<Position, GeoError>> {
    sample
        .filter(|s| s.at.elapsed() <= max_age)
        .map(|s| s.reading.clone())
}

impl GeoSupplier for ChannelGeo {
    fn get_once(&self, opts: GeoOptions) -> BoxFuture<'_, Result<Position, GeoError>> {
        let mut rx = self.rx.clone();
        async move {
            let cached = fresh(rx.borrow_and_update().as_ref(), opts.max_age);
            if let Some(Ok(position)) = cached {
                return Ok(position);
            }
            match tokio::time::timeout(opts.timeout, rx.changed()).await {
                Err(_) => Err(GeoError::Timeout),
                Ok(Err(_)) => Err(GeoError::Unavailable),
                Ok(Ok(())) => rx
                    .borrow_and_update()
                    .as_ref()
                    .map_or(Err(GeoError::Unavailable), |s| s.reading.clone()),
            }
        }
        .boxed()
    }

    fn watch(&self, opts: GeoOptions) -> Option<PositionWatch> {
        let mut rx = self.rx.clone();
        let (tx, out) = mpsc::channel(WATCH_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let initial = fresh(rx.borrow_and_update().as_ref(), opts.max_age);
            if let Some(reading) = initial {
                if tx.send(reading).await.is_err() {
                    return;
                }
            }
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let reading = rx.borrow_and_update().as_ref().map(|s| s.reading.clone());
                        let Some(reading) = reading else { continue };
                        if tx.send(reading).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("position watch released");
        });

        Some(PositionWatch::new(out, cancel))
    }
}
