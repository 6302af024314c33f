// ── Tracker ──
//
// Async driver around the `Reconciler`. Owns the refresh schedule, the
// position subscription, persistence of user choices, and publication of
// the display list, statuses, and notices to whoever is watching.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::engine::{GpsErrorOutcome, Reconciler, Selection};
use crate::error::CoreError;
use crate::geo::{GeoError, GeoOptions, GeoSupplier, PositionWatch};
use crate::model::{
    ApiStatus, GpsStatus, Position, SettingChange, Settings, Truck, WatchChange, WatchSet,
};
use crate::normalize::normalize_batch;
use crate::notice::Notice;
use crate::prefs::Preferences;
use crate::source::TelemetrySource;
use crate::view;

const NOTICE_CHANNEL_SIZE: usize = 64;

/// What a call to [`Tracker::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new batch replaced the old one.
    Updated { trucks: usize },
    /// Another fetch was already running; nothing happened.
    Skipped,
}

// ── Tracker ──────────────────────────────────────────────────────────

/// Live tracking session.
///
/// Cheaply cloneable via `Arc<TrackerInner>`. Call [`start()`](Self::start)
/// to begin locating and polling, and [`shutdown()`](Self::shutdown) to
/// stop every background task.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    source: Arc<dyn TelemetrySource>,
    geo: Arc<dyn GeoSupplier>,
    prefs: Preferences,
    engine: Mutex<Reconciler>,
    trucks: watch::Sender<Arc<Vec<Truck>>>,
    api_status: watch::Sender<ApiStatus>,
    gps_status: watch::Sender<GpsStatus>,
    settings: watch::Sender<Settings>,
    notice_tx: broadcast::Sender<Notice>,
    /// Set while a fetch is running; overlapping refreshes are skipped.
    in_flight: AtomicBool,
    cancel: CancellationToken,
    /// Token of the running refresh loop. `None` until GPS settles.
    refresh_cancel: Mutex<Option<CancellationToken>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
    /// Build a tracker with settings and watch list read from `prefs`.
    /// Nothing runs until [`start()`](Self::start).
    pub fn new(
        config: TrackerConfig,
        source: Arc<dyn TelemetrySource>,
        geo: Arc<dyn GeoSupplier>,
        prefs: Preferences,
    ) -> Self {
        let settings = prefs.load_settings();
        let watched = prefs.load_watch_set();
        let engine = Reconciler::new(settings, watched).with_fallback_center(config.fallback_center);

        let (trucks, _) = watch::channel(Arc::new(Vec::new()));
        let (api_status, _) = watch::channel(ApiStatus::Idle);
        let (gps_status, _) = watch::channel(GpsStatus::Waiting);
        let (settings, _) = watch::channel(settings);
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);

        Self {
            inner: Arc::new(TrackerInner {
                config,
                source,
                geo,
                prefs,
                engine: Mutex::new(engine),
                trucks,
                api_status,
                gps_status,
                settings,
                notice_tx,
                in_flight: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                refresh_cancel: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Request a first fix, subscribe to position updates, and start
    /// polling once the GPS status leaves `Waiting`.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        let cancel = self.inner.cancel.clone();

        {
            let tracker = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {}
                    _ = tracker.locate() => {}
                }
            }));
        }

        if let Some(stream) = self.inner.geo.watch(GeoOptions::WATCH) {
            let tracker = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(position_task(tracker, stream, cancel)));
        } else {
            debug!("geo supplier offers no position stream");
        }

        {
            let tracker = self.clone();
            handles.push(tokio::spawn(schedule_task(tracker, cancel)));
        }

        info!(feed = %self.inner.source.describe(), "tracker started");
    }

    /// Request a single fix and apply the result.
    pub async fn locate(&self) -> GpsStatus {
        match self.inner.geo.get_once(GeoOptions::ONE_SHOT).await {
            Ok(position) => self.apply_position(position).await,
            Err(e) => self.apply_gps_error(&e).await,
        }
        self.gps_status()
    }

    /// Stop every background task and release the position subscription.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        loop {
            let handles = std::mem::take(&mut *self.inner.task_handles.lock().await);
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
        debug!("tracker shut down");
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Fetch one batch and reconcile it.
    ///
    /// Returns `Skipped` without fetching when another refresh is still
    /// running. On failure the previous batch and alert history are kept.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let Some(_guard) = InFlight::acquire(&self.inner.in_flight) else {
            debug!("refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        self.inner.api_status.send_replace(ApiStatus::Loading);
        match self.inner.source.fetch().await {
            Ok(records) => {
                let trucks = normalize_batch(&records, Utc::now());
                let count = trucks.len();
                debug!(records = records.len(), trucks = count, "fetched telemetry");
                {
                    let mut engine = self.inner.engine.lock().await;
                    engine.apply_batch(trucks);
                    self.publish(&mut engine);
                }
                self.inner.api_status.send_replace(ApiStatus::Success);
                Ok(RefreshOutcome::Updated { trucks: count })
            }
            Err(e) => {
                warn!(error = %e, feed = %self.inner.source.describe(), "telemetry fetch failed");
                self.inner.api_status.send_replace(ApiStatus::Error);
                if !self.settings().muted {
                    self.notify(Notice::FetchFailed);
                }
                Err(e)
            }
        }
    }

    async fn start_refresh_loop(&self) {
        let period = self.settings().poll_interval();
        let token = self.inner.cancel.child_token();
        {
            let mut current = self.inner.refresh_cancel.lock().await;
            if let Some(old) = current.replace(token.clone()) {
                old.cancel();
            }
        }
        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(tokio::spawn(refresh_task(self.clone(), period, token)));
        debug!(interval_secs = period.as_secs(), "refresh loop scheduled");
    }

    // ── Position ─────────────────────────────────────────────────────

    async fn apply_position(&self, position: Position) {
        let mut engine = self.inner.engine.lock().await;
        if engine.apply_position(position) {
            self.publish(&mut engine);
        }
    }

    async fn apply_gps_error(&self, error: &GeoError) {
        let mut engine = self.inner.engine.lock().await;
        match engine.apply_gps_error() {
            GpsErrorOutcome::Fallback { first_notice } => {
                warn!(
                    error = %error,
                    center = %self.inner.config.fallback_center,
                    "no GPS fix, using default location"
                );
                if first_notice {
                    self.notify(Notice::GpsFallback);
                }
            }
            GpsErrorOutcome::Transient => {
                warn!(error = %error, "GPS signal lost, keeping last position");
                self.notify(Notice::GpsLost);
            }
        }
        self.publish(&mut engine);
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Apply and persist one setting. An illegal value is rejected and the
    /// previous value stays in force.
    pub async fn change_setting(&self, change: SettingChange) -> Result<Settings, CoreError> {
        let (before, after) = {
            let mut engine = self.inner.engine.lock().await;
            let before = *engine.settings();
            let after = engine.apply_setting(change)?;
            self.publish(&mut engine);
            (before, after)
        };

        if let Err(e) = self.inner.prefs.save_setting(change) {
            warn!(error = %e, setting = %change.name(), "failed to persist setting");
        }
        self.inner.settings.send_replace(after);

        if before.muted != after.muted {
            self.notify(if after.muted {
                Notice::Muted
            } else {
                Notice::Unmuted
            });
        }
        if before.poll_interval_ms != after.poll_interval_ms {
            let running = self.inner.refresh_cancel.lock().await.is_some();
            if running && !self.inner.cancel.is_cancelled() {
                self.start_refresh_loop().await;
            }
        }
        Ok(after)
    }

    /// Flip the mute flag. Returns the new value.
    pub async fn toggle_mute(&self) -> Result<bool, CoreError> {
        let muted = !self.settings().muted;
        self.change_setting(SettingChange::Muted(muted)).await?;
        Ok(muted)
    }

    // ── Watch list ───────────────────────────────────────────────────

    pub async fn toggle_watch(&self, id: &str) -> Result<WatchChange, CoreError> {
        self.mutate_watch(|engine| engine.toggle_watch(id), false).await
    }

    /// Add a plate typed by the user. Already-watched plates are reported
    /// rather than toggled off.
    pub async fn add_watch(&self, id: &str) -> Result<WatchChange, CoreError> {
        self.mutate_watch(|engine| engine.add_watch(id), true).await
    }

    pub async fn remove_watch(&self, id: &str) -> Result<WatchChange, CoreError> {
        self.mutate_watch(|engine| engine.remove_watch(id), false).await
    }

    async fn mutate_watch(
        &self,
        op: impl FnOnce(&mut Reconciler) -> Result<WatchChange, CoreError>,
        manual: bool,
    ) -> Result<WatchChange, CoreError> {
        let mut engine = self.inner.engine.lock().await;
        let muted = engine.settings().muted;
        let change = match op(&mut engine) {
            Ok(change) => change,
            Err(CoreError::AlreadyWatched { id }) => {
                if !muted {
                    self.notify(Notice::AlreadyWatched { id: id.clone() });
                }
                return Err(CoreError::AlreadyWatched { id });
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.inner.prefs.save_watch_set(engine.watched()) {
            warn!(error = %e, "failed to persist watch list");
        }
        self.publish(&mut engine);
        drop(engine);

        if !muted {
            self.notify(match &change {
                WatchChange::Added(id) => Notice::WatchAdded {
                    id: id.clone(),
                    manual,
                },
                WatchChange::Removed(id) => Notice::WatchRemoved { id: id.clone() },
            });
        }
        Ok(change)
    }

    pub async fn watched(&self) -> WatchSet {
        self.inner.engine.lock().await.watched().clone()
    }

    // ── Selection and search ─────────────────────────────────────────

    /// Select a truck from the display list. Offline trucks stay selectable
    /// but cannot be located.
    pub async fn select(&self, id: &str) -> Selection {
        let selection = self.inner.engine.lock().await.select(id);
        if let Selection::Offline(id) = &selection {
            self.notify(Notice::OfflineSelected { id: id.clone() });
        }
        selection
    }

    /// Current display list narrowed by `text`.
    pub fn search(&self, text: &str) -> Vec<Truck> {
        let trucks = self.trucks_snapshot();
        view::search(&trucks, text).into_iter().cloned().collect()
    }

    // ── Snapshots and subscriptions ──────────────────────────────────

    pub fn trucks_snapshot(&self) -> Arc<Vec<Truck>> {
        self.inner.trucks.borrow().clone()
    }

    pub fn subscribe_trucks(&self) -> watch::Receiver<Arc<Vec<Truck>>> {
        self.inner.trucks.subscribe()
    }

    pub fn api_status(&self) -> ApiStatus {
        *self.inner.api_status.borrow()
    }

    pub fn subscribe_api_status(&self) -> watch::Receiver<ApiStatus> {
        self.inner.api_status.subscribe()
    }

    pub fn gps_status(&self) -> GpsStatus {
        *self.inner.gps_status.borrow()
    }

    pub fn subscribe_gps_status(&self) -> watch::Receiver<GpsStatus> {
        self.inner.gps_status.subscribe()
    }

    pub fn settings(&self) -> Settings {
        *self.inner.settings.borrow()
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<Settings> {
        self.inner.settings.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Recompute and push the results to subscribers.
    fn publish(&self, engine: &mut Reconciler) {
        let alerts = engine.recompute();
        let display = engine.display();
        self.inner.trucks.send_if_modified(|current| {
            if current.as_slice() == display {
                false
            } else {
                *current = Arc::new(display.to_vec());
                true
            }
        });
        self.inner.gps_status.send_if_modified(|current| {
            let changed = *current != engine.gps_status();
            *current = engine.gps_status();
            changed
        });
        for alert in alerts {
            info!(truck = %alert.truck_id, distance_m = alert.distance_m, "proximity alert");
            self.notify(Notice::Proximity(alert));
        }
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.inner.notice_tx.send(notice);
    }
}

// ── In-flight guard ──────────────────────────────────────────────────

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Wait for the first GPS outcome, then start polling.
async fn schedule_task(tracker: Tracker, cancel: CancellationToken) {
    let mut gps = tracker.subscribe_gps_status();
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        located = wait_until_located(&mut gps) => {
            if !located {
                return;
            }
        }
    }
    tracker.start_refresh_loop().await;
}

async fn wait_until_located(rx: &mut watch::Receiver<GpsStatus>) -> bool {
    rx.wait_for(GpsStatus::is_located)
        .await
        .is_ok()
}

/// Fetch immediately, then once per `period` until cancelled.
///
/// A reschedule lets the running fetch finish; shutdown abandons it.
async fn refresh_task(tracker: Tracker, period: Duration, cancel: CancellationToken) {
    let shutdown = tracker.inner.cancel.clone();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let result = tokio::select! {
                    biased;
                    () = shutdown.cancelled() => break,
                    result = tracker.refresh() => result,
                };
                if let Err(e) = result {
                    debug!(error = %e, transient = e.is_transient(), "periodic refresh failed");
                }
            }
        }
    }
}

/// Forward streamed fixes into the engine until cancelled.
async fn position_task(
    tracker: Tracker,
    mut stream: PositionWatch,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = stream.next() => match item {
                Some(Ok(position)) => tracker.apply_position(position).await,
                Some(Err(e)) => tracker.apply_gps_error(&e).await,
                None => break,
            },
        }
    }
    stream.cancel();
    debug!("position subscription released");
}
