#![allow(clippy::unwrap_used)]
// Integration tests for `Tracker`: refresh scheduling, failure handling,
// GPS fallback, and persistence, driven by a scripted telemetry source.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use truckwatch_api::RawRecord;
use truckwatch_core::{
    ApiStatus, ChannelGeo, CoreError, FixedPosition, GeoSupplier, GpsStatus, MemoryStore,
    Notice, Position, Preferences, RefreshOutcome, SettingChange, TelemetrySource, Tracker,
    TrackerConfig, Unavailable, WatchChange,
};

const HOME: Position = Position::new(22.6273, 120.3014);

// ── Helpers ─────────────────────────────────────────────────────────

/// Replays a fixed script of fetch results, repeating the last one.
struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<RawRecord>, String>>>,
    last: Mutex<Result<Vec<RawRecord>, String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: Vec<Result<Vec<RawRecord>, String>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    fn with_delay(script: Vec<Result<Vec<RawRecord>, String>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Ok(Vec::new())),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TelemetrySource for ScriptedSource {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<RawRecord>, CoreError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = script.pop_front() {
                *last = next;
            }
            last.clone()
        };
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            next.map_err(|message| CoreError::Feed {
                message,
                status: Some(503),
            })
        }
        .boxed()
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

fn record(value: Value) -> RawRecord {
    value.as_object().cloned().unwrap()
}

/// A truck roughly `meters` north of `HOME`.
fn truck_near(plate: &str, meters: f64) -> RawRecord {
    record(json!({
        "car": plate,
        "x": HOME.lng,
        "y": HOME.lat + meters / 111_195.0,
        "location": "Sanmin District",
    }))
}

fn tracker_with(
    source: Arc<dyn TelemetrySource>,
    geo: Arc<dyn GeoSupplier>,
    prefs: Preferences,
) -> Tracker {
    let config = TrackerConfig {
        fallback_center: HOME,
        ..TrackerConfig::default()
    };
    Tracker::new(config, source, geo, prefs)
}

fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn proximity_count(notices: &[Notice]) -> usize {
    notices
        .iter()
        .filter(|n| matches!(n, Notice::Proximity(_)))
        .count()
}

async fn wait_for_calls(source: &ScriptedSource, n: usize) {
    for _ in 0..1000 {
        if source.calls() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} fetches, saw {}", source.calls());
}

// ── Refresh semantics ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_overlapping_refresh_is_skipped() {
    let source = ScriptedSource::with_delay(
        vec![Ok(vec![truck_near("AAA-1", 50.0)])],
        Duration::from_secs(5),
    );
    let tracker = tracker_with(
        source.clone(),
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    tracker.locate().await;

    let (first, second) = tokio::join!(tracker.refresh(), tracker.refresh());
    assert_eq!(first.unwrap(), RefreshOutcome::Updated { trucks: 1 });
    assert_eq!(second.unwrap(), RefreshOutcome::Skipped);
    assert_eq!(source.calls(), 1);

    // The guard is released once the fetch completes.
    assert!(matches!(
        tracker.refresh().await.unwrap(),
        RefreshOutcome::Updated { .. }
    ));
}

#[tokio::test]
async fn test_failed_fetch_keeps_batch_and_alert_history() {
    let source = ScriptedSource::new(vec![
        Ok(vec![truck_near("AAA-1", 40.0), truck_near("BBB-2", 3000.0)]),
        Err("upstream down".into()),
        Ok(vec![truck_near("AAA-1", 40.0)]),
    ]);
    let tracker = tracker_with(
        source.clone(),
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    let mut notices = tracker.subscribe_notices();
    assert_eq!(tracker.locate().await, GpsStatus::Active);

    tracker.refresh().await.unwrap();
    assert_eq!(tracker.api_status(), ApiStatus::Success);
    let before = tracker.trucks_snapshot();
    assert_eq!(before.len(), 1);
    assert_eq!(proximity_count(&drain(&mut notices)), 1);

    let err = tracker.refresh().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(tracker.api_status(), ApiStatus::Error);
    assert_eq!(*tracker.trucks_snapshot(), *before);

    // Forcing a recompute must not re-alert: history survived the failure.
    tracker
        .change_setting(SettingChange::SearchRadius(1000))
        .await
        .unwrap();
    let after_failure = drain(&mut notices);
    assert!(after_failure.contains(&Notice::FetchFailed));
    assert_eq!(proximity_count(&after_failure), 0);

    // A successful fetch opens a new alert cycle.
    tracker.refresh().await.unwrap();
    assert_eq!(proximity_count(&drain(&mut notices)), 1);
}

#[tokio::test]
async fn test_muted_failure_is_silent() {
    let source = ScriptedSource::new(vec![Err("nope".into())]);
    let tracker = tracker_with(
        source,
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    assert!(tracker.toggle_mute().await.unwrap());
    let mut notices = tracker.subscribe_notices();

    assert!(tracker.refresh().await.is_err());
    assert!(drain(&mut notices).is_empty());
}

// ── Scheduling ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_poll_interval_change_reschedules_without_stacking() {
    let source = ScriptedSource::new(vec![Ok(vec![truck_near("AAA-1", 10.0)])]);
    let tracker = tracker_with(
        source.clone(),
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    tracker.start().await;
    wait_for_calls(&source, 1).await;
    assert_eq!(source.calls(), 1);

    tracker
        .change_setting(SettingChange::PollIntervalSecs(5))
        .await
        .unwrap();
    // New loop fetches right away, then every 5s. The old 30s loop is gone.
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(source.calls(), 1 + 7);

    tracker.shutdown().await;
    let settled = source.calls();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), settled);
}

#[tokio::test(start_paused = true)]
async fn test_polling_waits_for_gps() {
    let source = ScriptedSource::new(vec![Ok(vec![])]);
    let (geo, feed) = ChannelGeo::new();
    let tracker = tracker_with(source.clone(), Arc::new(geo), Preferences::in_memory());
    tracker.start().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.calls(), 0);
    assert_eq!(tracker.gps_status(), GpsStatus::Waiting);

    feed.push(HOME);
    wait_for_calls(&source, 1).await;
    assert_eq!(tracker.gps_status(), GpsStatus::Active);

    tracker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_abandons_in_flight_fetch() {
    let source = ScriptedSource::with_delay(vec![Ok(vec![])], Duration::from_secs(60));
    let tracker = tracker_with(
        source.clone(),
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    tracker.start().await;
    wait_for_calls(&source, 1).await;
    assert_eq!(tracker.api_status(), ApiStatus::Loading);

    let stopped = tokio::time::timeout(Duration::from_secs(1), tracker.shutdown()).await;
    assert!(stopped.is_ok(), "shutdown waited for the running fetch");
    assert_eq!(source.calls(), 1);
}

// ── GPS ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fallback_lists_trucks_but_never_alerts() {
    let source = ScriptedSource::new(vec![Ok(vec![
        truck_near("AAA-1", 30.0),
        truck_near("FAR-9", 9000.0),
    ])]);
    let tracker = tracker_with(source, Arc::new(Unavailable), Preferences::in_memory());
    let mut notices = tracker.subscribe_notices();

    assert_eq!(tracker.locate().await, GpsStatus::Fallback);
    assert_eq!(tracker.locate().await, GpsStatus::Fallback);
    tracker.refresh().await.unwrap();

    let ids: Vec<_> = tracker
        .trucks_snapshot()
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert_eq!(ids, vec!["AAA-1"]);

    let seen = drain(&mut notices);
    assert_eq!(
        seen.iter().filter(|n| **n == Notice::GpsFallback).count(),
        1
    );
    assert_eq!(proximity_count(&seen), 0);
}

// ── Watch list ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_watch_list_changes_persist_and_notify() {
    let store = Arc::new(MemoryStore::new());
    let source = ScriptedSource::new(vec![Ok(vec![truck_near("AAA-1", 9000.0)])]);
    let tracker = tracker_with(
        source,
        Arc::new(FixedPosition(HOME)),
        Preferences::from_shared(store.clone()),
    );
    let mut notices = tracker.subscribe_notices();
    tracker.locate().await;
    tracker.refresh().await.unwrap();
    assert!(tracker.trucks_snapshot().is_empty());

    assert_eq!(
        tracker.add_watch("aaa-1").await.unwrap(),
        WatchChange::Added("AAA-1".into())
    );
    assert_eq!(tracker.trucks_snapshot().len(), 1);
    assert!(matches!(
        tracker.add_watch("AAA-1").await,
        Err(CoreError::AlreadyWatched { .. })
    ));
    tracker.add_watch("GONE-7").await.unwrap();

    let reloaded = Preferences::from_shared(store).load_watch_set();
    assert_eq!(reloaded.iter().collect::<Vec<_>>(), vec!["AAA-1", "GONE-7"]);

    let seen = drain(&mut notices);
    assert!(seen.contains(&Notice::AlreadyWatched { id: "AAA-1".into() }));
    assert!(seen.contains(&Notice::WatchAdded {
        id: "GONE-7".into(),
        manual: true
    }));

    assert!(matches!(
        tracker.select("GONE-7").await,
        truckwatch_core::Selection::Offline(_)
    ));
    assert_eq!(
        tracker.toggle_watch("GONE-7").await.unwrap(),
        WatchChange::Removed("GONE-7".into())
    );
}

#[tokio::test]
async fn test_settings_load_from_preferences() {
    let prefs = Preferences::in_memory();
    prefs
        .save_setting(SettingChange::AlertRadius(100))
        .unwrap();
    let tracker = tracker_with(
        ScriptedSource::new(vec![]),
        Arc::new(FixedPosition(HOME)),
        prefs.clone(),
    );
    assert_eq!(tracker.settings().alert_radius_m, 100);

    assert!(
        tracker
            .change_setting(SettingChange::AlertRadius(123))
            .await
            .is_err()
    );
    assert_eq!(tracker.settings().alert_radius_m, 100);
    assert_eq!(prefs.load_settings().alert_radius_m, 100);
}

// ── Real feed client ────────────────────────────────────────────────

#[tokio::test]
async fn test_tracker_over_http_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "car": "kea-1234", "x": "120.3015", "y": "22.6274", "time": "2024-05-01 08:00:00" },
                { "car": "", "x": "120.3", "y": "22.6" },
                { "plateNumber": "KEA-5678", "lng": 120.302, "lat": 22.628 }
            ]
        })))
        .mount(&server)
        .await;

    let config = TrackerConfig {
        feed_url: Url::parse(&server.uri()).unwrap(),
        ..TrackerConfig::default()
    };
    let source = Arc::new(config.feed_client().unwrap());
    let tracker = Tracker::new(
        config,
        source,
        Arc::new(FixedPosition(HOME)),
        Preferences::in_memory(),
    );
    tracker.locate().await;

    assert_eq!(
        tracker.refresh().await.unwrap(),
        RefreshOutcome::Updated { trucks: 2 }
    );
    let found = tracker.search("kea-12");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].plate_number, "KEA-1234");
}
