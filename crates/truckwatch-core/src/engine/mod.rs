// ── Reconciliation engine ──
//
// `Reconciler` is the single context object that owns every piece of
// mutable tracking state: latest batch, reference position, GPS status,
// settings, watch set, and alert history. All mutation goes through its
// methods; `recompute()` then rebuilds the display list and evaluates
// alerts from that settled state.

mod alerts;
mod reconcile;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::model::{
    DEFAULT_CENTER, GpsStatus, Position, SettingChange, Settings, Truck, WatchChange, WatchSet,
    normalize_id,
};

pub use alerts::{AlertHistory, ProximityAlert, evaluate_alerts};
pub use reconcile::{ReconcileInput, reconcile};

/// What a geolocation failure did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsErrorOutcome {
    /// No fix was ever obtained; the default center now stands in.
    /// `first_notice` is `true` only the first time this happens.
    Fallback { first_notice: bool },
    /// A fix was known before; it is kept and the failure is transient.
    Transient,
}

/// Result of selecting a truck from the display list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "truck", rename_all = "lowercase")]
pub enum Selection {
    /// Online truck; the presentation layer may recenter on it.
    Online(Truck),
    /// Offline placeholder; highlight only, there is no real position.
    Offline(String),
    /// Not in the current display list; nothing changes.
    NotFound,
}

/// Authoritative tracking state plus the last computed display list.
#[derive(Debug, Clone)]
pub struct Reconciler {
    batch: IndexMap<String, Truck>,
    position: Option<Position>,
    gps: GpsStatus,
    fallback_notified: bool,
    fallback_center: Position,
    settings: Settings,
    watched: WatchSet,
    alerts: AlertHistory,
    display: Vec<Truck>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Settings::default(), WatchSet::new())
    }
}

impl Reconciler {
    pub fn new(settings: Settings, watched: WatchSet) -> Self {
        Self {
            batch: IndexMap::new(),
            position: None,
            gps: GpsStatus::Waiting,
            fallback_notified: false,
            fallback_center: DEFAULT_CENTER,
            settings,
            watched,
            alerts: AlertHistory::default(),
            display: Vec::new(),
        }
    }

    /// Override the default center used for fallback and placeholders.
    pub fn with_fallback_center(mut self, center: Position) -> Self {
        self.fallback_center = center;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn display(&self) -> &[Truck] {
        &self.display
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn watched(&self) -> &WatchSet {
        &self.watched
    }

    pub fn gps_status(&self) -> GpsStatus {
        self.gps
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn alert_history(&self) -> &AlertHistory {
        &self.alerts
    }

    /// The point distances are measured from, if the system is ready.
    pub fn reference(&self) -> Option<Position> {
        self.position
            .or_else(|| (self.gps == GpsStatus::Fallback).then_some(self.fallback_center))
    }

    // ── Inputs ───────────────────────────────────────────────────────

    /// Replace the batch wholesale after a successful fetch and open a new
    /// alert cycle. Later duplicates of an id overwrite earlier ones but
    /// keep the first arrival slot.
    pub fn apply_batch(&mut self, trucks: Vec<Truck>) {
        let mut batch = IndexMap::with_capacity(trucks.len());
        for truck in trucks {
            batch.insert(truck.id.clone(), truck);
        }
        debug!(trucks = batch.len(), "applied telemetry batch");
        self.batch = batch;
        self.alerts.clear();
    }

    /// Take a fresh device fix. Non-finite fixes are ignored.
    pub fn apply_position(&mut self, position: Position) -> bool {
        if !position.is_finite() {
            warn!(%position, "ignoring non-finite position fix");
            return false;
        }
        trace!(%position, "position update");
        self.position = Some(position);
        self.gps = GpsStatus::Active;
        true
    }

    /// Record a geolocation failure.
    pub fn apply_gps_error(&mut self) -> GpsErrorOutcome {
        if self.position.is_some() {
            self.gps = GpsStatus::Error;
            return GpsErrorOutcome::Transient;
        }
        self.gps = GpsStatus::Fallback;
        let first_notice = !self.fallback_notified;
        self.fallback_notified = true;
        GpsErrorOutcome::Fallback { first_notice }
    }

    /// Apply a validated setting change; the previous value survives an
    /// invalid one.
    pub fn apply_setting(&mut self, change: SettingChange) -> Result<Settings, CoreError> {
        self.settings = self.settings.with_change(change)?;
        Ok(self.settings)
    }

    // ── Watch list ───────────────────────────────────────────────────

    /// Flip watch membership of `id`.
    pub fn toggle_watch(&mut self, id: &str) -> Result<WatchChange, CoreError> {
        self.watched.toggle(id).ok_or_else(|| empty_id_error(id))
    }

    /// Add `id` to the watch list; an id that is already watched is an
    /// error, not a toggle.
    pub fn add_watch(&mut self, id: &str) -> Result<WatchChange, CoreError> {
        let id = normalize_id(id).ok_or_else(|| empty_id_error(id))?;
        if self.watched.insert(&id) {
            Ok(WatchChange::Added(id))
        } else {
            Err(CoreError::AlreadyWatched { id })
        }
    }

    /// Remove `id` from the watch list; an unwatched id is an error.
    pub fn remove_watch(&mut self, id: &str) -> Result<WatchChange, CoreError> {
        let id = normalize_id(id).ok_or_else(|| empty_id_error(id))?;
        if self.watched.remove(&id) {
            Ok(WatchChange::Removed(id))
        } else {
            Err(CoreError::NotWatched { id })
        }
    }

    // ── Derivation ───────────────────────────────────────────────────

    /// Rebuild the display list from current state and evaluate alerts.
    ///
    /// Safe to call any number of times between fetches: alert history
    /// guarantees each truck alerts at most once per cycle.
    pub fn recompute(&mut self) -> Vec<ProximityAlert> {
        self.display = reconcile(ReconcileInput {
            batch: &self.batch,
            reference: self.reference(),
            watched: &self.watched,
            search_radius_m: self.settings.search_radius_m,
            placeholder_center: self.fallback_center,
        });
        evaluate_alerts(&self.display, self.gps, &self.settings, &mut self.alerts)
    }

    /// Look up a truck in the current display list (not the raw batch).
    pub fn select(&self, id: &str) -> Selection {
        let Some(id) = normalize_id(id) else {
            return Selection::NotFound;
        };
        match self.display.iter().find(|t| t.id == id) {
            Some(t) if t.is_offline() => Selection::Offline(t.id.clone()),
            Some(t) => Selection::Online(t.clone()),
            None => Selection::NotFound,
        }
    }
}

fn empty_id_error(raw: &str) -> CoreError {
    CoreError::ValidationFailed {
        message: format!("'{raw}' is not a valid plate number"),
    }
}
