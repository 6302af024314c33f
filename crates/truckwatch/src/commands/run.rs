//! Live tracking loop.
//!
//! Starts the tracker, then prints the display list whenever it changes,
//! notices as they arrive, and a status line when the feed or GPS state
//! moves. Stdin takes position fixes and commands (see `input::HELP`).
//! Ctrl-C or `quit` shuts everything down.

use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use truckwatch_core::model::legal_values;
use truckwatch_core::{
    ChannelGeo, CoreError, GeoError, GeoFeed, GeoSupplier, Selection, SettingChange, Settings,
    Tracker, Truck, search, sort_for_display,
};

use crate::cli::{GlobalOpts, OutputFormat, RunArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::input::{self, Action};
use super::util;

const ACTION_QUEUE: usize = 16;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;

    let (geo, feed): (Arc<dyn GeoSupplier>, Option<GeoFeed>) = if args.position_stdin {
        let (geo, feed) = ChannelGeo::new();
        (Arc::new(geo), Some(feed))
    } else {
        let position = config::resolve_position(&args.location, &cfg)?;
        (config::static_geo(position), None)
    };

    let tracker = util::build_tracker(&cfg, global, geo)?;
    let (action_tx, actions) = mpsc::channel(ACTION_QUEUE);
    let stdin_task: JoinHandle<()> = tokio::spawn(read_input(feed, action_tx));

    let result = Session::new(tracker.clone(), global).run(actions).await;

    tracker.shutdown().await;
    stdin_task.abort();
    result
}

// ── Session ──────────────────────────────────────────────────────────

struct Session<'a> {
    tracker: Tracker,
    global: &'a GlobalOpts,
    color: bool,
    /// Active `/text` filter, applied to every printed list.
    filter: String,
}

impl<'a> Session<'a> {
    fn new(tracker: Tracker, global: &'a GlobalOpts) -> Self {
        Self {
            tracker,
            color: output::should_color(&global.color),
            global,
            filter: String::new(),
        }
    }

    async fn run(mut self, mut actions: mpsc::Receiver<Action>) -> Result<(), CliError> {
        let mut trucks = self.tracker.subscribe_trucks();
        let mut notices = self.tracker.subscribe_notices();
        let mut api = self.tracker.subscribe_api_status();
        let mut gps = self.tracker.subscribe_gps_status();
        let mut settings = self.tracker.subscribe_settings();
        let mut input_open = true;

        self.tracker.start().await;
        self.status(&format!(
            "Tracking trucks from {} (Ctrl-C or 'quit' to stop, 'help' for commands)",
            self.tracker.config().feed_url
        ));

        loop {
            tokio::select! {
                biased;
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    debug!("interrupted");
                    break;
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => self.status(&output::format_notice(&notice, self.color)),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "notices dropped"),
                    Err(RecvError::Closed) => break,
                },
                action = actions.recv(), if input_open => match action {
                    Some(Action::Quit) => break,
                    Some(action) => self.apply(action).await,
                    None => input_open = false,
                },
                changed = trucks.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = trucks.borrow_and_update().clone();
                    self.print_trucks(&snapshot);
                }
                changed = settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *settings.borrow_and_update();
                    self.status(&describe_settings(&current));
                }
                changed = api.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.print_state();
                }
                changed = gps.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.print_state();
                }
            }
        }
        Ok(())
    }

    /// Carry out one user action. Failures are reported and the session
    /// keeps running.
    async fn apply(&mut self, action: Action) {
        let tracker = self.tracker.clone();
        let result = match action {
            Action::Select(plate) => {
                self.print_selection(&plate, &tracker.select(&plate).await);
                Ok(())
            }
            Action::ToggleWatch(plate) => tracker.toggle_watch(&plate).await.map(drop),
            Action::AddWatch(plate) => tracker.add_watch(&plate).await.map(drop),
            Action::RemoveWatch(plate) => tracker.remove_watch(&plate).await.map(drop),
            Action::Set { name, value } => match SettingChange::parse(name, &value) {
                Ok(change) => tracker.change_setting(change).await.map(drop),
                Err(e) => {
                    self.status(&format!("{e} (allowed: {})", legal_values(name)));
                    Ok(())
                }
            },
            Action::ToggleMute => tracker.toggle_mute().await.map(drop),
            Action::Refresh => tracker.refresh().await.map(drop),
            Action::Search(text) => {
                self.filter = text;
                let snapshot = tracker.trucks_snapshot();
                self.print_trucks(&snapshot);
                Ok(())
            }
            Action::Help => {
                self.status(input::HELP);
                Ok(())
            }
            Action::Fix(_) | Action::Quit => Ok(()),
        };
        if let Err(e) = result {
            debug!(error = %e, "session action failed");
            // Watch-list conflicts already surfaced as a notice.
            if !matches!(e, CoreError::AlreadyWatched { .. }) {
                self.status(&e.to_string());
            }
        }
    }

    fn print_selection(&self, plate: &str, selection: &Selection) {
        match selection {
            Selection::Online(truck) => self.status(&format!(
                "{}: {} away, {} ({}), updated {}",
                truck.plate_number,
                output::format_distance(truck.distance),
                truck.location,
                truck.status,
                output::format_age(truck, chrono::Utc::now()),
            )),
            // The tracker announces offline selections itself.
            Selection::Offline(_) => {}
            Selection::NotFound => {
                self.status(&format!("No truck '{}' in the current list.", plate.trim()));
            }
        }
    }

    fn print_trucks(&self, snapshot: &[Truck]) {
        let mut trucks: Vec<Truck> = search(snapshot, &self.filter)
            .into_iter()
            .cloned()
            .collect();
        sort_for_display(&mut trucks);
        if matches!(self.global.output, OutputFormat::Table) {
            let filter = if self.filter.is_empty() {
                String::new()
            } else {
                format!(" matching '{}'", self.filter)
            };
            output::print_output(
                &format!(
                    "\n{} trucks{filter} at {}",
                    trucks.len(),
                    Local::now().format("%H:%M:%S")
                ),
                self.global.quiet,
            );
        }
        output::print_output(
            &output::render_trucks(&self.global.output, &trucks),
            self.global.quiet,
        );
    }

    fn print_state(&self) {
        self.status(&format!(
            "[{}] [{}]",
            self.tracker.api_status(),
            self.tracker.gps_status()
        ));
    }

    fn status(&self, message: &str) {
        output::print_status(message, self.global.quiet);
    }
}

fn describe_settings(settings: &Settings) -> String {
    format!(
        "Settings: poll every {}s, search {} m, alert {} m, notifications {}",
        settings.poll_interval().as_secs(),
        settings.search_radius_m,
        settings.alert_radius_m,
        if settings.muted { "muted" } else { "on" }
    )
}

// ── Stdin ────────────────────────────────────────────────────────────

/// Route stdin lines: fixes into the geo channel, everything else to the
/// session. Unparseable fixes count as a failed fix.
async fn read_input(feed: Option<GeoFeed>, actions: mpsc::Sender<Action>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                if let Some(feed) = &feed {
                    feed.fail(GeoError::Other(e.to_string()));
                }
                break;
            }
        };

        match input::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Action::Fix(position))) => match &feed {
                Some(feed) => feed.push(position),
                None => warn!("position input needs --position-stdin, ignoring"),
            },
            Ok(Some(action)) => {
                if actions.send(action).await.is_err() {
                    break;
                }
            }
            Err(message) => {
                if let Some(feed) = &feed {
                    if looks_like_fix(&line) {
                        feed.fail(GeoError::Other(format!("bad position '{}'", line.trim())));
                        continue;
                    }
                }
                eprintln!("{message}");
            }
        }
    }
}

/// Starts like a coordinate, so a parse failure is a bad fix.
fn looks_like_fix(line: &str) -> bool {
    line.trim_start()
        .starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
}
