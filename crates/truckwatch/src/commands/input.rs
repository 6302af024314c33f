//! Line-oriented input for a live `run` session.
//!
//! Each stdin line is either a position fix (`lat,lng` or `lat lng`) or a
//! command acting on the tracker.

use truckwatch_core::{Position, SettingName};

pub const HELP: &str = "\
commands:
  select <plate>       show a truck from the current list
  watch <plate>        toggle a plate on the watch list
  add <plate>          add a plate to the watch list
  remove <plate>       remove a plate from the watch list
  set <name> <value>   change poll-interval, search-radius, alert-radius, or muted
  mute                 toggle notifications
  /<text>              filter the list by plate or location (`/` alone clears)
  refresh              fetch now
  quit                 stop tracking
  <lat>,<lng>          position fix (with --position-stdin)";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Fix(Position),
    Select(String),
    ToggleWatch(String),
    AddWatch(String),
    RemoveWatch(String),
    Set { name: SettingName, value: String },
    ToggleMute,
    Search(String),
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Action>, String> {
    // Search text is taken as typed.
    if let Some(text) = line.trim_start().strip_prefix('/') {
        return Ok(Some(Action::Search(text.to_owned())));
    }

    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(position) = parse_fix(line) {
        return Ok(Some(Action::Fix(position)));
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let action = match word.to_lowercase().as_str() {
        "select" | "s" => Action::Select(plate_arg(word, rest)?),
        "watch" | "w" => Action::ToggleWatch(plate_arg(word, rest)?),
        "add" => Action::AddWatch(plate_arg(word, rest)?),
        "remove" | "rm" => Action::RemoveWatch(plate_arg(word, rest)?),
        "set" => {
            let (name, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: set <name> <value>".to_owned())?;
            let name = name
                .parse()
                .map_err(|_| format!("unknown setting '{name}'"))?;
            Action::Set {
                name,
                value: value.trim().to_owned(),
            }
        }
        "mute" => Action::ToggleMute,
        "refresh" | "r" => Action::Refresh,
        "help" | "?" => Action::Help,
        "quit" | "q" | "exit" => Action::Quit,
        _ => return Err(format!("unrecognized input '{line}' (type 'help')")),
    };
    Ok(Some(action))
}

fn plate_arg(word: &str, rest: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {word} <plate>"))
    } else {
        Ok(rest.to_owned())
    }
}

/// Parse `lat,lng` or `lat lng`.
pub fn parse_fix(line: &str) -> Option<Position> {
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let lat: f64 = parts.next()?.parse().ok()?;
    let lng: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
    valid.then_some(Position::new(lat, lng))
}
