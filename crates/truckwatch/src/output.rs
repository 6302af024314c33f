//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use truckwatch_core::{Notice, NoticeLevel, Truck};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled on stderr.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One notice line for stderr.
pub fn format_notice(notice: &Notice, color: bool) -> String {
    let text = notice.to_string();
    if !color {
        return text;
    }
    match (notice, notice.level()) {
        (Notice::Proximity(_), _) => text.green().bold().to_string(),
        (_, NoticeLevel::Info) => text.cyan().to_string(),
        (_, NoticeLevel::Warning) => text.yellow().to_string(),
    }
}

// ── Truck rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct TruckRow {
    #[tabled(rename = "")]
    watched: &'static str,
    #[tabled(rename = "Plate")]
    plate: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl TruckRow {
    pub fn new(truck: &Truck, now: DateTime<Utc>) -> Self {
        Self {
            watched: if truck.is_watched { "★" } else { "" },
            plate: truck.plate_number.clone(),
            status: truck.status.clone(),
            distance: format_distance(truck.distance),
            location: truck.location.clone(),
            updated: if truck.is_offline() {
                "-".into()
            } else {
                format_age(truck, now)
            },
        }
    }
}

/// `850 m`, `1.2 km`, or `-` when unknown or unreachable.
pub fn format_distance(distance: Option<f64>) -> String {
    match distance {
        Some(d) if d.is_finite() && d < 1000.0 => format!("{d:.0} m"),
        Some(d) if d.is_finite() => format!("{:.1} km", d / 1000.0),
        _ => "-".into(),
    }
}

/// Coarse "time since update" for the table.
pub fn format_age(truck: &Truck, now: DateTime<Utc>) -> String {
    let Some(age) = truck.age(now) else {
        return truck.last_update.clone();
    };
    let secs = age.num_seconds().max(0);
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86_400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// Render trucks in the chosen format.
pub fn render_trucks(format: &OutputFormat, trucks: &[Truck]) -> String {
    let now = Utc::now();
    render_list(
        format,
        trucks,
        |t| TruckRow::new(t, now),
        |t| t.plate_number.clone(),
    )
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print a status line to stderr, respecting quiet mode.
pub fn print_status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

/// YAML output.
fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use truckwatch_core::DEFAULT_CENTER;

    #[test]
    fn distances_are_humanized() {
        assert_eq!(format_distance(Some(42.4)), "42 m");
        assert_eq!(format_distance(Some(1240.0)), "1.2 km");
        assert_eq!(format_distance(Some(f64::INFINITY)), "-");
        assert_eq!(format_distance(None), "-");
    }

    #[test]
    fn offline_rows_have_no_age() {
        let placeholder = Truck::offline_placeholder("GONE-1", DEFAULT_CENTER);
        let row = TruckRow::new(&placeholder, Utc::now());
        assert_eq!(row.updated, "-");
        assert_eq!(row.distance, "-");
        assert_eq!(row.watched, "★");
    }

    #[test]
    fn plain_output_is_one_plate_per_line() {
        let trucks = vec![
            Truck::offline_placeholder("A-1", DEFAULT_CENTER),
            Truck::offline_placeholder("B-2", DEFAULT_CENTER),
        ];
        assert_eq!(render_trucks(&OutputFormat::Plain, &trucks), "A-1\nB-2");
    }
}
