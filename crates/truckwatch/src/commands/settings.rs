//! Settings command handlers.

use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;
use truckwatch_core::model::legal_values;
use truckwatch_core::{SettingChange, SettingName, Settings};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Clone, Tabled, Serialize)]
struct OptionRow {
    #[tabled(rename = "Setting")]
    setting: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Allowed")]
    allowed: String,
}

fn current_value(settings: &Settings, name: SettingName) -> String {
    match name {
        SettingName::PollInterval => settings.poll_interval().as_secs().to_string(),
        SettingName::SearchRadius => settings.search_radius_m.to_string(),
        SettingName::AlertRadius => settings.alert_radius_m.to_string(),
        SettingName::Muted => settings.muted.to_string(),
    }
}

fn detail(settings: &Settings) -> String {
    [
        format!("Poll interval:  {}s", settings.poll_interval().as_secs()),
        format!("Search radius:  {} m", settings.search_radius_m),
        format!("Alert radius:   {} m", settings.alert_radius_m),
        format!(
            "Notifications:  {}",
            if settings.muted { "muted" } else { "on" }
        ),
    ]
    .join("\n")
}

fn render(global: &GlobalOpts, settings: &Settings) -> String {
    output::render_single(&global.output, settings, detail, |s| {
        SettingName::iter()
            .map(|name| format!("{name}={}", current_value(s, name)))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tracker = util::offline_tracker(global)?;

    match args.command {
        SettingsCommand::Show => {
            output::print_output(&render(global, &tracker.settings()), global.quiet);
            Ok(())
        }

        SettingsCommand::Set { name, value } => {
            let change = SettingChange::parse(name, &value).map_err(|e| CliError::Validation {
                field: name.to_string(),
                reason: format!("{e} (allowed: {})", legal_values(name)),
            })?;
            let settings = tracker.change_setting(change).await?;
            output::print_output(&render(global, &settings), global.quiet);
            Ok(())
        }

        SettingsCommand::Options => {
            let settings = tracker.settings();
            let rows: Vec<OptionRow> = SettingName::iter()
                .map(|name| OptionRow {
                    setting: name.to_string(),
                    current: current_value(&settings, name),
                    allowed: legal_values(name),
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &rows,
                Clone::clone,
                |r| r.setting.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
