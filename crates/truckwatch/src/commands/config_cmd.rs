//! Config subcommand handlers.

use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Paths {
    config: String,
    config_exists: bool,
    preferences: String,
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("(unrenderable config: {e})"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.feed.url.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let cfg = config::load(global)?;
            let path = config::active_config_path(global);
            let paths = Paths {
                config_exists: path.exists(),
                config: path.display().to_string(),
                preferences: cfg.preferences_path().display().to_string(),
            };
            let out = output::render_single(
                &global.output,
                &paths,
                |p| {
                    format!(
                        "Config:       {}{}\nPreferences:  {}",
                        p.config,
                        if p.config_exists { "" } else { " (not created)" },
                        p.preferences
                    )
                },
                |p| p.config.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
