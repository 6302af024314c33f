//! Clap derive structures for the `truckwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use truckwatch_core::SettingName;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// truckwatch -- know when the garbage truck is around the corner
#[derive(Debug, Parser)]
#[command(
    name = "truckwatch",
    version,
    about = "Track nearby garbage trucks from the command line",
    long_about = "Polls a municipal garbage-truck telemetry feed, keeps the trucks\n\
        within your search radius (plus any you watch), and alerts once per\n\
        refresh when one comes within your alert radius.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "TRUCKWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Telemetry feed URL (overrides config)
    #[arg(long, env = "TRUCKWATCH_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TRUCKWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates from the feed
    #[arg(long, short = 'k', env = "TRUCKWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "TRUCKWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Track trucks live until interrupted
    Run(RunArgs),

    /// Fetch once and list nearby and watched trucks
    #[command(alias = "ls")]
    List(ListArgs),

    /// Manage the watch list
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// View and change tracking settings
    Settings(SettingsArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Location ─────────────────────────────────────────────────────────

/// Where the user is. Without any of these, the configured position is
/// used, and failing that the default city center.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude of your position
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of your position
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Read "lat,lng" fixes from stdin, mixed with session commands
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub position_stdin: bool,
}

// ── List ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Only show trucks whose plate or location contains this text
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Show a single truck from the list by plate
    #[arg(long, conflicts_with = "search")]
    pub select: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub command: WatchCommand,
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    /// Start watching a plate (errors if already watched)
    Add {
        /// Plate number, e.g. KEA-1234
        plate: String,
    },

    /// Stop watching a plate
    #[command(alias = "rm")]
    Remove {
        /// Plate number
        plate: String,
    },

    /// Watch a plate if unwatched, otherwise stop watching it
    Toggle {
        /// Plate number
        plate: String,
    },

    /// Show watched plates
    #[command(alias = "ls")]
    List,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Display current settings
    Show,

    /// Change one setting
    Set {
        /// poll-interval, search-radius, alert-radius, or muted
        #[arg(value_parser = parse_setting_name)]
        name: SettingName,

        /// Seconds for poll-interval, meters for radii, true/false for muted
        value: String,
    },

    /// List the legal values of every setting
    Options,
}

fn parse_setting_name(raw: &str) -> Result<SettingName, String> {
    raw.parse().map_err(|_| {
        format!("unknown setting '{raw}' (poll-interval, search-radius, alert-radius, muted)")
    })
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config and preferences file locations
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
