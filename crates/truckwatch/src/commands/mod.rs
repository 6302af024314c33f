//! Command dispatch: bridges CLI args -> tracker operations -> output formatting.

pub mod config_cmd;
pub mod input;
pub mod list;
pub mod run;
pub mod settings;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a tracking command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, global).await,
        Command::List(args) => list::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Settings(args) => settings::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
