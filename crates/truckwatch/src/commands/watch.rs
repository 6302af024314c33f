//! Watch-list command handlers.

use tabled::Tabled;
use truckwatch_core::{Notice, WatchChange};

use crate::cli::{GlobalOpts, WatchArgs, WatchCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct WatchRow {
    #[tabled(rename = "Plate")]
    plate: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tracker = util::offline_tracker(global)?;

    let (change, manual) = match args.command {
        WatchCommand::Add { plate } => (tracker.add_watch(&plate).await?, true),
        WatchCommand::Remove { plate } => (tracker.remove_watch(&plate).await?, false),
        WatchCommand::Toggle { plate } => (tracker.toggle_watch(&plate).await?, false),
        WatchCommand::List => {
            let plates: Vec<String> = tracker.watched().await.iter().map(String::from).collect();
            let out = output::render_list(
                &global.output,
                &plates,
                |p| WatchRow { plate: p.clone() },
                Clone::clone,
            );
            output::print_output(&out, global.quiet);
            return Ok(());
        }
    };

    let notice = match change {
        WatchChange::Added(id) => Notice::WatchAdded { id, manual },
        WatchChange::Removed(id) => Notice::WatchRemoved { id },
    };
    output::print_status(&notice.to_string(), global.quiet);
    Ok(())
}
