//! One-shot listing: locate, fetch once, reconcile, print. `--select`
//! narrows the output to one truck.

use tokio::sync::broadcast;
use truckwatch_core::{GpsStatus, Notice, Selection, sort_for_display};

use crate::cli::{GlobalOpts, ListArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let position = config::resolve_position(&args.location, &cfg)?;
    let tracker = util::build_tracker(&cfg, global, config::static_geo(position))?;
    let mut notices = tracker.subscribe_notices();

    if tracker.locate().await == GpsStatus::Fallback {
        output::print_status(
            &format!(
                "No position given; distances are from the default location ({}).",
                tracker.config().fallback_center
            ),
            global.quiet,
        );
    }
    tracker.refresh().await?;

    let mut trucks = match (&args.select, args.search.as_deref()) {
        (Some(plate), _) => match tracker.select(plate).await {
            Selection::Online(truck) => vec![truck],
            Selection::Offline(id) => tracker
                .trucks_snapshot()
                .iter()
                .filter(|t| t.id == id)
                .cloned()
                .collect(),
            Selection::NotFound => {
                return Err(CliError::NotFound {
                    resource_type: "truck".into(),
                    identifier: plate.trim().to_owned(),
                    list_command: "list".into(),
                });
            }
        },
        (None, Some(text)) => tracker.search(text),
        (None, None) => tracker.trucks_snapshot().to_vec(),
    };
    sort_for_display(&mut trucks);

    let color = output::should_color(&global.color);
    for notice in drain_notices(&mut notices) {
        output::print_status(&output::format_notice(&notice, color), global.quiet);
    }

    let out = output::render_trucks(&global.output, &trucks);
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Proximity alerts and selection notices raised during this run.
fn drain_notices(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|n| matches!(n, Notice::Proximity(_) | Notice::OfflineSelected { .. }))
        .collect()
}
