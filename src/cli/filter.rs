use std::io::Write;

use anyhow::Result;
use clap::Subcommand;

use crate::storage::{
    key_value::KeyValueStore,
    selection::{resolve_selection, toggle, toggle_all},
    tracker_storage::TrackerStorage,
};

use super::sessions::find_activity;

#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    #[command(about = "Show which activities the dashboard includes")]
    Show {},
    #[command(about = "Include or exclude a single activity")]
    Toggle { activity_id: String },
    #[command(about = "Select every activity, or clear the selection if everything is selected")]
    All {},
    #[command(about = "Replace the selection")]
    Set {
        #[arg(required = true)]
        activity_ids: Vec<String>,
    },
}

/// Command to process `filter`. Changes are applied to the resolved selection, so toggling
/// before anything was chosen starts from "everything selected".
pub async fn process_filter_command<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    command: FilterCommand,
    out: &mut impl Write,
) -> Result<()> {
    let activities = storage.get_activities().await;
    let stored = storage.get_selected_activity_ids().await;
    let selection = resolve_selection(&stored, &activities);

    let next = match command {
        FilterCommand::Show {} => None,
        FilterCommand::Toggle { activity_id } => {
            find_activity(storage, &activity_id).await?;
            Some(toggle(&selection, &activity_id))
        }
        FilterCommand::All {} => Some(toggle_all(&selection, &activities)),
        FilterCommand::Set { activity_ids } => {
            for id in &activity_ids {
                find_activity(storage, id).await?;
            }
            Some(resolve_selection(&activity_ids, &activities))
        }
    };

    let (stored, selection) = match next {
        Some(next) => {
            storage.save_selected_activity_ids(&next).await;
            let resolved = resolve_selection(&next, &activities);
            (next, resolved)
        }
        None => (stored, selection),
    };

    if activities.is_empty() {
        writeln!(out, "No activities yet.")?;
        return Ok(());
    }
    if stored.is_empty() {
        writeln!(out, "Nothing chosen, the dashboard includes every activity.")?;
    }
    for activity in &activities {
        let mark = if selection.contains(&activity.id) {
            "x"
        } else {
            " "
        };
        writeln!(out, "[{mark}] {}  [{}]", activity.name, activity.id)?;
    }
    Ok(())
}
