use std::{fmt::Display, io::Write};

use ansi_term::Colour;
use anyhow::{Context, Result};
use chrono::{DateTime, Locale, TimeZone};
use clap::Subcommand;

use crate::{
    storage::{
        entities::{ActivityEntity, ActivityName, ActivityPatch, SessionEntity},
        key_value::KeyValueStore,
        tracker_storage::TrackerStorage,
    },
    utils::hours::format_elapsed,
};

use super::sessions::find_activity;

#[derive(Subcommand, Debug)]
pub enum ActivityCommand {
    #[command(about = "Create a new activity")]
    Add {
        name: ActivityName,
        #[arg(long, short, help = "Display colour as #RRGGBB")]
        color: Option<String>,
    },
    #[command(about = "Change the name of an activity")]
    Rename { id: String, name: ActivityName },
    #[command(about = "Change the colour of an activity")]
    Color { id: String, color: String },
    #[command(about = "Delete an activity together with all of its sessions")]
    Remove { id: String },
    #[command(about = "List activities with their current state")]
    List {},
}

/// Command to process `activity`.
pub async fn process_activity_command<S: KeyValueStore, Tz: TimeZone>(
    storage: &TrackerStorage<S>,
    command: ActivityCommand,
    now: &DateTime<Tz>,
    locale: Locale,
    colored: bool,
    out: &mut impl Write,
) -> Result<()>
where
    Tz::Offset: Display,
{
    match command {
        ActivityCommand::Add { name, color } => {
            let activity = storage
                .create_activity(name, color)
                .await
                .context("Failed to add activity")?;
            writeln!(out, "Added {} ({})", activity.name, activity.id)?;
        }
        ActivityCommand::Rename { id, name } => {
            let activity = find_activity(storage, &id).await?;
            storage
                .update_activity(
                    &id,
                    ActivityPatch {
                        name: Some(name.clone()),
                        color: None,
                    },
                )
                .await
                .context("Failed to update activity")?;
            writeln!(out, "Renamed {} to {name}", activity.name)?;
        }
        ActivityCommand::Color { id, color } => {
            let activity = find_activity(storage, &id).await?;
            storage
                .update_activity(
                    &id,
                    ActivityPatch {
                        name: None,
                        color: Some(color.clone()),
                    },
                )
                .await
                .context("Failed to update activity")?;
            writeln!(out, "{} is now {color}", activity.name)?;
        }
        ActivityCommand::Remove { id } => {
            let activity = find_activity(storage, &id).await?;
            storage
                .delete_activity(&id)
                .await
                .context("Failed to delete activity")?;
            writeln!(out, "Removed {} and its sessions", activity.name)?;
        }
        ActivityCommand::List {} => {
            let activities = storage.get_activities().await;
            if activities.is_empty() {
                writeln!(
                    out,
                    "No activities yet. Add one with `stint activity add <NAME>`."
                )?;
            }
            for activity in activities {
                let active = storage.get_active_session(&activity.id).await;
                let last = storage.last_completed_session(&activity.id).await;
                writeln!(
                    out,
                    "{}",
                    render_activity(
                        &activity,
                        active.as_ref(),
                        last.as_ref(),
                        now,
                        locale,
                        colored
                    )
                )?;
            }
        }
    }
    Ok(())
}

fn render_activity<Tz: TimeZone>(
    activity: &ActivityEntity,
    active: Option<&SessionEntity>,
    last: Option<&SessionEntity>,
    now: &DateTime<Tz>,
    locale: Locale,
    colored: bool,
) -> String
where
    Tz::Offset: Display,
{
    let marker = match activity.color.as_deref().and_then(parse_hex_colour) {
        Some(colour) if colored => colour.paint("●").to_string(),
        _ => "●".to_string(),
    };

    let state = match (active, last.and_then(|s| s.end_time)) {
        (Some(session), _) => format!(
            "running {}",
            format_elapsed(session.elapsed(now.to_utc()))
        ),
        (None, Some(end)) => format!(
            "last {}",
            end.with_timezone(&now.timezone())
                .format_localized("%-d %b %H:%M", locale)
        ),
        (None, None) => "never tracked".to_string(),
    };

    format!("{marker} {}  [{}]  {state}", activity.name, activity.id)
}

/// Reads `#RRGGBB`. Anything else is shown without colour.
fn parse_hex_colour(value: &str) -> Option<Colour> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
    Some(Colour::RGB(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use ansi_term::Colour;
    use anyhow::Result;
    use chrono::{DateTime, Duration, Locale, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    use crate::{
        storage::{
            entities::{ActivityEntity, ActivityName, SessionEntity},
            key_value::FileKeyValueStore,
            tracker_storage::TrackerStorage,
        },
        utils::clock::FixedClock,
    };

    use super::{parse_hex_colour, process_activity_command, render_activity, ActivityCommand};

    fn at(offset: Duration) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap() + offset
    }

    fn storage_at(dir: &TempDir, offset: Duration) -> Result<TrackerStorage<FileKeyValueStore>> {
        let store = FileKeyValueStore::new(dir.path().to_owned())?;
        Ok(TrackerStorage::new(store, Box::new(FixedClock(at(offset)))))
    }

    fn name(value: &str) -> ActivityName {
        ActivityName::new_opt(value).unwrap()
    }

    async fn run(
        storage: &TrackerStorage<FileKeyValueStore>,
        command: ActivityCommand,
    ) -> Result<String> {
        let mut out = Vec::new();
        process_activity_command(
            storage,
            command,
            &storage.now(),
            Locale::en_US,
            false,
            &mut out,
        )
        .await?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn hex_colours() {
        assert_eq!(parse_hex_colour("#4CAF50"), Some(Colour::RGB(0x4c, 0xaf, 0x50)));
        assert_eq!(parse_hex_colour("4CAF50"), None);
        assert_eq!(parse_hex_colour("#4CAF5"), None);
        assert_eq!(parse_hex_colour("#zzzzzz"), None);
    }

    #[test]
    fn activity_states() {
        let activity = ActivityEntity::new("1", name("Reading"), at(Duration::zero()), None);
        let now = at(Duration::hours(30));
        let running = SessionEntity {
            id: "2".into(),
            activity_id: "1".into(),
            start_time: now - Duration::seconds(61),
            end_time: None,
        };
        let finished = SessionEntity {
            id: "3".into(),
            activity_id: "1".into(),
            start_time: at(Duration::hours(1)),
            end_time: Some(at(Duration::hours(2))),
        };

        assert_eq!(
            render_activity(&activity, None, None, &now, Locale::en_US, false),
            "● Reading  [1]  never tracked"
        );
        assert_eq!(
            render_activity(&activity, Some(&running), Some(&finished), &now, Locale::en_US, false),
            "● Reading  [1]  running 00:01:01"
        );
        assert_eq!(
            render_activity(&activity, None, Some(&finished), &now, Locale::en_US, false),
            "● Reading  [1]  last 5 Apr 11:00"
        );
    }

    #[tokio::test]
    async fn test_add_rename_remove() -> Result<()> {
        let dir = tempdir()?;
        let storage = storage_at(&dir, Duration::zero())?;

        let added = run(
            &storage,
            ActivityCommand::Add {
                name: name("Reading"),
                color: Some("#ff0000".into()),
            },
        )
        .await?;
        let id = storage.get_activities().await[0].id.clone();
        assert_eq!(added, format!("Added Reading ({id})\n"));

        run(
            &storage,
            ActivityCommand::Rename {
                id: id.clone(),
                name: name("Writing"),
            },
        )
        .await?;
        run(
            &storage,
            ActivityCommand::Color {
                id: id.clone(),
                color: "#00ff00".into(),
            },
        )
        .await?;
        let activity = storage.get_activities().await.remove(0);
        assert_eq!(&*activity.name, "Writing");
        assert_eq!(activity.color.as_deref(), Some("#00ff00"));

        storage.start_session(&id).await?;
        let listed = run(&storage, ActivityCommand::List {}).await?;
        assert!(listed.contains("Writing"));
        assert!(listed.contains("running 00:00:00"));

        run(&storage, ActivityCommand::Remove { id: id.clone() }).await?;
        assert!(storage.get_activities().await.is_empty());
        assert!(storage.get_sessions().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_ids_fail() -> Result<()> {
        let dir = tempdir()?;
        let storage = storage_at(&dir, Duration::zero())?;

        assert!(run(&storage, ActivityCommand::Remove { id: "1".into() })
            .await
            .is_err());
        let listed = run(&storage, ActivityCommand::List {}).await?;
        assert!(listed.starts_with("No activities yet"));
        Ok(())
    }
}
