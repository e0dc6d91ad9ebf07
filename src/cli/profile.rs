use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    fs::operations::write_atomically,
    storage::{key_value::KeyValueStore, tracker_storage::TrackerStorage},
    utils::time::date_to_file_stamp,
};

/// Command to process `welcome`. Finishes onboarding.
pub async fn welcome<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    storage.set_user_name(name).await;
    storage.set_has_completed_onboarding(true).await;
    writeln!(out, "Welcome, {name}!")?;
    Ok(())
}

/// Command to process `profile`.
pub async fn print_profile<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    out: &mut impl Write,
) -> Result<()> {
    let user_name = storage.get_user_name().await;
    let onboarded = storage.has_completed_onboarding().await;
    let activities = storage.get_activities().await;
    let sessions = storage.get_sessions().await;
    let finished = sessions.iter().filter(|s| !s.is_active()).count();

    writeln!(out, "Name        {}", user_name.as_deref().unwrap_or("-"))?;
    writeln!(
        out,
        "Onboarding  {}",
        if onboarded { "complete" } else { "pending" }
    )?;
    writeln!(out, "Activities  {}", activities.len())?;
    writeln!(
        out,
        "Sessions    {} ({} running)",
        sessions.len(),
        sessions.len() - finished
    )?;
    Ok(())
}

/// Command to process `export`. Writes `stint-YYYY-MM-DD.json` (UTC date) into `output_dir`.
pub async fn export<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    output_dir: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let snapshot = storage.export_snapshot().await;
    let file_name = format!(
        "stint-{}.json",
        date_to_file_stamp(snapshot.export_date.date_naive())
    );
    let path = output_dir.join(file_name);

    let contents = serde_json::to_vec_pretty(&snapshot)?;
    write_atomically(&path, &contents)
        .await
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    info!("Exported data into {}", path.display());

    writeln!(
        out,
        "Exported {} activities and {} sessions to {}",
        snapshot.activities.len(),
        snapshot.sessions.len(),
        path.display()
    )?;
    Ok(())
}

/// Command to process `clear`. Without `confirmed` nothing is touched.
pub async fn clear<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    confirmed: bool,
    out: &mut impl Write,
) -> Result<()> {
    if !confirmed {
        writeln!(
            out,
            "This deletes every activity, session and setting. Run again with --yes to confirm."
        )?;
        return Ok(());
    }
    storage
        .clear_all_data()
        .await
        .context("Failed to clear data")?;
    writeln!(out, "All data cleared")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        storage::{
            entities::{ActivityName, ExportDocument},
            key_value::FileKeyValueStore,
            tracker_storage::TrackerStorage,
        },
        utils::clock::FixedClock,
    };

    use super::{clear, export, print_profile, welcome};

    fn storage(dir: &std::path::Path) -> Result<TrackerStorage<FileKeyValueStore>> {
        Ok(TrackerStorage::new(
            FileKeyValueStore::new(dir.join("store"))?,
            Box::new(FixedClock(
                Utc.with_ymd_and_hms(2024, 4, 5, 23, 30, 0).unwrap(),
            )),
        ))
    }

    #[tokio::test]
    async fn test_welcome_completes_onboarding() -> Result<()> {
        let dir = tempdir()?;
        let storage = storage(dir.path())?;
        let mut out = Vec::new();

        welcome(&storage, "Ada", &mut out).await?;
        print_profile(&storage, &mut out).await?;
        let text = String::from_utf8(out)?;

        assert!(storage.has_completed_onboarding().await);
        assert_eq!(storage.get_user_name().await.as_deref(), Some("Ada"));
        assert!(text.starts_with("Welcome, Ada!\n"));
        assert!(text.contains("Onboarding  complete"));
        assert!(text.contains("Sessions    0 (0 running)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_export_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let storage = storage(dir.path())?;
        let activity = storage
            .create_activity(ActivityName::new_opt("Reading").unwrap(), None)
            .await?;
        storage.start_session(&activity.id).await?;

        let mut out = Vec::new();
        export(&storage, dir.path(), &mut out).await?;

        let path = dir.path().join("stint-2024-04-05.json");
        let document: ExportDocument = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(document.activities, storage.get_activities().await);
        assert_eq!(document.sessions, storage.get_sessions().await);
        assert_eq!(document.version, env!("CARGO_PKG_VERSION"));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_needs_confirmation() -> Result<()> {
        let dir = tempdir()?;
        let storage = storage(dir.path())?;
        storage
            .create_activity(ActivityName::new_opt("Reading").unwrap(), None)
            .await?;
        let mut out = Vec::new();

        clear(&storage, false, &mut out).await?;
        assert_eq!(storage.get_activities().await.len(), 1);

        clear(&storage, true, &mut out).await?;
        assert!(storage.get_activities().await.is_empty());
        assert!(!storage.has_completed_onboarding().await);
        Ok(())
    }
}
