use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    storage::{
        entities::{ActivityEntity, SessionEntity},
        key_value::KeyValueStore,
        tracker_storage::TrackerStorage,
    },
    utils::hours::format_elapsed,
};

const WATCH_FREQUENCY: Duration = Duration::from_secs(1);

pub(super) async fn find_activity<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    activity_id: &str,
) -> Result<ActivityEntity> {
    storage
        .get_activities()
        .await
        .into_iter()
        .find(|a| a.id == activity_id)
        .with_context(|| format!("No activity with id {activity_id}"))
}

/// Command to process `start`. Starting something that already runs only reports it.
#[instrument(skip(storage, out))]
pub async fn start_activity<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    activity_id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let activity = find_activity(storage, activity_id).await?;

    if let Some(active) = storage.get_active_session(activity_id).await {
        writeln!(
            out,
            "{} is already running ({})",
            activity.name,
            format_elapsed(active.elapsed(storage.now()))
        )?;
        return Ok(());
    }

    storage
        .start_session(activity_id)
        .await
        .context("Failed to start session")?;
    writeln!(out, "Started {}", activity.name)?;
    Ok(())
}

/// Command to process `stop`.
#[instrument(skip(storage, out))]
pub async fn stop_activity<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    activity_id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let activity = find_activity(storage, activity_id).await?;

    let Some(active) = storage.get_active_session(activity_id).await else {
        writeln!(out, "{} isn't running", activity.name)?;
        return Ok(());
    };

    match storage
        .end_session(&active.id)
        .await
        .context("Failed to stop session")?
    {
        Some(ended) => writeln!(
            out,
            "Stopped {} after {}",
            activity.name,
            format_elapsed(ended.duration().unwrap_or_else(chrono::Duration::zero))
        )?,
        None => writeln!(out, "{} isn't running", activity.name)?,
    }
    Ok(())
}

async fn running_activities<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
) -> Vec<(ActivityEntity, SessionEntity)> {
    let sessions = storage.get_sessions().await;
    storage
        .get_activities()
        .await
        .into_iter()
        .filter_map(|activity| {
            let session = sessions
                .iter()
                .find(|s| s.activity_id == activity.id && s.is_active())?
                .clone();
            Some((activity, session))
        })
        .collect()
}

fn render_status(running: &[(ActivityEntity, SessionEntity)], now: DateTime<Utc>) -> String {
    if running.is_empty() {
        return "Nothing is running".to_string();
    }
    running
        .iter()
        .map(|(activity, session)| {
            format!("{} {}", activity.name, format_elapsed(session.elapsed(now)))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Command to process `status` without `--watch`.
pub async fn print_status<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    out: &mut impl Write,
) -> Result<()> {
    let running = running_activities(storage).await;
    writeln!(out, "{}", render_status(&running, storage.now()))?;
    Ok(())
}

/// Redraws the running sessions once per second until `shutdown` is cancelled. Sessions are
/// reloaded on every tick so starts and stops from other terminals show up.
pub async fn watch_status<S: KeyValueStore>(
    storage: &TrackerStorage<S>,
    shutdown: CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    let clock = storage.clock();
    let mut tick = clock.instant();
    loop {
        tick += WATCH_FREQUENCY;

        let running = running_activities(storage).await;
        write!(out, "\r\x1b[2K{}", render_status(&running, clock.time()))?;
        out.flush()?;

        select! {
            _ = shutdown.cancelled() => {
                debug!("Stopping status watch");
                writeln!(out)?;
                return Ok(())
            }
            _ = clock.sleep_until(tick) => ()
        }
    }
}
