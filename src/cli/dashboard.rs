use std::io::{self, Write};

use ansi_term::Colour;
use anyhow::Result;
use chrono::{DateTime, Locale, TimeZone};

use crate::storage::{
    key_value::KeyValueStore, selection::resolve_selection, tracker_storage::TrackerStorage,
};

use super::output::{bucketing::TimeScale, Dashboard, DashboardStatus};

const BAR_WIDTH: usize = 30;

/// Command to process `dashboard`. Everything is reloaded and recomputed on every call.
pub async fn print_dashboard<S: KeyValueStore, Tz: TimeZone>(
    storage: &TrackerStorage<S>,
    scale: TimeScale,
    now: &DateTime<Tz>,
    locale: Locale,
    colored: bool,
    out: &mut impl Write,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let activities = storage.get_activities().await;
    let sessions = storage.get_sessions().await;
    let selection = resolve_selection(&storage.get_selected_activity_ids().await, &activities);

    let dashboard = Dashboard::compute(&sessions, &activities, &selection, scale, now, locale);
    render_dashboard(&dashboard, colored, out)?;
    Ok(())
}

pub fn render_dashboard(
    dashboard: &Dashboard,
    colored: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    let label_width = dashboard
        .buckets
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);
    let max = dashboard.bar_scale();

    writeln!(out, "{} dashboard", capitalize(&dashboard.scale.to_string()))?;
    for bucket in &dashboard.buckets {
        let filled = ((*bucket.hours / max) * BAR_WIDTH as f64)
            .round()
            .clamp(0., BAR_WIDTH as f64) as usize;
        writeln!(
            out,
            "{:<label_width$}  {}  {}",
            bucket.label,
            bar(filled, colored),
            bucket.hours
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Total    {}", dashboard.total)?;
    writeln!(out, "Average  {}", dashboard.average)?;

    match dashboard.status {
        DashboardStatus::NoSelection => {
            writeln!(out)?;
            writeln!(out, "No activities selected. Choose some with `stint filter`.")?;
        }
        DashboardStatus::NoRecords => {
            writeln!(out)?;
            writeln!(
                out,
                "No records yet. Start tracking with `stint start <ACTIVITY_ID>`."
            )?;
        }
        DashboardStatus::Ready => {}
    }

    if !dashboard.breakdown.is_empty() {
        let name_width = dashboard
            .breakdown
            .iter()
            .map(|u| u.name.chars().count())
            .max()
            .unwrap_or(0);
        writeln!(out)?;
        writeln!(out, "By activity")?;
        for usage in &dashboard.breakdown {
            writeln!(out, "{:<name_width$}  {}", usage.name, usage.total)?;
        }
    }
    Ok(())
}

fn bar(filled: usize, colored: bool) -> String {
    let full = "█".repeat(filled);
    let empty = "░".repeat(BAR_WIDTH - filled);
    if colored {
        format!("{}{}", Colour::Cyan.paint(full), Colour::Fixed(240).paint(empty))
    } else {
        format!("{full}{empty}")
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
