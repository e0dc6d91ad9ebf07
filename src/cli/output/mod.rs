pub mod analysis;
pub mod bucketing;

use std::fmt::Display;

use chrono::{DateTime, Locale, TimeZone};
use tracing::debug;

use crate::{
    storage::entities::{ActivityEntity, SessionEntity},
    utils::hours::Hours,
};

use self::{
    analysis::{analyze_activities, ActivityUsage},
    bucketing::{create_buckets, fill_buckets, Bucket, TimeScale},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardStatus {
    NoSelection,
    NoRecords,
    Ready,
}

/// Everything the dashboard shows, computed in one pass from the stored collections.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub scale: TimeScale,
    pub buckets: Vec<Bucket>,
    pub total: Hours,
    pub average: Hours,
    pub breakdown: Vec<ActivityUsage>,
    pub status: DashboardStatus,
}

impl Dashboard {
    /// `selection` must already be resolved, an empty slice here means nothing is selected.
    pub fn compute<Tz: TimeZone>(
        sessions: &[SessionEntity],
        activities: &[ActivityEntity],
        selection: &[String],
        scale: TimeScale,
        now: &DateTime<Tz>,
        locale: Locale,
    ) -> Self
    where
        Tz::Offset: Display,
    {
        let mut buckets = create_buckets(now, scale, locale);
        fill_buckets(&mut buckets, sessions, selection);

        let total = buckets.iter().map(|b| b.hours).sum::<Hours>();
        let average = if buckets.is_empty() {
            Hours::ZERO
        } else {
            Hours::new(*total / buckets.len() as f64)
        };

        let status = if selection.is_empty() {
            DashboardStatus::NoSelection
        } else if *total > 0. {
            DashboardStatus::Ready
        } else {
            DashboardStatus::NoRecords
        };

        let breakdown = analyze_activities(sessions, activities, selection);
        debug!("Dashboard {scale}: total {total}, status {status:?}");

        Self {
            scale,
            buckets,
            total,
            average,
            breakdown,
            status,
        }
    }

    /// Largest bucket value, never below one hour so that small values don't fill the bars.
    pub fn bar_scale(&self) -> f64 {
        self.buckets
            .iter()
            .map(|b| *b.hours)
            .fold(1., f64::max)
    }
}
