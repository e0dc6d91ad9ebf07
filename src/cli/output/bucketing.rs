use std::fmt::Display;

use chrono::{DateTime, Days, Locale, Months, NaiveDate, TimeZone, Utc};
use clap::ValueEnum;
use tracing::{instrument, trace};

use crate::{
    storage::entities::SessionEntity,
    utils::{
        hours::Hours,
        time::{local_midnight, month_start, week_start},
    },
};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum TimeScale {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl Display for TimeScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeScale::Daily => write!(f, "daily"),
            TimeScale::Weekly => write!(f, "weekly"),
            TimeScale::Monthly => write!(f, "monthly"),
        }
    }
}

impl TimeScale {
    /// How many buckets a dashboard of this scale always has.
    pub fn bucket_count(&self) -> usize {
        match self {
            TimeScale::Daily => 7,
            TimeScale::Weekly => 4,
            TimeScale::Monthly => 6,
        }
    }
}

/// One window of the dashboard, `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub hours: Hours,
}

impl Bucket {
    fn new<Tz: TimeZone>(label: String, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            label,
            start: start.to_utc(),
            end: end.to_utc(),
            hours: Hours::ZERO,
        }
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start <= moment && moment < self.end
    }
}

/// Creates the empty buckets for `scale`, oldest first, the last one containing `now`.
///
/// Boundaries are calendar boundaries in the time zone of `now`: days start at local midnight,
/// weeks on Monday whatever the locale says, months on the 1st.
pub fn create_buckets<Tz: TimeZone>(
    now: &DateTime<Tz>,
    scale: TimeScale,
    locale: Locale,
) -> Vec<Bucket>
where
    Tz::Offset: Display,
{
    let tz = now.timezone();
    let today = now.date_naive();

    let window = |start: NaiveDate, end: NaiveDate| {
        (local_midnight(&tz, start), local_midnight(&tz, end))
    };

    let buckets = match scale {
        TimeScale::Daily => (0..7u64)
            .rev()
            .map(|back| {
                let day = today - Days::new(back);
                let (start, end) = window(day, day + Days::new(1));
                let label = start.format_localized("%a", locale).to_string();
                Bucket::new(label, start, end)
            })
            .collect::<Vec<_>>(),
        TimeScale::Weekly => {
            let monday = week_start(today);
            (0..4u64)
                .rev()
                .enumerate()
                .map(|(index, back)| {
                    let first = monday - Days::new(7 * back);
                    let (start, end) = window(first, first + Days::new(7));
                    Bucket::new(format!("W{}", index + 1), start, end)
                })
                .collect()
        }
        TimeScale::Monthly => (0..6u32)
            .rev()
            .map(|back| {
                let first = month_start(today, back);
                let (start, end) = window(first, first + Months::new(1));
                let label = start.format_localized("%b", locale).to_string();
                Bucket::new(label, start, end)
            })
            .collect(),
    };

    trace!("Buckets for {scale}: {buckets:?}");
    buckets
}

/// Adds up finished sessions of the selected activities into `buckets`.
///
/// A session lands entirely in the bucket containing its start, even when it runs past the end
/// of that bucket. Sessions starting outside every bucket are ignored.
#[instrument(skip_all, fields(sessions = sessions.len(), buckets = buckets.len()))]
pub fn fill_buckets(buckets: &mut [Bucket], sessions: &[SessionEntity], selection: &[String]) {
    let qualifying = sessions
        .iter()
        .filter(|s| selection.iter().any(|id| *id == s.activity_id))
        .filter_map(|s| s.duration().map(|duration| (s.start_time, duration)));

    for (start, duration) in qualifying {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(start)) {
            bucket.hours += Hours::from_duration(duration);
        }
    }
}
