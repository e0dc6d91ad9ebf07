use std::{
    fmt::Display,
    iter::Sum,
    ops::{AddAssign, Deref},
};

use chrono::Duration;

const MILLIS_IN_HOUR: f64 = 3_600_000.;

/// Fractional hours, the unit every dashboard value is expressed in.
///
/// Displaying follows the dashboard rule: at least an hour is shown in hours with one decimal,
/// anything below is shown in whole minutes but never rounds a non-zero value down to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Hours(f64);

impl Hours {
    pub const ZERO: Hours = Hours(0.);

    pub fn new(value: f64) -> Self {
        Hours(value)
    }

    /// Wall clock difference, no calendar awareness.
    pub fn from_duration(duration: Duration) -> Self {
        Hours(duration.num_milliseconds() as f64 / MILLIS_IN_HOUR)
    }
}

impl Display for Hours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hours = self.0;
        if hours == 0. {
            write!(f, "0 minutes")
        } else if hours < 1. {
            let minutes = (hours * 60.).round().max(1.) as i64;
            if minutes == 1 {
                write!(f, "1 minute")
            } else {
                write!(f, "{minutes} minutes")
            }
        } else {
            // Ties round up, `{:.1}` alone would round them to even.
            let rounded = (hours * 10.).round() / 10.;
            write!(f, "{rounded:.1} hours")
        }
    }
}

impl Deref for Hours {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AddAssign for Hours {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Hours(iter.map(|v| v.0).sum())
    }
}

/// Live counter format, `HH:MM:SS`. Negative spans (clock went backwards) show as zero.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
