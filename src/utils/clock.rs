use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tokio::time::Instant;

/// Source of "now" for session timestamps, dashboard buckets and the live elapsed display.
/// Swapping it out lets tests pin time.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, instant: tokio::time::Instant);

    /// Current time in the user's time zone. Day, week and month boundaries are computed from
    /// this.
    fn local_time(&self) -> DateTime<Local> {
        self.time().with_timezone(&Local)
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock frozen at a single moment. Sleeping still goes through tokio so paused-time tests work.
#[cfg(test)]
#[derive(Clone)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
