//! Time source for the scheduler loop.
//!
//! The loop never reads the system clock directly; it talks to a [`Clock`]
//! so tests can pin time and resolve sleeps on their own terms.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// The longest single timer the system clock arms. Idle waits can stretch
/// years past the tokio timer's horizon, so they are sliced into chunks
/// with the wall clock re-checked in between.
const MAX_TIMER: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// The current time in the clock's zone.
    fn now(&self) -> DateTime<Local>;

    /// Complete no earlier than `deadline`; return immediately when the
    /// deadline has already passed. The scheduler dispatches on the
    /// assumption that this never wakes early.
    async fn sleep_until(&self, deadline: DateTime<Local>);
}

/// Wall-clock time in the local zone, backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Local>) {
        loop {
            let remaining = (deadline - self.now()).to_std().unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                return;
            }
            tokio::time::sleep(remaining.min(MAX_TIMER)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn returns_immediately_for_past_deadlines() {
        let clock = SystemClock;
        clock.sleep_until(clock.now() - Duration::hours(1)).await;
    }

    #[tokio::test]
    async fn sleeps_through_short_deadlines() {
        let clock = SystemClock;
        let deadline = clock.now() + Duration::milliseconds(20);
        clock.sleep_until(deadline).await;
        assert!(clock.now() >= deadline);
    }
}
