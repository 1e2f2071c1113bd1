//! Scheduler entries and their run-queue ordering.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::job::Job;
use crate::schedule::Schedule;

/// A schedule paired with the job it fires, plus activation bookkeeping.
///
/// Snapshots returned by [`Cron::entries`](crate::Cron::entries) are value
/// copies: the schedule and timestamps are copied, the job handle is
/// shared.
#[derive(Clone)]
pub struct Entry {
    pub schedule: Schedule,
    pub job: Arc<dyn Job>,
    /// The upcoming activation. `None` before the loop has computed it,
    /// and forever for a schedule that can never fire.
    pub next: Option<DateTime<Local>>,
    /// The most recent activation, `None` until the first fire.
    pub prev: Option<DateTime<Local>>,
}

impl Entry {
    pub(crate) fn new(schedule: Schedule, job: Arc<dyn Job>) -> Self {
        Self {
            schedule,
            job,
            next: None,
            prev: None,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("schedule", &self.schedule)
            .field("next", &self.next)
            .field("prev", &self.prev)
            .finish_non_exhaustive()
    }
}

/// Run-queue order: soonest `next` first, entries that never fire last.
/// Two never-firing entries compare equal, so a stable sort keeps their
/// registration order.
pub(crate) fn by_next(a: &Entry, b: &Entry) -> Ordering {
    match (a.next, b.next) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}
