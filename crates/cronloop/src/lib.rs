//! In-process cron scheduler with second-resolution schedules.
//!
//! Expressions compile to compact bit-set [`Schedule`]s. A [`Cron`] holds a
//! registry of entries and runs a single loop task that sleeps until the
//! soonest activation, fires due jobs on detached workers, and serves
//! add/snapshot/stop requests over a message mailbox. The registry has no
//! locks; the loop is its only owner.
//!
//! ```text
//! ┌───────────── second (0-59)
//! │ ┌───────────── minute (0-59)
//! │ │ ┌───────────── hour (0-23)
//! │ │ │ ┌───────────── day of month (1-31)
//! │ │ │ │ ┌───────────── month (1-12, Jan-Dec)
//! │ │ │ │ │ ┌───────────── day of week (0-7, 0/7=Sunday, Sun-Sat)
//! │ │ │ │ │ │
//! * * * * * *
//! ```
//!
//! ```no_run
//! use cronloop::Cron;
//!
//! # async fn demo() -> cronloop::Result<()> {
//! let cron = Cron::new();
//! cron.add_fn("*/5 * * * * *", || println!("five seconds")).await?;
//! cron.add_fn("@hourly", || println!("top of the hour")).await?;
//! cron.start()?;
//! // ... jobs fire in the background ...
//! cron.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod entry;
pub mod error;
pub mod job;
pub mod schedule;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use entry::Entry;
pub use error::{Error, ParseError, Result};
pub use job::Job;
pub use schedule::{Schedule, Upcoming};
pub use scheduler::{Cron, State};
