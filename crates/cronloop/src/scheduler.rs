//! The scheduler: a single loop task owns the entry registry and serves
//! add, snapshot, and stop requests over a command mailbox.
//!
//! No lock guards the registry. The loop is its only owner; everything
//! else reaches it by message, and the loop suspends in exactly one place,
//! the select between the activation timer and the mailbox.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::clock::{Clock, SystemClock};
use crate::entry::{self, Entry};
use crate::error::{Error, Result};
use crate::job::{FnJob, Job};
use crate::schedule::Schedule;

/// Lifecycle of a [`Cron`]. Transitions run one way:
/// `Idle` to `Running` to `Stopped`; there is no restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Stopped,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

fn state_from(raw: u8) -> State {
    match raw {
        IDLE => State::Idle,
        RUNNING => State::Running,
        _ => State::Stopped,
    }
}

/// How far ahead the loop parks when no entry can fire. Far beyond any
/// plausible reconfiguration latency; adds and stops still wake the loop
/// through the mailbox.
const IDLE_PARK_DAYS: i64 = 365 * 10;

enum Command {
    Add(Entry),
    Snapshot(oneshot::Sender<Vec<Entry>>),
    Stop(oneshot::Sender<Vec<Entry>>),
}

/// An in-process cron scheduler.
///
/// Jobs are registered against cron expressions (see
/// [`Schedule::parse`] for the syntax), [`start`](Cron::start) launches the
/// loop task, and due jobs fire on detached workers so a slow or panicking
/// job never stalls the loop or its siblings.
///
/// ```no_run
/// use cronloop::Cron;
///
/// # async fn demo() -> cronloop::Result<()> {
/// let cron = Cron::new();
/// cron.add_fn("0 30 * * * *", || println!("half past")).await?;
/// cron.start()?;
/// // ... the loop fires jobs in the background ...
/// cron.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Cron {
    state: AtomicU8,
    clock: Arc<dyn Clock>,
    /// Entries staged before `start`; holds the final registry after
    /// `stop` so snapshots keep answering.
    parked: Mutex<Vec<Entry>>,
    commands: mpsc::Sender<Command>,
    /// Handed to the loop task by `start`.
    inbox: Mutex<Option<mpsc::Receiver<Command>>>,
}

impl Cron {
    /// A scheduler on the system's local clock, in the idle state.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A scheduler on a caller-supplied clock. Tests use this to pin time.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        // Capacity 1: senders rendezvous with the loop instead of queueing.
        let (commands, inbox) = mpsc::channel(1);
        Self {
            state: AtomicU8::new(IDLE),
            clock,
            parked: Mutex::new(Vec::new()),
            commands,
            inbox: Mutex::new(Some(inbox)),
        }
    }

    pub fn state(&self) -> State {
        state_from(self.state.load(Ordering::SeqCst))
    }

    /// Register a closure to run on the given schedule.
    pub async fn add_fn<F>(&self, expression: &str, f: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_job(expression, FnJob(f)).await
    }

    /// Compile `expression` and register `job` against it.
    ///
    /// Before `start` the entry is staged directly. While the scheduler is
    /// running it is handed to the loop and becomes eligible before the
    /// next firing. After `stop` this is an error.
    pub async fn add_job<J: Job>(&self, expression: &str, job: J) -> Result<()> {
        let schedule = Schedule::parse(expression)?;
        let entry = Entry::new(schedule, Arc::new(job));

        if self.state() == State::Idle {
            let mut parked = self.parked.lock();
            // Re-check under the lock: start() flips the state before it
            // drains this list, so an entry staged here is never stranded.
            if self.state() == State::Idle {
                parked.push(entry);
                return Ok(());
            }
        }

        match self.state() {
            State::Running => self
                .commands
                .send(Command::Add(entry))
                .await
                .map_err(|_| Error::Stopped),
            _ => Err(Error::Stopped),
        }
    }

    /// Launch the loop task. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(match self.state() {
                State::Stopped => Error::Stopped,
                _ => Error::AlreadyStarted,
            });
        }

        let Some(inbox) = self.inbox.lock().take() else {
            return Err(Error::AlreadyStarted);
        };
        let entries = std::mem::take(&mut *self.parked.lock());
        tracing::debug!(entries = entries.len(), "starting scheduler");

        let runner = Runner {
            entries,
            inbox,
            clock: Arc::clone(&self.clock),
        };
        tokio::spawn(runner.run());
        Ok(())
    }

    /// A value snapshot of the current entries: in registration order
    /// before `start`, in run-queue order once the loop has taken over.
    pub async fn entries(&self) -> Vec<Entry> {
        if self.state() == State::Running {
            let (reply, response) = oneshot::channel();
            if self.commands.send(Command::Snapshot(reply)).await.is_ok() {
                if let Ok(entries) = response.await {
                    return entries;
                }
            }
            // The loop went away between the state check and the send;
            // fall through to the parked registry.
        }
        self.parked.lock().clone()
    }

    /// Stop the loop. Blocks until the loop has accepted the signal; jobs
    /// already dispatched keep running on their detached workers.
    pub async fn stop(&self) -> Result<()> {
        if self.state() != State::Running {
            return Err(Error::NotRunning);
        }
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Stop(ack))
            .await
            .map_err(|_| Error::Stopped)?;
        let remaining = done.await.map_err(|_| Error::Stopped)?;
        *self.parked.lock() = remaining;
        self.state.store(STOPPED, Ordering::SeqCst);
        tracing::debug!("scheduler stopped");
        Ok(())
    }
}

impl Default for Cron {
    fn default() -> Self {
        Self::new()
    }
}

/// The loop task. Sole owner of the live registry.
struct Runner {
    entries: Vec<Entry>,
    inbox: mpsc::Receiver<Command>,
    clock: Arc<dyn Clock>,
}

impl Runner {
    async fn run(mut self) {
        let mut now = self.clock.now();
        for entry in &mut self.entries {
            entry.next = entry.schedule.next(&now);
        }

        loop {
            // The head of the sorted registry decides how long to sleep;
            // entries that never fire sort last and an empty registry
            // parks far out.
            self.entries.sort_by(entry::by_next);
            let effective = match self.entries.first().and_then(|e| e.next) {
                Some(next) => next,
                None => now + Duration::days(IDLE_PARK_DAYS),
            };

            let clock = Arc::clone(&self.clock);
            tokio::select! {
                () = clock.sleep_until(effective) => {
                    now = self.clock.now();
                    self.dispatch_due(effective);
                }
                command = self.inbox.recv() => match command {
                    Some(Command::Add(mut entry)) => {
                        now = self.clock.now();
                        entry.next = entry.schedule.next(&now);
                        tracing::debug!(next = ?entry.next, "entry added");
                        self.entries.push(entry);
                    }
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.entries.clone());
                    }
                    Some(Command::Stop(ack)) => {
                        let _ = ack.send(std::mem::take(&mut self.entries));
                        return;
                    }
                    // All handles dropped; nothing can reach the loop.
                    None => return,
                },
            }
        }
    }

    /// Fire every entry due at `effective`. The registry is sorted, so
    /// the scan ends at the first entry with a different activation time.
    fn dispatch_due(&mut self, effective: DateTime<Local>) {
        for entry in &mut self.entries {
            if entry.next != Some(effective) {
                break;
            }
            tracing::debug!(at = %effective, "dispatching job");
            dispatch(Arc::clone(&entry.job));
            entry.prev = entry.next;
            entry.next = entry.schedule.next(&effective);
        }
    }
}

/// Run a job on a detached blocking worker. A panic inside `run` is caught
/// and logged; the loop never observes it.
fn dispatch(job: Arc<dyn Job>) {
    tokio::task::spawn_blocking(move || {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job.run())) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            tracing::error!(panic = %message, "job panicked");
        }
    });
}
