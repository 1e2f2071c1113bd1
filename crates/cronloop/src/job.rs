//! The job capability and the closure adapter.

/// A unit of work the scheduler fires.
///
/// `run` is invoked on a detached worker with no return value and no
/// declared failure mode; whatever goes wrong inside is the job's own
/// concern. A panic is caught, logged, and dropped without ever reaching
/// the scheduler loop.
pub trait Job: Send + Sync + 'static {
    fn run(&self);
}

/// Wraps a bare closure so it can be submitted where a [`Job`] is expected.
pub(crate) struct FnJob<F>(pub(crate) F);

impl<F> Job for FnJob<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn run(&self) {
        (self.0)();
    }
}
