//! Update scheduling
//!
//! Decides *when* a session recomputes its payload:
//! - [`estimator`]: per-element prediction of the next natural update
//! - [`timer`]: merge-policy action timer and a pausable repeating ticker
//! - [`sync`]: sync-speed piggybacking between elements
//! - [`pool`]: worker threads that run compositions off the timing loop

pub mod estimator;
pub mod timer;
pub mod sync;
pub mod pool;

pub use estimator::UpdateEstimator;
pub use timer::{ActionTimer, MergePolicy, RepeatingTimer};
pub use sync::{sync_deadline, SyncSpeed};
pub use pool::ThreadPool;

/// Result type for scheduling primitives
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors raised by scheduling primitives
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A repeating timer needs a non-zero period
    #[error("Timer interval must be greater than zero")]
    ZeroInterval,

    /// A worker pool needs at least one thread
    #[error("Thread pool needs at least one worker")]
    ZeroWorkers,

    /// The pool has shut down and accepts no more jobs
    #[error("Thread pool is closed")]
    PoolClosed,

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
