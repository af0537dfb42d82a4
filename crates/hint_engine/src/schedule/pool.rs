//! Worker pool for compositions
//!
//! Jobs are boxed closures pulled from a shared crossbeam channel. The queue
//! is unbounded so submitting never blocks the caller's timing loop. A job
//! that panics is logged and the worker keeps serving.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::{ScheduleError, ScheduleResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Simple thread pool for parallel execution
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
}

impl ThreadPool {
    /// Spawn `size` named workers
    pub fn new(size: usize) -> ScheduleResult<Self> {
        if size == 0 {
            return Err(ScheduleError::ZeroWorkers);
        }

        let (sender, receiver) = unbounded();
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            workers.push(Worker::new(id, receiver.clone())?);
        }

        log::debug!("Started thread pool with {} workers", size);
        Ok(ThreadPool { workers, sender: Some(sender) })
    }

    /// Queue a job without blocking; fails once the pool is shutting down
    pub fn execute<F>(&self, f: F) -> ScheduleResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(ScheduleError::PoolClosed)?;
        sender.send(Box::new(f)).map_err(|_| ScheduleError::PoolClosed)
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool").field("workers", &self.workers.len()).finish()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop once the queue drains
        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("Worker {} terminated abnormally", worker.id);
                }
            }
        }
    }
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, receiver: Receiver<Job>) -> ScheduleResult<Worker> {
        let thread = thread::Builder::new()
            .name(format!("hint-worker-{}", id))
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("Job on worker {} panicked", id);
                    }
                }
            })?;

        Ok(Worker { id, thread: Some(thread) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(ThreadPool::new(0), Err(ScheduleError::ZeroWorkers)));
    }

    #[test]
    fn test_runs_all_jobs_before_drop_returns() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(3).unwrap();
            assert_eq!(pool.size(), 3);
            for _ in 0..50 {
                let counter = Arc::clone(&counter);
                pool.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_execute_never_blocks_on_busy_workers() {
        let pool = ThreadPool::new(1).unwrap();
        let (release, gate) = crossbeam::channel::bounded::<()>(0);
        pool.execute(move || {
            let _ = gate.recv();
        })
        .unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        let submitter = std::thread::spawn({
            let counter = Arc::clone(&counter);
            move || {
                for _ in 0..500 {
                    let counter = Arc::clone(&counter);
                    pool.execute(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
                let _ = done_tx.send(());
                pool
            }
        });

        // every job is queued while the only worker is still held
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        release.send(()).unwrap();
        drop(submitter.join().unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 500);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = ThreadPool::new(1).unwrap();
        pool.execute(|| panic!("boom")).unwrap();

        let (tx, rx) = crossbeam::channel::bounded(1);
        pool.execute(move || {
            let _ = tx.send(42);
        })
        .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }
}
