//! Fixed-size worker pool draining a shared FIFO job queue.

use std::collections::VecDeque;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    halted: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Worker threads consuming queued closures in submission order.
///
/// Halting is cooperative: a worker finishes the job it is running and then
/// exits without taking another. A panicking job is logged and the worker
/// carries on.
pub struct JobPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobPool {
    /// Creates a pool and starts `threads` workers.
    #[must_use]
    pub fn new(threads: usize) -> Self {
        let pool = Self {
            shared: Arc::new(Shared::default()),
            workers: Mutex::new(Vec::new()),
        };
        pool.spawn_workers(threads);
        pool
    }

    /// Restarts the pool with `threads` workers, stopping any running ones.
    pub fn start(&self, threads: usize) {
        if self.thread_count() > 0 {
            self.halt();
            self.join();
        }
        self.shared.lock().halted = false;
        self.spawn_workers(threads);
    }

    /// Queues `job`. Returns `false` without queuing when the pool is halted.
    #[must_use]
    pub fn add_job<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.lock();
        if queue.halted {
            return false;
        }
        queue.jobs.push_back(Box::new(job));
        drop(queue);
        self.shared.available.notify_one();
        true
    }

    /// Asks every worker to exit after its current job.
    pub fn halt(&self) {
        self.shared.lock().halted = true;
        self.shared.available.notify_all();
    }

    /// Waits for every worker to exit. Call [`JobPool::halt`] first.
    ///
    /// Must not be called from inside a job.
    pub fn join(&self) {
        let workers = mem::take(&mut *self.lock_workers());
        for worker in workers {
            if worker.join().is_err() {
                warn!(target: POOL_TARGET, "worker thread panicked");
            }
        }
    }

    /// Discards every queued job that has not started and restarts the same
    /// number of workers.
    ///
    /// Must not be called from inside a job.
    pub fn drop_unstarted_jobs(&self) {
        let threads = self.thread_count();
        self.halt();
        self.join();
        let discarded = {
            let mut queue = self.shared.lock();
            queue.halted = false;
            mem::take(&mut queue.jobs)
        };
        debug!(
            target: POOL_TARGET,
            discarded = discarded.len(),
            "dropped unstarted jobs"
        );
        drop(discarded);
        self.spawn_workers(threads);
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.lock_workers().len()
    }

    /// Whether workers have been told to exit.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.shared.lock().halted
    }

    /// Jobs waiting for a worker.
    #[must_use]
    pub fn queued_jobs(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_workers(&self, threads: usize) {
        let mut workers = self.lock_workers();
        for index in 0..threads {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("keyspace-worker-{index}"))
                .spawn(move || run_worker(&shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => warn!(
                    target: POOL_TARGET,
                    error = %error,
                    "failed to spawn worker thread"
                ),
            }
        }
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        self.halt();
        self.join();
    }
}

fn run_worker(shared: &Shared) {
    while let Some(job) = next_job(shared) {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(target: POOL_TARGET, "job panicked; worker continues");
        }
    }
}

fn next_job(shared: &Shared) -> Option<Job> {
    let mut queue = shared.lock();
    loop {
        if queue.halted {
            return None;
        }
        if let Some(job) = queue.jobs.pop_front() {
            return Some(job);
        }
        queue = shared
            .available
            .wait(queue)
            .unwrap_or_else(PoisonError::into_inner);
    }
}
