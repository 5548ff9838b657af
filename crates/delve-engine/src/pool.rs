//! Bounded worker pool executing enemy-tick jobs.
//!
//! Sized from the board (3% of cells, clamped to `[1, 10]`) so a slow
//! or stuck enemy action cannot starve the scheduling of the others.
//! A panic inside a job is contained: it is caught, logged, and the
//! worker keeps serving — a single failed tick never silences an
//! enemy's later ticks.

use crossbeam_channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of named worker threads draining a job channel.
pub(crate) struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers.
    pub fn new(count: usize) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..count)
            .map(|i| {
                let rx = job_rx.clone();
                thread::Builder::new()
                    .name(format!("delve-enemy-{i}"))
                    .spawn(move || worker_loop(rx))
                    .expect("failed to spawn enemy worker")
            })
            .collect();
        Self {
            job_tx: Some(job_tx),
            workers,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job. Silently dropped once the pool is shut down.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.job_tx {
            let _ = tx.send(Box::new(job));
        }
    }

    /// Orderly shutdown: close the channel, await workers for `grace`,
    /// then detach anything still busy.
    pub fn shutdown(&mut self, grace: Duration) {
        self.job_tx.take();

        let deadline = Instant::now() + grace;
        while self.workers.iter().any(|w| !w.is_finished()) {
            if Instant::now() >= deadline {
                break;
            }
            thread::yield_now();
        }

        let mut detached = 0;
        for handle in self.workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                detached += 1;
            }
        }
        if detached > 0 {
            warn!(detached, "worker threads detached after grace period");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.job_tx.is_some() || !self.workers.is_empty() {
            self.shutdown(Duration::from_millis(200));
        }
    }
}

fn worker_loop(rx: Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            debug!("enemy tick panicked; worker continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn jobs_run_on_the_pool() {
        let mut pool = WorkerPool::new(3);
        assert_eq!(pool.size(), 3);

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..32 {
            let c = Arc::clone(&counter);
            pool.execute(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while counter.load(Ordering::SeqCst) < 32 {
            if Instant::now() > deadline {
                panic!("jobs did not complete within 2s");
            }
            thread::yield_now();
        }
        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn a_panicking_job_does_not_kill_the_worker() {
        let mut pool = WorkerPool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.execute(|| panic!("tick exploded"));
        let c = Arc::clone(&counter);
        pool.execute(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let deadline = Instant::now() + Duration::from_secs(2);
        while counter.load(Ordering::SeqCst) == 0 {
            if Instant::now() > deadline {
                panic!("follow-up job never ran");
            }
            thread::yield_now();
        }
        pool.shutdown(Duration::from_secs(1));
    }

    #[test]
    fn shutdown_is_bounded_and_idempotent() {
        let mut pool = WorkerPool::new(2);
        let start = Instant::now();
        pool.shutdown(Duration::from_secs(1));
        pool.shutdown(Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(pool.workers.is_empty());
    }
}
