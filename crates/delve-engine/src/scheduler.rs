//! Single-thread delay scheduler for tick re-arm and periodic events.
//!
//! Entries arrive over a crossbeam channel and sit in a min-heap by
//! due time; the scheduler thread parks until the next deadline (or an
//! unpark from a new submission) and hands due entries to the dispatch
//! callback on its own thread. Enemy ticks are single-shot — each
//! completed tick submits its own successor with fresh jitter — so a
//! dead enemy's chain simply stops.

use crossbeam_channel::{Receiver, Sender};
use delve_core::EntityId;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

/// Longest the scheduler thread sleeps without rechecking its channel.
const IDLE_PARK: Duration = Duration::from_millis(100);

/// What a scheduled entry fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Due {
    /// One autonomous action for the given enemy.
    EnemyTick(EntityId),
    /// The world-wide magic-wave event.
    GlobalEvent,
    /// Regeneration application and other housekeeping.
    Maintenance,
}

struct Entry {
    at: Instant,
    seq: u64,
    due: Due,
}

// Min-heap ordering by (due time, submission sequence).
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

/// Owns the scheduler thread.
pub(crate) struct Scheduler {
    tx: Sender<Entry>,
    waker: Thread,
    seq: AtomicU64,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the scheduler thread. `dispatch` is invoked on that
    /// thread for every due entry.
    pub fn spawn(dispatch: impl Fn(Due) + Send + 'static) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<Entry>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("delve-scheduler".into())
            .spawn(move || scheduler_loop(rx, flag, dispatch))
            .expect("failed to spawn scheduler thread");
        let waker = thread.thread().clone();
        Self {
            tx,
            waker,
            seq: AtomicU64::new(0),
            shutdown,
            thread: Some(thread),
        }
    }

    /// Enqueue `due` to fire after `delay`. Silently dropped once the
    /// scheduler is shut down.
    pub fn schedule(&self, delay: Duration, due: Due) {
        let entry = Entry {
            at: Instant::now() + delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            due,
        };
        if self.tx.send(entry).is_ok() {
            self.waker.unpark();
        }
    }

    /// Stop the scheduler thread and join it. Pending entries are
    /// discarded.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.waker.unpark();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scheduler_loop(rx: Receiver<Entry>, shutdown: Arc<AtomicBool>, dispatch: impl Fn(Due)) {
    let mut heap: BinaryHeap<Entry> = BinaryHeap::new();
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        while let Ok(entry) = rx.try_recv() {
            heap.push(entry);
        }

        let now = Instant::now();
        while heap.peek().is_some_and(|e| e.at <= now) {
            let entry = heap.pop().expect("peeked entry");
            dispatch(entry.due);
        }

        let sleep = heap
            .peek()
            .map(|e| e.at.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_PARK)
            .min(IDLE_PARK);
        thread::park_timeout(sleep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn entries_fire_in_due_order() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let mut sched = Scheduler::spawn(move |due| {
            sink.lock().unwrap().push(due);
        });

        let a = EntityId::next();
        let b = EntityId::next();
        sched.schedule(Duration::from_millis(80), Due::EnemyTick(b));
        sched.schedule(Duration::from_millis(20), Due::EnemyTick(a));

        let deadline = Instant::now() + Duration::from_secs(2);
        while fired.lock().unwrap().len() < 2 {
            if Instant::now() > deadline {
                panic!("entries did not fire within 2s");
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(
            *fired.lock().unwrap(),
            vec![Due::EnemyTick(a), Due::EnemyTick(b)]
        );
        sched.shutdown();
    }

    #[test]
    fn shutdown_discards_pending_entries() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let mut sched = Scheduler::spawn(move |due| {
            sink.lock().unwrap().push(due);
        });

        sched.schedule(Duration::from_secs(60), Due::GlobalEvent);
        sched.shutdown();
        assert!(fired.lock().unwrap().is_empty());
    }

    #[test]
    fn shutdown_is_prompt_despite_long_sleeps() {
        let mut sched = Scheduler::spawn(|_| {});
        sched.schedule(Duration::from_secs(3600), Due::Maintenance);
        let start = Instant::now();
        sched.shutdown();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
