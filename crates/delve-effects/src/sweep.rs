//! Background expiry sweep for the effect registry.

use crate::registry::EffectRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default interval between sweep rounds.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the background thread that detaches expired effects.
///
/// The sweeper only ever takes the registry's own lock, never the
/// world lock, so a long sweep cannot stall gameplay. Shutdown is
/// bounded: the flag is set, the thread is unparked out of its
/// between-rounds sleep, and the join happens promptly.
pub struct EffectSweeper {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EffectSweeper {
    /// Spawn the sweep thread over `registry`, sweeping every
    /// `interval`.
    pub fn spawn(registry: Arc<EffectRegistry>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("delve-effect-sweep".into())
            .spawn(move || loop {
                if flag.load(Ordering::Acquire) {
                    break;
                }
                let removed = registry.sweep_expired(Instant::now());
                if removed > 0 {
                    debug!(removed, "swept expired effects");
                }
                thread::park_timeout(interval);
            })
            .expect("failed to spawn effect sweep thread");
        Self {
            shutdown,
            thread: Some(thread),
        }
    }

    /// Stop the sweep thread and join it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for EffectSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
