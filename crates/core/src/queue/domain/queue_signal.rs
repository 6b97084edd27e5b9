use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Change counter shared by everything in one process that touches the queue.
///
/// Writers bump the generation after every enqueue, progress publish and
/// result write; waiters block until the generation moves or their fixed
/// polling interval elapses, whichever comes first. Writers in another
/// process never bump it, so waiters degrade to plain interval polling.
#[derive(Debug, Default)]
pub struct QueueSignal {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl QueueSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn notify(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation = generation.wrapping_add(1);
        self.changed.notify_all();
    }

    /// Block until the generation differs from `seen` or `timeout` elapses.
    /// Returns the generation observed on wake-up.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> u64 {
        let guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |generation| *generation == seen)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}
