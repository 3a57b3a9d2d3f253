//! Module: lifecycle
//! Responsibility: coordinate readers with schema generations in progress.
//! Does not own: index contents (see `index`) or installation logic.
//!
//! Invariants:
//! - Installers publish the new index before ending their generation, so a
//!   waiter woken by the end of a generation always sees its index.
//! - Waiters block only while at least one generation is pending.

use parking_lot::{Condvar, Mutex};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

///
/// WaitOutcome
///

#[derive(Debug, Eq, PartialEq)]
pub enum WaitOutcome<T> {
    Ready(T),
    /// Nothing found and no generation in progress.
    Idle,
    TimedOut,
}

///
/// LockState
///

#[derive(Debug, Default)]
struct LockState {
    pending: usize,
    installed: u64,
}

///
/// SchemaLock
///

#[derive(Debug, Default)]
pub struct SchemaLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl SchemaLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a generation in progress; it ends when the guard drops.
    #[must_use]
    pub fn begin_generation(self: &Arc<Self>) -> GenerationGuard {
        self.state.lock().pending += 1;

        GenerationGuard {
            lock: Arc::clone(self),
        }
    }

    /// Record a published generation and wake every waiter.
    pub fn notify_installed(&self) {
        self.state.lock().installed += 1;
        self.changed.notify_all();
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    #[must_use]
    pub fn installed(&self) -> u64 {
        self.state.lock().installed
    }

    /// Run `probe` until it yields a value. Between attempts, block while a
    /// generation is pending, up to `timeout` overall.
    pub fn wait_until<T>(
        &self,
        timeout: Option<Duration>,
        mut probe: impl FnMut() -> Option<T>,
    ) -> WaitOutcome<T> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(value) = probe() {
                return WaitOutcome::Ready(value);
            }

            let mut state = self.state.lock();
            if state.pending == 0 {
                drop(state);
                // a generation may have been published between probe and lock
                return probe().map_or(WaitOutcome::Idle, WaitOutcome::Ready);
            }

            let seen = state.installed;
            while state.pending > 0 && state.installed == seen {
                match deadline {
                    Some(deadline) => {
                        if self.changed.wait_until(&mut state, deadline).timed_out() {
                            drop(state);
                            return probe().map_or(WaitOutcome::TimedOut, WaitOutcome::Ready);
                        }
                    }
                    None => self.changed.wait(&mut state),
                }
            }
        }
    }

    fn end_generation(&self) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        drop(state);

        self.changed.notify_all();
    }
}

///
/// GenerationGuard
///
/// Marks one generation in progress. Dropping it without installing
/// releases waiters all the same.
///

#[derive(Debug)]
pub struct GenerationGuard {
    lock: Arc<SchemaLock>,
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.lock.end_generation();
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        thread,
    };

    #[test]
    fn idle_lock_does_not_block() {
        let lock = SchemaLock::new();

        assert_eq!(lock.wait_until(None, || None::<u8>), WaitOutcome::Idle);
        assert_eq!(lock.wait_until(None, || Some(7)), WaitOutcome::Ready(7));
    }

    #[test]
    fn waiter_resumes_after_publish() {
        let lock = Arc::new(SchemaLock::new());
        let published = Arc::new(AtomicBool::new(false));
        let guard = lock.begin_generation();

        let waiter = {
            let lock = Arc::clone(&lock);
            let published = Arc::clone(&published);
            thread::spawn(move || {
                lock.wait_until(None, || published.load(Ordering::SeqCst).then_some("index"))
            })
        };

        thread::sleep(Duration::from_millis(20));
        published.store(true, Ordering::SeqCst);
        lock.notify_installed();
        drop(guard);

        assert_eq!(waiter.join().expect("waiter should finish"), WaitOutcome::Ready("index"));
        assert_eq!(lock.pending(), 0);
        assert_eq!(lock.installed(), 1);
    }

    #[test]
    fn abandoned_generation_releases_waiters() {
        let lock = Arc::new(SchemaLock::new());
        let guard = lock.begin_generation();

        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || lock.wait_until(None, || None::<u8>))
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);

        assert_eq!(waiter.join().expect("waiter should finish"), WaitOutcome::Idle);
    }

    #[test]
    fn bounded_wait_times_out() {
        let lock = Arc::new(SchemaLock::new());
        let _guard = lock.begin_generation();

        let outcome = lock.wait_until(Some(Duration::from_millis(10)), || None::<u8>);

        assert_eq!(outcome, WaitOutcome::TimedOut);
    }
}
