//! Rendezvous between a command-issuing thread and the firmware thread that
//! completes the command.
//!
//! A [`SyncEvent`] couples a condition variable with the data handed over by
//! the completion. The issuing thread takes the guard *before* sending the
//! command and keeps it until [`SyncEventGuard::wait`] parks it, so the
//! completion (which needs the same guard) cannot signal before the waiter is
//! registered:
//!
//! ```ignore
//! let mut guard = event.lock();
//! firmware.request(callback)?;      // completion blocks on `event.lock()`
//! if !guard.wait_for(timeout) { /* hardware did not respond */ }
//! let result = std::mem::take(&mut *guard);
//! ```
//!
//! A notification sent while nobody waits is lost.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Single-waiter condition event carrying a value of type `T`
pub struct SyncEvent<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

struct Slot<T> {
    /// Bumped by every notification
    generation: u64,
    value: T,
}

impl<T> SyncEvent<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                generation: 0,
                value,
            }),
            cond: Condvar::new(),
        }
    }

    /// Acquire the event's guard
    pub fn lock(&self) -> SyncEventGuard<'_, T> {
        SyncEventGuard {
            cond: &self.cond,
            slot: self.slot.lock(),
        }
    }
}

impl<T: Default> Default for SyncEvent<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Scoped guard over a [`SyncEvent`]; dereferences to the carried value
pub struct SyncEventGuard<'a, T> {
    cond: &'a Condvar,
    slot: MutexGuard<'a, Slot<T>>,
}

impl<T> SyncEventGuard<'_, T> {
    /// Block until another thread calls [`SyncEventGuard::notify_one`].
    ///
    /// The guard is released while blocked and re-acquired before returning.
    pub fn wait(&mut self) {
        let seen = self.slot.generation;
        while self.slot.generation == seen {
            self.cond.wait(&mut self.slot);
        }
    }

    /// Block until notified or until `timeout` elapses.
    ///
    /// Returns `true` if notified, `false` on timeout.
    pub fn wait_for(&mut self, timeout: Duration) -> bool {
        let seen = self.slot.generation;
        let deadline = Instant::now() + timeout;
        while self.slot.generation == seen {
            if self.cond.wait_until(&mut self.slot, deadline).timed_out() {
                return self.slot.generation != seen;
            }
        }
        true
    }

    /// Wake the thread currently waiting on this event, if any
    pub fn notify_one(&mut self) {
        self.slot.generation = self.slot.generation.wrapping_add(1);
        self.cond.notify_one();
    }
}

impl<T> Deref for SyncEventGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.slot.value
    }
}

impl<T> DerefMut for SyncEventGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_notify_wakes_waiter_with_value() {
        let event = Arc::new(SyncEvent::new(0u8));
        let mut guard = event.lock();

        let notifier = {
            let event = event.clone();
            thread::spawn(move || {
                let mut guard = event.lock();
                *guard = 42;
                guard.notify_one();
            })
        };

        assert!(guard.wait_for(Duration::from_secs(5)));
        assert_eq!(*guard, 42);
        drop(guard);
        notifier.join().unwrap();
    }

    #[test]
    fn test_wait_times_out_without_notify() {
        let event = SyncEvent::new(());
        let mut guard = event.lock();
        let start = Instant::now();
        assert!(!guard.wait_for(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_notify_before_wait_is_lost() {
        let event = SyncEvent::new(());
        event.lock().notify_one();

        let mut guard = event.lock();
        assert!(!guard.wait_for(Duration::from_millis(20)));
    }

    #[test]
    fn test_guard_held_across_issue_never_misses_completion() {
        let event = Arc::new(SyncEvent::new(0u32));
        for round in 1..=200u32 {
            let mut guard = event.lock();
            let completion = {
                let event = event.clone();
                thread::spawn(move || {
                    let mut guard = event.lock();
                    *guard = round;
                    guard.notify_one();
                })
            };
            guard.wait();
            assert_eq!(*guard, round);
            drop(guard);
            completion.join().unwrap();
        }
    }
}
