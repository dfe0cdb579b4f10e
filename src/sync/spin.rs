//! Busy-wait spin lock
//!
//! A minimal mutual-exclusion primitive built on a single atomic flag. Waiters
//! never park on a kernel wait queue: every failed acquisition attempt yields
//! the thread's time slice back to the scheduler and retries.
//!
//! The lock is bare:
//! - no fairness (any waiter may win the next compare-and-swap)
//! - no recursion (re-locking from the holder deadlocks)
//! - no timeout (a holder that never releases starves every waiter)
//!
//! Release is tied to [`SpinLockGuard`], so the flag is cleared on every exit
//! path of the critical section, including unwinding.
//!
//! # Example
//!
//! ```
//! use stresspulse::sync::SpinLock;
//!
//! let lock = SpinLock::new();
//! {
//!     let _guard = lock.lock();
//!     assert!(lock.is_locked());
//! }
//! assert!(!lock.is_locked());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Spin lock over a single `AtomicBool` (false = unlocked, true = locked)
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    /// Create a new, unlocked spin lock
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, yielding between failed attempts
    ///
    /// Blocks the calling thread until the flag transitions from unlocked to
    /// locked. The returned guard releases the lock when dropped.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            std::thread::yield_now();
        }
    }

    /// Try to acquire the lock exactly once
    ///
    /// May fail spuriously even when the lock is free.
    #[inline]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_>> {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinLockGuard { lock: self })
    }

    /// Whether some thread currently holds the lock
    ///
    /// Only a hint: the answer may be stale by the time the caller acts on it.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    #[inline]
    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Scoped holder of a [`SpinLock`]; unlocks on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinLockGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl fmt::Debug for SpinLockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpinLockGuard")
    }
}
