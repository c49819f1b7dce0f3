//! Atomic wait/notify shims used by the blocking primitives.
//!
//! Native targets rely on the `atomic-wait` crate (futex-backed where
//! available). Waits may wake spuriously; callers re-check their condition.

use std::sync::atomic::{AtomicU32, Ordering};

/// Blocks the caller while `atomic` still holds `expected`.
#[inline]
pub fn wait_u32(atomic: &AtomicU32, expected: u32) {
    atomic_wait::wait(atomic, expected);
}

/// Wakes all waiters parked on `atomic`.
#[inline]
pub fn wake_all(atomic: &AtomicU32) {
    atomic_wait::wake_all(atomic as *const AtomicU32);
}

/// Parks until `atomic` no longer equals `value`, returning the new value.
pub fn wait_while_eq(atomic: &AtomicU32, value: u32) -> u32 {
    loop {
        let current = atomic.load(Ordering::Acquire);
        if current != value {
            return current;
        }
        wait_u32(atomic, value);
    }
}
