//! Process-wide shutdown coordination.
//! The Ctrl-C handler sets the flag; batch loops (trash, restore, purge) and the copy
//! workers check it between items so the item in flight completes and the rest are
//! reported as interrupted.
//!
//! Relaxed atomics are sufficient for a one-way "stop" flag, and `request()` is safe to
//! call from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Check whether a shutdown has been requested.
#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
