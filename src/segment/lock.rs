//! Cross-process lock word.
//!
//! One `AtomicU32` per segment, embedded in the shared header, so every
//! process that maps the segment contends on the same cache line.
//! Acquisition spins briefly, then backs off to short sleeps; a caller
//! deadline turns indefinite waits into [`Error::LockTimeout`]. There is no
//! shared/reader mode: readers acquire exclusively.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Lock word value when free.
pub(crate) const UNLOCKED: u32 = 0;
/// Lock word value when held.
pub(crate) const LOCKED: u32 = 1;

/// Spin iterations before backing off to sleeps.
const SPIN_LIMIT: u32 = 100;
/// Sleep interval once spinning has given up.
const BACKOFF: Duration = Duration::from_micros(50);

/// Acquire the lock word, blocking until it is free or the timeout lapses.
pub(crate) fn acquire(word: &AtomicU32, segment: &str, timeout: Option<Duration>) -> Result<()> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut spins = 0u32;
    loop {
        if word
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(());
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(Error::LockTimeout(segment.to_string()));
            }
        }
        if spins < SPIN_LIMIT {
            spins += 1;
            std::hint::spin_loop();
        } else {
            std::thread::sleep(BACKOFF);
        }
    }
}

/// Release a held lock word.
pub(crate) fn release(word: &AtomicU32) {
    word.store(UNLOCKED, Ordering::Release);
}
