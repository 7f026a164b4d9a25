// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Per-thread cancellation tokens standing in for a platform interrupt flag.
//!
//! The source model gives every thread a built-in interrupt flag and lets
//! any other thread set it, and setting it also promptly wakes that thread
//! if it is parked. Rust has no such ambient flag, so each thread that
//! intends to park on a [`crate::sync::Synchronizer`] creates an explicit,
//! clonable [`Interrupt`] bound to its own parking handle and hands clones
//! to whoever should be able to cancel it — the same shape this workspace
//! uses for its `UnparkToken`, a clonable wrapper around a parking handle
//! used both to park and to signal.

use crate::loom::sync::atomic::{AtomicBool, Ordering};
use crate::loom::sync::Arc;
use crate::park::Park;

/// A shared, thread-safe cancellation flag bound to the parking handle of
/// the thread it cancels.
///
/// Cloning an `Interrupt` yields another handle to the *same* flag and the
/// *same* underlying thread: calling [`Interrupt::interrupt`] through any
/// clone both sets the flag and unparks that thread so it promptly observes
/// it.
pub struct Interrupt<K> {
    flag: Arc<AtomicBool>,
    parker: K,
}

impl<K: Clone> Clone for Interrupt<K> {
    fn clone(&self) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            parker: self.parker.clone(),
        }
    }
}

impl<K: Park> Interrupt<K> {
    /// Creates a fresh, uninterrupted token bound to the calling thread.
    #[must_use]
    pub fn for_current() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parker: K::current(),
        }
    }

    /// Sets the flag and wakes the bound thread if it is currently parked.
    /// Safe to call from any thread, any number of times.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
        self.parker.unpark();
    }

    /// Returns whether the flag is currently set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Atomically clears the flag and returns its previous value.
    ///
    /// Used by `awaitUninterruptibly`-style paths that must remember an
    /// interrupt without acting on it until the very end.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn parker(&self) -> &K {
        &self.parker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::park::StdPark;

    #[test]
    fn starts_clear() {
        let interrupt: Interrupt<StdPark> = Interrupt::for_current();
        assert!(!interrupt.is_set());
    }

    #[test]
    fn interrupt_sets_the_flag_on_every_clone() {
        let interrupt: Interrupt<StdPark> = Interrupt::for_current();
        let clone = interrupt.clone();
        clone.interrupt();
        assert!(interrupt.is_set());
    }

    #[test]
    fn take_clears_and_returns_previous_value() {
        let interrupt: Interrupt<StdPark> = Interrupt::for_current();
        interrupt.interrupt();
        assert!(interrupt.take());
        assert!(!interrupt.is_set());
        assert!(!interrupt.take());
    }
}
