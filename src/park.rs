// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Thread parking, abstracted behind a trait the same way this workspace's
//! async runtime decouples its executor from a concrete thread model.
//!
//! A [`Park`] value is a *handle to one specific waiting thread*. Nodes in
//! the sync queue (see [`crate::node`]) each own one; `unpark`ing a node's
//! handle wakes exactly that thread and no other.

use core::time::Duration;

/// One thread's parking handle.
///
/// Implementors must provide one-shot "unpark token" semantics: an `unpark`
/// issued before the matching `park`/`park_timeout` call makes that call
/// return immediately, and tokens do not accumulate — two `unpark` calls
/// before one `park` still only satisfy a single `park`.
pub trait Park: Send + Sync + 'static {
    /// Captures a handle to the calling thread.
    fn current() -> Self
    where
        Self: Sized;

    /// Blocks the owning thread until `unpark` is called, or spuriously.
    /// Callers must always re-check their own condition in a loop.
    fn park(&self);

    /// As [`Park::park`], but returns after at most `timeout` even absent an
    /// `unpark` call.
    fn park_timeout(&self, timeout: Duration);

    /// Wakes the owning thread's next (or in-progress) `park` call.
    fn unpark(&self);
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::thread::{self, Thread};

        /// The default, OS-thread-backed [`Park`] implementation.
        ///
        /// Built directly on [`std::thread::park`]/[`Thread::unpark`], which
        /// already provide exactly the one-shot-token contract [`Park`]
        /// requires, so no extra bookkeeping is needed here.
        #[derive(Debug, Clone)]
        pub struct StdPark {
            thread: Thread,
        }

        impl StdPark {
            /// Captures a handle to the calling thread.
            #[must_use]
            pub fn for_current() -> Self {
                Self {
                    thread: thread::current(),
                }
            }
        }

        impl Park for StdPark {
            fn current() -> Self {
                Self::for_current()
            }

            fn park(&self) {
                debug_assert_eq!(thread::current().id(), self.thread.id());
                thread::park();
            }

            fn park_timeout(&self, timeout: Duration) {
                debug_assert_eq!(thread::current().id(), self.thread.id());
                thread::park_timeout(crate::time::clamp_duration(timeout));
            }

            fn unpark(&self) {
                self.thread.unpark();
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn unpark_before_park_still_returns_immediately() {
        let parker = StdPark::for_current();
        parker.unpark();
        parker.park(); // must not block: the unpark token was already set
    }

    #[test]
    fn unpark_tokens_do_not_accumulate() {
        let parker = StdPark::for_current();
        parker.unpark();
        parker.unpark();
        parker.park();
        // A second park call with no intervening unpark would block forever
        // here, so this test relies on `park_timeout` to prove the token
        // was indeed consumed rather than hang the suite.
        parker.park_timeout(Duration::from_millis(10));
    }
}
