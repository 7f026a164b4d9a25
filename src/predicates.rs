// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The user-supplied callback contract.
//!
//! The source models this as a set of overridable protected methods on an
//! abstract base class, with direct inherited access to the synchronizer's
//! `getState`/`setState`/`compareAndSetState`. This workspace never uses
//! subclassing as a plug-in mechanism — its `lock_api`-based primitives take
//! the user's behavior as a type parameter implementing a trait instead, and
//! since Rust has no protected-method equivalent for the state accessors,
//! every call here is handed a short-lived [`State`] borrow in place of
//! inherited access. `Predicates` is that trait: implement it on your own
//! marker type and pass it to
//! [`Synchronizer::new`](crate::sync::Synchronizer::new).
//!
//! Every method defaults to panicking with a descriptive message, so a
//! synchronizer that only ever uses exclusive mode need not implement the
//! shared-mode hooks, and vice versa.

use crate::state::State;

/// Result of a shared-mode acquire attempt.
///
/// Negative means "failed", zero means "acquired, no cascade", positive
/// means "acquired, and the next queued shared waiter should also be woken
/// to attempt concurrently".
pub type SharedAcquireResult = i32;

/// The capability record a concrete synchronizer (mutex, latch, semaphore,
/// ...) implements to plug its state-transition logic into the generic
/// acquire/release engine.
///
/// `Arg` is whatever extra context an acquire/release call needs beyond the
/// synchronizer's own state cell (often `()`).
pub trait Predicates {
    /// Extra argument threaded through every acquire/release call.
    type Arg;

    /// Attempt to transition `state` for an exclusive acquire.
    ///
    /// `is_queued` is `true` when the caller already sits at the head of the
    /// sync queue (so fairness policies may refuse an acquire here that a
    /// barging fast-path caller would have accepted). Must be side-effect
    /// free on failure.
    ///
    /// # Panics
    ///
    /// The default implementation panics; override it if this synchronizer
    /// supports exclusive acquire.
    fn try_acquire_exclusive(&self, state: State<'_>, is_queued: bool, arg: &Self::Arg) -> bool {
        let _ = (state, is_queued, arg);
        unimplemented!("this synchronizer does not support exclusive acquire")
    }

    /// Adjust `state` for an exclusive release. Returns `true` iff the
    /// synchronizer is now fully released and successors may attempt.
    ///
    /// # Panics
    ///
    /// The default implementation panics; override it if this synchronizer
    /// supports exclusive release.
    fn try_release_exclusive(&self, state: State<'_>, arg: &Self::Arg) -> bool {
        let _ = (state, arg);
        unimplemented!("this synchronizer does not support exclusive release")
    }

    /// Attempt to transition `state` for a shared acquire.
    ///
    /// # Panics
    ///
    /// The default implementation panics; override it if this synchronizer
    /// supports shared acquire.
    fn try_acquire_shared(
        &self,
        state: State<'_>,
        is_queued: bool,
        arg: &Self::Arg,
    ) -> SharedAcquireResult {
        let _ = (state, is_queued, arg);
        unimplemented!("this synchronizer does not support shared acquire")
    }

    /// Adjust `state` for a shared release. Returns `true` iff the
    /// synchronizer is now fully released.
    ///
    /// # Panics
    ///
    /// The default implementation panics; override it if this synchronizer
    /// supports shared release.
    fn try_release_shared(&self, state: State<'_>, arg: &Self::Arg) -> bool {
        let _ = (state, arg);
        unimplemented!("this synchronizer does not support shared release")
    }

    /// Validates that the calling thread may use a condition method.
    ///
    /// Returns `true` if access is permitted (typically: "the caller holds
    /// this synchronizer exclusively"). The default permits everything,
    /// which is only correct for synchronizers that never expose a
    /// condition.
    fn check_condition_access(&self, state: State<'_>, is_wait: bool) -> bool {
        let _ = (state, is_wait);
        true
    }
}
