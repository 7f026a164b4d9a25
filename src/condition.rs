// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The condition-variable facility: a secondary, singly-linked waiter list
//! owned by the synchronizer (see [`crate::sync::Waiters`]), and the
//! transfer protocol that migrates a waiter back onto the sync queue on
//! `signal`.
//!
//! Conditions require `P::Arg == isize`: the transfer protocol saves the
//! synchronizer's current state, fully releases by handing that same value
//! to [`crate::predicates::Predicates::try_release_exclusive`], and later
//! re-acquires by handing it back to
//! [`crate::predicates::Predicates::try_acquire_exclusive`] — exactly the
//! shape of AQS's `fullyRelease`/re-acquire pair. Generalizing `Arg` to an
//! arbitrary type would make that round trip ambiguous, so rather than
//! inventing a second, parallel "release-for-condition" hook, this crate
//! narrows conditions to the synchronizers for which restoring state *is*
//! restoring the argument: reentrant-style locks, which is the only
//! documented use of this facility anyway.

use core::ptr::{self, NonNull};

use crate::loom::sync::atomic::Ordering;

#[cfg(feature = "std")]
use core::time::Duration;
#[cfg(feature = "std")]
use std::time::Instant;

use crate::error::ConditionError;
use crate::interrupt::Interrupt;
use crate::node::{status, Mode, Node};
use crate::park::Park;
use crate::predicates::Predicates;
use crate::sync::Synchronizer;

#[cfg(feature = "std")]
type WaitDeadline = Instant;
#[cfg(not(feature = "std"))]
type WaitDeadline = ();

/// A condition variable tied to one [`Synchronizer`].
///
/// Created via [`Synchronizer::new_condition`]. A `Condition` is a cheap,
/// re-creatable *view* rather than the owner of any state: the waiter list
/// it signals and waits on lives on the [`Synchronizer`] itself, so any
/// number of `new_condition()` calls on the same synchronizer — from any
/// thread, at any time — observe and transfer the same waiters. This
/// matches how the facility is actually used: one thread calls
/// `sync.new_condition().wait(..)` to park, and an unrelated thread later
/// calls `sync.new_condition().signal()` to wake it, with no shared
/// `Condition` value ever passed between them.
pub struct Condition<'a, P: Predicates<Arg = isize>, K: Park> {
    sync: &'a Synchronizer<P, K>,
}

impl<'a, P: Predicates<Arg = isize>, K: Park> Condition<'a, P, K> {
    pub(crate) fn new(sync: &'a Synchronizer<P, K>) -> Self {
        Self { sync }
    }

    /// Identity of the synchronizer this condition belongs to, for
    /// [`Synchronizer::owns`](crate::sync::Synchronizer::owns).
    pub(crate) fn owner_ptr(&self) -> *const Synchronizer<P, K> {
        self.sync as *const Synchronizer<P, K>
    }

    /// Best-effort check for whether any thread currently sits on this
    /// condition's waiter list.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::IllegalMonitorState`] if the calling thread
    /// does not hold the synchronizer.
    pub fn has_waiters(&self) -> Result<bool, ConditionError> {
        self.check_access(false)?;
        Ok(self.sync.waiters.lock().first.is_some())
    }

    /// Best-effort count of threads currently waiting on this condition.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::IllegalMonitorState`] if the calling thread
    /// does not hold the synchronizer.
    pub fn wait_queue_length(&self) -> Result<usize, ConditionError> {
        self.check_access(false)?;
        let w = self.sync.waiters.lock();
        let mut count = 0usize;
        let mut cur = w.first;
        while let Some(node) = cur {
            count += 1;
            // SAFETY: every node on this list is arena-owned and alive.
            cur = NonNull::new(unsafe { node.as_ref() }.next_waiter.with(|p| unsafe { *p }));
        }
        Ok(count)
    }

    fn check_access(&self, is_wait: bool) -> Result<(), ConditionError> {
        if self
            .sync
            .predicates
            .check_condition_access(self.sync.state_handle(), is_wait)
        {
            Ok(())
        } else {
            tracing::warn!(is_wait, "condition access rejected");
            Err(ConditionError::IllegalMonitorState)
        }
    }

    fn add_waiter(&self, node: NonNull<Node<K>>) {
        let mut w = self.sync.waiters.lock();
        if let Some(last) = w.last {
            // SAFETY: `last` is on the synchronizer's waiter list;
            // `next_waiter` is only ever touched while holding `waiters`.
            unsafe { last.as_ref() }
                .next_waiter
                .with_mut(|p| unsafe { *p = node.as_ptr() });
        } else {
            w.first = Some(node);
        }
        w.last = Some(node);
    }

    /// CAS `node`'s status from `CONDITION` to the steady state and, on
    /// success, link it onto the sync queue. Returns `false` if the node had
    /// already left `CONDITION` state (self-cancelled racing with signal).
    fn transfer(&self, node: NonNull<Node<K>>) -> bool {
        // SAFETY: node is arena-owned by `self.sync` and alive.
        let won = unsafe {
            node.as_ref()
                .wait_status
                .compare_exchange(
                    status::CONDITION,
                    status::INIT,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        };
        if !won {
            return false;
        }
        let pred = self.sync.queue.enqueue(node);
        let armed = unsafe {
            pred.as_ref()
                .wait_status
                .compare_exchange(
                    status::INIT,
                    status::SIGNAL,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        };
        if unsafe { pred.as_ref().is_cancelled() } || !armed {
            unsafe { node.as_ref().unpark() };
        }
        tracing::trace!("transferred condition waiter onto sync queue");
        true
    }

    /// Wakes the first condition waiter, tolerating (and skipping) waiters
    /// that raced a signal with their own cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::IllegalMonitorState`] if the calling thread
    /// does not hold the synchronizer.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn signal(&self) -> Result<(), ConditionError> {
        self.check_access(false)?;
        loop {
            let first = {
                let mut w = self.sync.waiters.lock();
                let Some(first) = w.first else {
                    return Ok(());
                };
                let first_ref = unsafe { first.as_ref() };
                let next = first_ref.next_waiter.with(|p| unsafe { *p });
                w.first = NonNull::new(next);
                if w.first.is_none() {
                    w.last = None;
                }
                first_ref
                    .next_waiter
                    .with_mut(|p| unsafe { *p = ptr::null_mut() });
                first
            };
            if self.transfer(first) {
                return Ok(());
            }
        }
    }

    /// Wakes every current condition waiter.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::IllegalMonitorState`] if the calling thread
    /// does not hold the synchronizer.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn signal_all(&self) -> Result<(), ConditionError> {
        self.check_access(false)?;
        let mut cur = {
            let mut w = self.sync.waiters.lock();
            let cur = w.first;
            w.first = None;
            w.last = None;
            cur
        };
        while let Some(node) = cur {
            let node_ref = unsafe { node.as_ref() };
            let next = node_ref.next_waiter.with(|p| unsafe { *p });
            node_ref
                .next_waiter
                .with_mut(|p| unsafe { *p = ptr::null_mut() });
            self.transfer(node);
            cur = NonNull::new(next);
        }
        Ok(())
    }

    /// Releases the synchronizer (saving its current state), parks on this
    /// condition, and on wake re-acquires with the saved state restored.
    /// Aborts with `Interrupted` if `interrupt` fires before a signal wins
    /// the race.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError::IllegalMonitorState`] if the calling thread
    /// does not hold the synchronizer, or [`ConditionError::Interrupted`] if
    /// interrupted while waiting.
    pub fn wait(&self, interrupt: &Interrupt<K>) -> Result<(), ConditionError> {
        self.wait_core(interrupt, true, None).map(|_| ())
    }

    /// As [`Condition::wait`], but defers any observed interrupt until
    /// after re-acquiring, re-asserting it on `interrupt` rather than
    /// aborting early.
    pub fn wait_uninterruptibly(&self) {
        let interrupt = Interrupt::for_current();
        let _ = self.wait_core(&interrupt, false, None);
    }

    /// As [`Condition::wait`], but gives up after `timeout` elapses.
    /// Returns the remaining time at wake (zero or negative means the
    /// timeout elapsed before a signal).
    ///
    /// # Errors
    ///
    /// See [`Condition::wait`].
    #[cfg(feature = "std")]
    pub fn wait_nanos(
        &self,
        interrupt: &Interrupt<K>,
        timeout: Duration,
    ) -> Result<Duration, ConditionError> {
        let deadline = Instant::now() + crate::time::clamp_duration(timeout);
        self.wait_core(interrupt, true, Some(deadline))?;
        Ok(deadline.saturating_duration_since(Instant::now()))
    }

    /// As [`Condition::wait`], but gives up at `deadline`. Returns `true` if
    /// woken by a signal before `deadline`, `false` if the deadline elapsed
    /// first.
    ///
    /// # Errors
    ///
    /// See [`Condition::wait`].
    #[cfg(feature = "std")]
    pub fn wait_until(
        &self,
        interrupt: &Interrupt<K>,
        deadline: Instant,
    ) -> Result<bool, ConditionError> {
        self.wait_core(interrupt, true, Some(deadline))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn wait_core(
        &self,
        interrupt: &Interrupt<K>,
        interruptible: bool,
        deadline: Option<WaitDeadline>,
    ) -> Result<bool, ConditionError> {
        self.check_access(true)?;

        let saved_state = self.sync.state();
        let node = self
            .sync
            .queue
            .alloc_node(Mode::Exclusive, interrupt.parker().clone());
        // SAFETY: freshly allocated, not yet visible to any other thread.
        unsafe {
            node.as_ref()
                .wait_status
                .store(status::CONDITION, Ordering::Release);
        }
        self.add_waiter(node);

        if !self
            .sync
            .predicates
            .try_release_exclusive(self.sync.state_handle(), &saved_state)
        {
            // Could not release: the caller's own bookkeeping is broken
            // (e.g. check_condition_access lied about ownership). Drop the
            // node back to cancelled so nothing ever tries to wake it.
            unsafe { node.as_ref().cancel() };
            return Err(ConditionError::IllegalMonitorState);
        }
        self.sync.wake_head_if_signalled();

        let mut timed_out = false;
        let mut deferred_interrupt = false;
        loop {
            let on_queue = self.sync.queue.contains(node);
            if on_queue {
                break;
            }
            if interrupt.is_set() {
                // Race with signal: try to self-transfer off the condition
                // list by winning the same CAS `transfer` uses.
                let won_self_cancel = unsafe {
                    node.as_ref()
                        .wait_status
                        .compare_exchange(
                            status::CONDITION,
                            status::INIT,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                };
                interrupt.take();
                if won_self_cancel {
                    self.sync.queue.enqueue(node);
                    // The re-acquire below still runs so the queue stays
                    // consistent; whether this is reported depends on
                    // `interruptible`, checked once more after re-acquire.
                    deferred_interrupt = true;
                    break;
                } else {
                    // The signal's CAS won first; spin briefly until its
                    // enqueue completes so `contains` observes the node.
                    while !self.sync.queue.contains(node) {
                        core::hint::spin_loop();
                    }
                    break;
                }
            }

            #[cfg(feature = "std")]
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    timed_out = true;
                    let won_self_cancel = unsafe {
                        node.as_ref()
                            .wait_status
                            .compare_exchange(
                                status::CONDITION,
                                status::INIT,
                                Ordering::AcqRel,
                                Ordering::Acquire,
                            )
                            .is_ok()
                    };
                    if won_self_cancel {
                        self.sync.queue.enqueue(node);
                    } else {
                        while !self.sync.queue.contains(node) {
                            core::hint::spin_loop();
                        }
                    }
                    break;
                }
                interrupt
                    .parker()
                    .park_timeout(crate::time::clamp_duration(remaining));
            } else {
                interrupt.parker().park();
            }
            #[cfg(not(feature = "std"))]
            {
                let _ = deadline;
                interrupt.parker().park();
            }
        }

        // Re-acquire exclusively with the saved state, using the ordinary
        // (uninterruptible) slow path: an interrupt observed during
        // re-acquire is deferred the same way a deferred wait-interrupt is.
        self.reacquire(node, saved_state, interrupt, &mut deferred_interrupt);

        if deferred_interrupt {
            if interruptible {
                interrupt.take();
                return Err(ConditionError::Interrupted);
            }
            interrupt.interrupt();
        }
        Ok(!timed_out)
    }

    fn reacquire(
        &self,
        node: NonNull<Node<K>>,
        saved_state: isize,
        interrupt: &Interrupt<K>,
        deferred_interrupt: &mut bool,
    ) {
        loop {
            if self.sync.queue.is_first(node)
                && self.sync.predicates.try_acquire_exclusive(
                    self.sync.state_handle(),
                    true,
                    &saved_state,
                )
            {
                self.sync.queue.set_head(node);
                return;
            }
            if self.sync.queue.should_park_after_failed_acquire(node) {
                interrupt.parker().park();
                if interrupt.is_set() {
                    interrupt.take();
                    *deferred_interrupt = true;
                }
            }
        }
    }
}
