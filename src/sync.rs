// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The queued synchronizer itself: one atomic state cell plus the generic
//! acquire/release engine built on top of [`crate::queue`].

use crate::condition::Condition;
use crate::error::AcquireError;
use crate::interrupt::Interrupt;
use crate::loom::sync::atomic::{AtomicIsize, Ordering};
use crate::node::{status, Mode, Node};
use crate::park::Park;
use crate::predicates::Predicates;
use crate::queue::SyncQueue;
use crate::state::State;

#[cfg(feature = "std")]
use core::time::Duration;
#[cfg(feature = "std")]
use std::time::Instant;

/// How a slow-path acquire responds to an observed cancellation.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CancelPolicy {
    /// Abort the acquire and report [`AcquireError::Interrupted`].
    Abort,
    /// Remember the cancellation and re-assert it once acquire succeeds.
    Defer,
}

/// Outcome of one user `try_acquire*` call, unified across exclusive and
/// shared mode so the slow-path loop below is written once.
enum TryAcquire {
    Failed,
    Acquired { propagate: bool },
}

/// The singly-linked list of nodes waiting on a synchronizer's condition.
///
/// Owned by the [`Synchronizer`] itself (not by an individual [`Condition`]
/// handle): a [`Condition`] is a cheap, re-creatable view obtained from
/// [`Synchronizer::new_condition`], and every such view over the same
/// synchronizer must observe the same waiters so that a waiter parked via
/// one `new_condition()` call can be signalled via another, exactly as the
/// synchronizer's own exclusive hold is what actually serializes access to
/// it (never the `Condition` value's identity).
pub(crate) struct Waiters<K> {
    pub(crate) first: Option<core::ptr::NonNull<Node<K>>>,
    pub(crate) last: Option<core::ptr::NonNull<Node<K>>>,
}

// SAFETY: the pointers here point into the same arena-owned nodes already
// shared across threads through the sync queue's `AtomicPtr` fields; access
// to this list itself is additionally serialized by `Synchronizer::waiters`.
unsafe impl<K: Send> Send for Waiters<K> {}

/// A reusable queued synchronizer.
///
/// `P` supplies the state-transition logic (see [`Predicates`]); `K` is the
/// thread-parking backend nodes use to block and be woken (see
/// [`crate::park::Park`]). Most callers use the `std`-backed
/// [`crate::park::StdPark`] and never need to name `K` explicitly beyond
/// that.
pub struct Synchronizer<P: Predicates, K: Park> {
    state: AtomicIsize,
    pub(crate) predicates: P,
    pub(crate) queue: SyncQueue<K>,
    pub(crate) waiters: spin::Mutex<Waiters<K>>,
}

impl<P: Predicates, K: Park> Synchronizer<P, K> {
    /// Creates a new synchronizer with state `0` and the given predicate
    /// implementation.
    pub fn new(predicates: P) -> Self {
        Self {
            state: AtomicIsize::new(0),
            predicates,
            queue: SyncQueue::new(),
            waiters: spin::Mutex::new(Waiters {
                first: None,
                last: None,
            }),
        }
    }

    /// Creates a new synchronizer with an explicit initial state value.
    pub fn with_state(predicates: P, initial: isize) -> Self {
        Self {
            state: AtomicIsize::new(initial),
            predicates,
            queue: SyncQueue::new(),
            waiters: spin::Mutex::new(Waiters {
                first: None,
                last: None,
            }),
        }
    }

    /// Reads the synchronization state. Only meaningful to the predicate
    /// implementation that owns its encoding.
    #[must_use]
    pub fn state(&self) -> isize {
        self.state.load(Ordering::Acquire)
    }

    /// Unconditionally overwrites the synchronization state.
    pub fn set_state(&self, value: isize) {
        self.state.store(value, Ordering::Release);
    }

    /// Atomically updates the state from `expect` to `update`, returning
    /// whether the exchange succeeded.
    pub fn compare_and_set_state(&self, expect: isize, update: isize) -> bool {
        self.state
            .compare_exchange(expect, update, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether a queued thread is currently parked or about to be.
    #[must_use]
    pub fn has_queued_threads(&self) -> bool {
        !self.queue.head().is_null() && self.queue_length() > 0
    }

    /// Best-effort count of threads currently queued for acquire. May
    /// over-count briefly around a concurrent cancellation.
    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.count_queued(None)
    }

    /// Best-effort count of threads currently queued specifically for
    /// exclusive acquire.
    #[must_use]
    pub fn queued_exclusive_count(&self) -> usize {
        self.count_queued(Some(Mode::Exclusive))
    }

    /// Best-effort count of threads currently queued specifically for
    /// shared acquire.
    #[must_use]
    pub fn queued_shared_count(&self) -> usize {
        self.count_queued(Some(Mode::Shared))
    }

    /// Snapshots queue depth by walking `prev` backward from `tail`, the
    /// authoritative direction (see [`crate::queue`]): a node's `next` link
    /// is only an optimization and may not yet be visible on its
    /// predecessor even though the node itself is already linked.
    fn count_queued(&self, mode: Option<Mode>) -> usize {
        let mut count = 0usize;
        let head = self.queue.head();
        let mut scan = self.queue.tail();
        // SAFETY: every node reached by walking `prev` from `tail` is
        // arena-owned and alive for this synchronizer's lifetime.
        unsafe {
            while !scan.is_null() && scan != head {
                let mode_matches = match mode {
                    None => true,
                    Some(m) => (*scan).mode == m,
                };
                if !(*scan).is_cancelled() && mode_matches {
                    count += 1;
                }
                scan = (*scan).prev.load(Ordering::Acquire);
            }
        }
        count
    }

    /// Whether `condition` was created by [`Synchronizer::new_condition`] on
    /// this exact synchronizer.
    ///
    /// Always `true` in this crate's API, since a [`Condition`]'s lifetime
    /// already ties it to the synchronizer that created it; kept for parity
    /// with hosts that pass conditions across API boundaries where that
    /// static guarantee has been erased.
    #[must_use]
    pub fn owns(&self, condition: &Condition<'_, P, K>) -> bool
    where
        P: Predicates<Arg = isize>,
    {
        core::ptr::eq(condition.owner_ptr(), self)
    }

    // ---- exclusive acquire ----------------------------------------------

    /// Acquires exclusively, blocking uninterruptibly until the predicate
    /// succeeds. Any interrupt observed while blocked is remembered and
    /// re-asserted on the bound [`Interrupt`] once acquire completes.
    pub fn acquire_exclusive(&self, arg: &P::Arg) {
        if self
            .predicates
            .try_acquire_exclusive(self.state_handle(), false, arg)
        {
            return;
        }
        let interrupt = Interrupt::for_current();
        let _ = self.acquire_slow(Mode::Exclusive, arg, &interrupt, CancelPolicy::Defer, None);
    }

    /// Acquires exclusively, aborting with [`AcquireError::Interrupted`] if
    /// `interrupt` is set before the predicate succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Interrupted`] if `interrupt` fires before the
    /// acquire succeeds.
    pub fn acquire_exclusive_interruptibly(
        &self,
        arg: &P::Arg,
        interrupt: &Interrupt<K>,
    ) -> Result<(), AcquireError> {
        if self
            .predicates
            .try_acquire_exclusive(self.state_handle(), false, arg)
        {
            return Ok(());
        }
        self.acquire_slow(Mode::Exclusive, arg, interrupt, CancelPolicy::Abort, None)
            .map(|_| ())
    }

    /// Acquires exclusively, giving up after `timeout` elapses.
    ///
    /// Returns `Ok(true)` if acquired, `Ok(false)` if `timeout` elapsed
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Interrupted`] if `interrupt` fires before the
    /// acquire succeeds or times out.
    #[cfg(feature = "std")]
    pub fn acquire_exclusive_timed(
        &self,
        arg: &P::Arg,
        interrupt: &Interrupt<K>,
        timeout: Duration,
    ) -> Result<bool, AcquireError> {
        if self
            .predicates
            .try_acquire_exclusive(self.state_handle(), false, arg)
        {
            return Ok(true);
        }
        if timeout.is_zero() {
            return Ok(false);
        }
        let deadline = Instant::now() + crate::time::clamp_duration(timeout);
        self.acquire_slow(
            Mode::Exclusive,
            arg,
            interrupt,
            CancelPolicy::Abort,
            Some(deadline),
        )
    }

    /// Releases exclusively, waking the head of the queue if the predicate
    /// reports the synchronizer is now fully released.
    pub fn release_exclusive(&self, arg: &P::Arg) {
        if self.predicates.try_release_exclusive(self.state_handle(), arg) {
            tracing::trace!("released exclusive, waking successor");
            self.wake_head_if_signalled();
        }
    }

    // ---- shared acquire --------------------------------------------------

    /// Acquires shared access, blocking uninterruptibly.
    pub fn acquire_shared(&self, arg: &P::Arg) {
        if self
            .predicates
            .try_acquire_shared(self.state_handle(), false, arg)
            >= 0
        {
            return;
        }
        let interrupt = Interrupt::for_current();
        let _ = self.acquire_slow(Mode::Shared, arg, &interrupt, CancelPolicy::Defer, None);
    }

    /// Acquires shared access, aborting on interrupt.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Interrupted`] if `interrupt` fires before the
    /// acquire succeeds.
    pub fn acquire_shared_interruptibly(
        &self,
        arg: &P::Arg,
        interrupt: &Interrupt<K>,
    ) -> Result<(), AcquireError> {
        if self
            .predicates
            .try_acquire_shared(self.state_handle(), false, arg)
            >= 0
        {
            return Ok(());
        }
        self.acquire_slow(Mode::Shared, arg, interrupt, CancelPolicy::Abort, None)
            .map(|_| ())
    }

    /// Acquires shared access, giving up after `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Interrupted`] if `interrupt` fires before the
    /// acquire succeeds or times out.
    #[cfg(feature = "std")]
    pub fn acquire_shared_timed(
        &self,
        arg: &P::Arg,
        interrupt: &Interrupt<K>,
        timeout: Duration,
    ) -> Result<bool, AcquireError> {
        if self
            .predicates
            .try_acquire_shared(self.state_handle(), false, arg)
            >= 0
        {
            return Ok(true);
        }
        if timeout.is_zero() {
            return Ok(false);
        }
        let deadline = Instant::now() + crate::time::clamp_duration(timeout);
        self.acquire_slow(
            Mode::Shared,
            arg,
            interrupt,
            CancelPolicy::Abort,
            Some(deadline),
        )
    }

    /// Releases shared access, cascading the wake-up if the predicate
    /// reports the synchronizer is now fully released.
    pub fn release_shared(&self, arg: &P::Arg) {
        if self.predicates.try_release_shared(self.state_handle(), arg) {
            tracing::trace!("released shared, waking successor");
            self.wake_head_if_signalled();
        }
    }

    // ---- shared engine ----------------------------------------------------

    fn try_acquire(&self, mode: Mode, is_queued: bool, arg: &P::Arg) -> TryAcquire {
        match mode {
            Mode::Exclusive => {
                if self
                    .predicates
                    .try_acquire_exclusive(self.state_handle(), is_queued, arg)
                {
                    TryAcquire::Acquired { propagate: false }
                } else {
                    TryAcquire::Failed
                }
            }
            Mode::Shared => {
                let r = self
                    .predicates
                    .try_acquire_shared(self.state_handle(), is_queued, arg);
                if r >= 0 {
                    TryAcquire::Acquired { propagate: r > 0 }
                } else {
                    TryAcquire::Failed
                }
            }
        }
    }

    /// Borrows a short-lived [`State`] handle over this synchronizer's state
    /// cell, to hand to a [`Predicates`] callback.
    pub(crate) fn state_handle(&self) -> State<'_> {
        State::new(&self.state)
    }

    /// The unified slow-path acquire loop backing all six public acquire
    /// variants. `deadline.is_some()` makes this a timed acquire;
    /// `policy == CancelPolicy::Abort` makes it interruptible.
    #[tracing::instrument(level = "trace", skip_all, fields(mode = ?mode))]
    fn acquire_slow(
        &self,
        mode: Mode,
        arg: &P::Arg,
        interrupt: &Interrupt<K>,
        policy: CancelPolicy,
        deadline: Option<DeadlineFor>,
    ) -> Result<bool, AcquireError> {
        let node = self.queue.alloc_node(mode, interrupt.parker().clone());
        self.queue.enqueue(node);
        tracing::trace!("enqueued onto sync queue");

        let mut deferred_interrupt = false;
        let result = loop {
            if self.queue.is_first(node) {
                match self.try_acquire(mode, true, arg) {
                    TryAcquire::Acquired { propagate } => {
                        self.queue.set_head(node);
                        tracing::trace!("acquired from head of queue");
                        if propagate {
                            self.cascade_shared();
                        }
                        break Ok(true);
                    }
                    TryAcquire::Failed => {}
                }
            }

            if self.queue.should_park_after_failed_acquire(node) {
                tracing::trace!("parking");
                #[cfg(feature = "std")]
                if let Some(deadline) = deadline {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        self.queue.cancel(node);
                        tracing::trace!("timed out while queued");
                        break Ok(false);
                    }
                    interrupt
                        .parker()
                        .park_timeout(crate::time::clamp_duration(remaining));
                } else {
                    interrupt.parker().park();
                }
                #[cfg(not(feature = "std"))]
                {
                    interrupt.parker().park();
                }

                if interrupt.is_set() {
                    match policy {
                        CancelPolicy::Abort => {
                            self.queue.cancel(node);
                            interrupt.take();
                            tracing::debug!("acquire aborted by interrupt");
                            break Err(AcquireError::Interrupted);
                        }
                        CancelPolicy::Defer => {
                            interrupt.take();
                            deferred_interrupt = true;
                        }
                    }
                }
            }
        };

        if deferred_interrupt {
            // Re-assert: the caller's token must still read as interrupted
            // once this uninterruptible acquire returns.
            interrupt.interrupt();
        }
        result
    }

    /// After a successful shared acquire reports `propagate`, unparks the
    /// current head's successor so it can attempt concurrently. Mirrors the
    /// unconditional "wake next on full release" rule but fires immediately
    /// on the acquiring side rather than waiting for a release.
    fn cascade_shared(&self) {
        let head = self.queue.head();
        if head.is_null() {
            return;
        }
        // SAFETY: head is arena-owned and alive.
        let ws = unsafe { (*head).wait_status.load(Ordering::Acquire) };
        if ws == status::SIGNAL || ws == status::INIT {
            let _ = unsafe {
                (*head).wait_status.compare_exchange(
                    ws,
                    status::INIT,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
            };
        }
        // SAFETY: see above.
        if let Some(head_ptr) = core::ptr::NonNull::new(head) {
            if let Some(succ) = self.queue.successor(head_ptr) {
                if unsafe { succ.as_ref().is_shared() } {
                    unsafe { succ.as_ref().unpark() };
                }
            }
        }
    }

    pub(crate) fn wake_head_if_signalled(&self) {
        let head = self.queue.head();
        let Some(head) = core::ptr::NonNull::new(head) else {
            return;
        };
        // SAFETY: head is arena-owned and alive.
        let ws = unsafe { head.as_ref().wait_status.load(Ordering::Acquire) };
        if ws < status::INIT {
            let _ = unsafe {
                head.as_ref().wait_status.compare_exchange(
                    ws,
                    status::INIT,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
            };
        }
        if let Some(succ) = self.queue.successor(head) {
            unsafe { succ.as_ref().unpark() };
        }
    }
}

impl<P: Predicates<Arg = isize>, K: Park> Synchronizer<P, K> {
    /// Creates a new [`Condition`] view over this synchronizer's waiter
    /// list.
    ///
    /// Only available when `P::Arg == isize`: the transfer protocol saves
    /// and restores the synchronizer's state across a wait by handing it
    /// straight to [`Predicates::try_release_exclusive`] and
    /// [`Predicates::try_acquire_exclusive`] (see [`crate::condition`]).
    ///
    /// Every call returns a view over the *same* underlying waiter list (see
    /// [`Waiters`]), so a thread parking via one `new_condition()` call can
    /// be woken by `signal`/`signal_all` called through another — there is
    /// no need to share a single `Condition` value across threads.
    pub fn new_condition(&self) -> Condition<'_, P, K> {
        Condition::new(self)
    }
}

#[cfg(feature = "std")]
type DeadlineFor = Instant;
#[cfg(not(feature = "std"))]
type DeadlineFor = ();

#[cfg(feature = "std")]
/// Convenience alias for the common case of parking real OS threads.
pub type StdSynchronizer<P> = Synchronizer<P, crate::park::StdPark>;
