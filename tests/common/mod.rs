// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Collaborators shared across the integration suite: concrete `Predicates`
//! implementations for a reentrant mutex, a binary latch, and a countdown
//! latch, matching the scenarios described alongside this crate's acquire
//! engine.

#![allow(dead_code, reason = "not every test file exercises every fixture")]

use std::sync::Mutex as StdMutex;
use std::thread::ThreadId;

use qsync::{Predicates, State, StdSynchronizer};

/// Reentrant exclusive lock: state is the current hold count, `0` meaning
/// free. `Arg` doubles as both "how much to add/subtract" on ordinary
/// acquire/release and as the saved hold count a `Condition` restores
/// across an `await`.
pub struct ReentrantMutex {
    owner: StdMutex<Option<ThreadId>>,
}

impl ReentrantMutex {
    pub fn new() -> Self {
        Self {
            owner: StdMutex::new(None),
        }
    }
}

impl Predicates for ReentrantMutex {
    type Arg = isize;

    fn try_acquire_exclusive(&self, state: State<'_>, _is_queued: bool, arg: &isize) -> bool {
        let me = std::thread::current().id();
        let mut owner = self.owner.lock().unwrap();
        let held = state.get();
        if held == 0 {
            *owner = Some(me);
            state.set(*arg);
            true
        } else if *owner == Some(me) {
            state.set(held + arg);
            true
        } else {
            false
        }
    }

    fn try_release_exclusive(&self, state: State<'_>, arg: &isize) -> bool {
        let held = state.get() - arg;
        state.set(held);
        if held == 0 {
            *self.owner.lock().unwrap() = None;
            true
        } else {
            false
        }
    }

    fn check_condition_access(&self, _state: State<'_>, _is_wait: bool) -> bool {
        *self.owner.lock().unwrap() == Some(std::thread::current().id())
    }
}

pub type Mutex = StdSynchronizer<ReentrantMutex>;

pub fn new_mutex() -> Mutex {
    Mutex::new(ReentrantMutex::new())
}

/// A one-shot latch: closed (state `0`) until `open` releases it, after
/// which every current and future shared acquirer passes immediately.
pub struct BinaryLatch;

impl Predicates for BinaryLatch {
    type Arg = ();

    fn try_acquire_shared(&self, state: State<'_>, _is_queued: bool, _arg: &()) -> i32 {
        if state.get() != 0 {
            1
        } else {
            -1
        }
    }

    fn try_release_shared(&self, state: State<'_>, _arg: &()) -> bool {
        state.set(1);
        true
    }
}

pub type Latch = StdSynchronizer<BinaryLatch>;

pub fn new_latch() -> Latch {
    Latch::new(BinaryLatch)
}

/// A countdown latch: state starts at `count` and every `count_down` call
/// atomically decrements it; every shared acquirer blocks until it reaches
/// zero.
pub struct CountdownLatch;

impl Predicates for CountdownLatch {
    type Arg = ();

    fn try_acquire_shared(&self, state: State<'_>, _is_queued: bool, _arg: &()) -> i32 {
        if state.get() == 0 {
            1
        } else {
            -1
        }
    }

    fn try_release_shared(&self, state: State<'_>, _arg: &()) -> bool {
        loop {
            let current = state.get();
            if current == 0 {
                return false;
            }
            if state.compare_and_set(current, current - 1) {
                return current - 1 == 0;
            }
        }
    }
}

pub type Countdown = StdSynchronizer<CountdownLatch>;

pub fn new_countdown(count: isize) -> Countdown {
    Countdown::with_state(CountdownLatch, count)
}
