// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use qsync::Interrupt;

#[test]
fn it_condition_signal_before_wait_does_not_accumulate() {
    let sync = Arc::new(common::new_mutex());
    let waiter_done = Arc::new(AtomicBool::new(false));

    sync.acquire_exclusive(&1);
    let condition = sync.new_condition();
    // Nobody is waiting yet: this signal has no effect and is not "saved"
    // for a later `wait` call to consume.
    condition.signal().unwrap();
    sync.release_exclusive(&1);

    let sync2 = Arc::clone(&sync);
    let waiter_done2 = Arc::clone(&waiter_done);
    let handle = thread::spawn(move || {
        sync2.acquire_exclusive(&1);
        let condition = sync2.new_condition();
        let interrupt = Interrupt::for_current();
        condition.wait(&interrupt).unwrap();
        waiter_done2.store(true, Ordering::Release);
        sync2.release_exclusive(&1);
    });

    thread::sleep(Duration::from_millis(50));
    assert!(
        !waiter_done.load(Ordering::Acquire),
        "a stale signal must not wake a later wait"
    );

    sync.acquire_exclusive(&1);
    let condition = sync.new_condition();
    condition.signal().unwrap();
    sync.release_exclusive(&1);

    handle.join().unwrap();
    assert!(waiter_done.load(Ordering::Acquire));
}

#[test]
fn it_interrupt_vs_signal_race_is_resolved_exactly_one_way() {
    let sync = Arc::new(common::new_mutex());
    let (tx, rx) = std::sync::mpsc::channel();

    let sync2 = Arc::clone(&sync);
    let handle = thread::spawn(move || {
        sync2.acquire_exclusive(&1);
        let condition = sync2.new_condition();
        let interrupt = Interrupt::for_current();
        tx.send(interrupt.clone()).unwrap();
        let result = condition.wait(&interrupt);
        sync2.release_exclusive(&1);
        result
    });

    let interrupt = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    // Race an interrupt against a signal. Whichever CAS wins, the waiter
    // must resolve exactly one way and the sync queue stays usable
    // afterward.
    interrupt.interrupt();
    sync.acquire_exclusive(&1);
    let condition = sync.new_condition();
    let _ = condition.signal();
    sync.release_exclusive(&1);

    let result = handle.join().unwrap();
    // Either outcome is a legal resolution of the race; what matters is
    // that exactly one was taken and the synchronizer is left consistent.
    match result {
        Ok(()) | Err(qsync::ConditionError::Interrupted) => {}
        Err(other) => panic!("unexpected error from the race: {other:?}"),
    }

    // The queue must still be fully usable afterward.
    sync.acquire_exclusive(&1);
    sync.release_exclusive(&1);
}

#[test]
fn it_reentrant_hold_count_round_trips_through_an_await() {
    let sync = Arc::new(common::new_mutex());
    let (tx, rx) = std::sync::mpsc::channel();

    let sync2 = Arc::clone(&sync);
    let handle = thread::spawn(move || {
        sync2.acquire_exclusive(&1);
        sync2.acquire_exclusive(&1); // reentrant: hold count now 2
        assert_eq!(sync2.state(), 2);

        let condition = sync2.new_condition();
        let interrupt = Interrupt::for_current();
        tx.send(interrupt.clone()).unwrap();
        condition.wait(&interrupt).unwrap();

        // Woken: hold count must be restored to exactly what it was
        // before the await, regardless of what happened while released.
        let restored = sync2.state();
        sync2.release_exclusive(&1);
        sync2.release_exclusive(&1);
        restored
    });

    let _interrupt = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));

    // While the first thread is parked, another thread acquires and
    // signals.
    sync.acquire_exclusive(&1);
    assert_eq!(sync.state(), 1);
    let condition = sync.new_condition();
    condition.signal().unwrap();
    sync.release_exclusive(&1);

    let restored = handle.join().unwrap();
    assert_eq!(restored, 2);
    assert_eq!(sync.state(), 0);
}
