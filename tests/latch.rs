// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use qsync::Interrupt;

#[test]
fn it_eight_waiters_all_return_only_after_the_release() {
    let latch = Arc::new(common::new_latch());
    let released_count = Arc::new(AtomicUsize::new(0));
    let returned_before_release = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let latch = Arc::clone(&latch);
            let released_count = Arc::clone(&released_count);
            let returned_before_release = Arc::clone(&returned_before_release);
            thread::spawn(move || {
                let interrupt = Interrupt::for_current();
                latch.acquire_shared_interruptibly(&(), &interrupt).unwrap();
                if released_count.load(Ordering::Acquire) == 0 {
                    returned_before_release.fetch_add(1, Ordering::AcqRel);
                }
            })
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(50));
    released_count.store(1, Ordering::Release);
    latch.release_shared(&());

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(returned_before_release.load(Ordering::Acquire), 0);
}

#[test]
fn it_countdown_of_three_releases_all_five_waiters_exactly_on_the_third() {
    let latch = Arc::new(common::new_countdown(3));
    let finished = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let latch = Arc::clone(&latch);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let interrupt = Interrupt::for_current();
                latch.acquire_shared_interruptibly(&(), &interrupt).unwrap();
                finished.fetch_add(1, Ordering::AcqRel);
            })
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(finished.load(Ordering::Acquire), 0);

    latch.release_shared(&());
    thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(finished.load(Ordering::Acquire), 0);

    latch.release_shared(&());
    thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(finished.load(Ordering::Acquire), 0);

    latch.release_shared(&());

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(finished.load(Ordering::Acquire), 5);
}
