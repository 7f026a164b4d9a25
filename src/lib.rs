// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A reusable queued synchronizer: the FIFO wait-queue, thread-parking and
//! condition-variable machinery that sits underneath mutexes, latches,
//! semaphores and read/write locks.
//!
//! The [`Synchronizer`] owns a single atomic integer ("state") whose meaning
//! is entirely up to the caller, plus the lock-free CLH queue of threads
//! contending for it. A concrete synchronizer plugs its state-transition
//! logic in by implementing [`Predicates`] rather than subclassing, the same
//! way this workspace's `lock_api`-based primitives take their behavior as a
//! type parameter:
//!
//! ```
//! use qsync::{Predicates, StdSynchronizer, State};
//!
//! struct SpinMutex;
//!
//! impl Predicates for SpinMutex {
//!     type Arg = ();
//!
//!     fn try_acquire_exclusive(&self, state: State<'_>, _is_queued: bool, _arg: &()) -> bool {
//!         state.compare_and_set(0, 1)
//!     }
//!
//!     fn try_release_exclusive(&self, state: State<'_>, _arg: &()) -> bool {
//!         state.set(0);
//!         true
//!     }
//! }
//!
//! let sync: StdSynchronizer<SpinMutex> = StdSynchronizer::new(SpinMutex);
//! sync.acquire_exclusive(&());
//! sync.release_exclusive(&());
//! ```
//!
//! See [`Synchronizer`] for the full acquire/release/condition API and
//! [`Predicates`] for the callback contract.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod condition;
pub mod error;
pub mod interrupt;
pub(crate) mod loom;
pub(crate) mod node;
pub mod park;
pub(crate) mod queue;
pub mod predicates;
pub mod state;
pub mod sync;
pub mod time;

pub use condition::Condition;
pub use error::{AcquireError, ConditionError, IllegalArgument, IllegalMonitorState};
pub use interrupt::Interrupt;
pub use park::Park;
pub use predicates::{Predicates, SharedAcquireResult};
pub use state::State;
pub use sync::Synchronizer;

#[cfg(feature = "std")]
pub use park::StdPark;
#[cfg(feature = "std")]
pub use sync::StdSynchronizer;
