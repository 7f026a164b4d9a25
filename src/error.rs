// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types surfaced by the acquire/condition API.
//!
//! Mirrors the hand-rolled `Display`/`Error` style used elsewhere in this
//! workspace rather than pulling in a derive macro: the surface is small and
//! fully enumerable, so a derive buys nothing.

use core::fmt;

/// Returned by interruptible and timed acquire/await paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The calling thread was interrupted while queued or parked.
    Interrupted,
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("interrupted while acquiring"),
        }
    }
}

impl core::error::Error for AcquireError {}

/// A condition method was invoked by a thread that does not currently hold
/// the synchronizer, or a user predicate rejected condition access outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalMonitorState;

impl fmt::Display for IllegalMonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("current thread does not hold this synchronizer")
    }
}

impl core::error::Error for IllegalMonitorState {}

/// An instrumentation method was given a [`Condition`](crate::condition::Condition)
/// that does not belong to the synchronizer being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalArgument;

impl fmt::Display for IllegalArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("condition does not belong to this synchronizer")
    }
}

impl core::error::Error for IllegalArgument {}

/// Returned by the `Condition` wait family, which can fail either because
/// the caller does not hold the synchronizer or because it was interrupted
/// while parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionError {
    /// The calling thread does not hold the synchronizer exclusively.
    IllegalMonitorState,
    /// The calling thread was interrupted while waiting.
    Interrupted,
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalMonitorState => {
                f.write_str("current thread does not hold this synchronizer")
            }
            Self::Interrupted => f.write_str("interrupted while waiting on condition"),
        }
    }
}

impl core::error::Error for ConditionError {}

impl From<IllegalMonitorState> for ConditionError {
    fn from(_: IllegalMonitorState) -> Self {
        Self::IllegalMonitorState
    }
}

impl From<AcquireError> for ConditionError {
    fn from(e: AcquireError) -> Self {
        match e {
            AcquireError::Interrupted => Self::Interrupted,
        }
    }
}
