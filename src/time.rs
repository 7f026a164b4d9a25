// Copyright 2026. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Deadline clamping for the timed acquire and timed `await` paths.
//!
//! Timed paths use `std::time::Instant` directly (gated behind the `std`
//! feature); this module only holds the defensive duration clamp they share.

use core::time::Duration;

/// Upper bound placed on any single `park_timeout` call to keep platform
/// parking primitives (which commonly take a 32-bit millisecond count) from
/// silently truncating an oversized request.
pub const MAX_PARK_DURATION: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Clamps `d` to [`MAX_PARK_DURATION`], the same defensive clamp this
/// workspace's timer wheel applies before handing a duration to the OS.
#[must_use]
pub fn clamp_duration(d: Duration) -> Duration {
    if d > MAX_PARK_DURATION {
        MAX_PARK_DURATION
    } else {
        d
    }
}
