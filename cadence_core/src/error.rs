// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for the pacing core.
//!
//! None of these errors ever stop the render loop. Rejected timing keeps the
//! previous model, unsupported features fall back to a degraded path, and a
//! shutdown releases blocked waiters. They exist so that embedders can report
//! what happened.

use core::fmt;

/// An optional platform capability that may be missing at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Querying when a frame actually reached the display.
    PresentationTime,
    /// Attaching a target presentation time to the swap call.
    PresentationTimeHint,
    /// Querying GPU completion of a previous frame.
    GpuFence,
    /// Enumerating the display's supported refresh rates.
    RefreshRateEnumeration,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PresentationTime => "presentation time query",
            Self::PresentationTimeHint => "presentation time hint",
            Self::GpuFence => "GPU fence query",
            Self::RefreshRateEnumeration => "refresh rate enumeration",
        })
    }
}

/// Errors reported by the pacing core.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PacingError {
    /// The platform reported a refresh period that is zero or negative.
    #[error("invalid refresh period {refresh_period_ns} ns")]
    InvalidTiming {
        /// The rejected period, in nanoseconds.
        refresh_period_ns: i64,
    },
    /// A platform capability is not available; the feature runs degraded.
    #[error("{0} is not supported on this platform")]
    UnsupportedPlatformFeature(Feature),
    /// A dispatcher could not register with an event loop and runs posted
    /// work on the calling thread instead.
    #[error("no event loop on the bound thread; posted work runs on the caller")]
    ThreadAffinityViolation,
    /// The timing bridge shut down while a thread was waiting on it.
    #[error("timing bridge shut down while waiting")]
    ShutdownWhileBlocked,
}
