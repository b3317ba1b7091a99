// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for the pacing loop.
//!
//! This module provides a [`TraceSink`] trait with one method per point in
//! the frame where the engine can report what it is doing. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! A frame produces, in order:
//!
//! ```text
//!   FrameStart ─► PreWait ─► PostWait ─► PreSwap ─► (swap) ─► PostSwap
//!                                                               │
//!                                     SwapIntervalChanged ◄─────┘ (sometimes)
//! ```
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Events here are for development tooling. Decisions the embedder may want
//! in production logs (interval changes, degraded features) also go through
//! `tracing`.

use crate::interval::IntervalChange;
use crate::time::{Duration, HostTime};

/// Emitted by [`record_frame_start`](crate::engine::PacingEngine::record_frame_start).
#[derive(Clone, Copy, Debug)]
pub struct FrameStartEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Host time when the frame started.
    pub timestamp: HostTime,
    /// Swap interval in effect for this frame.
    pub swap_interval: u32,
}

/// Emitted before the engine blocks for the release deadline.
#[derive(Clone, Copy, Debug)]
pub struct PreWaitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time when waiting starts.
    pub timestamp: HostTime,
    /// Time the frame will be released to the swap call.
    pub release_at: HostTime,
}

/// Emitted once the engine has stopped waiting.
#[derive(Clone, Copy, Debug)]
pub struct PostWaitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time when waiting ended.
    pub timestamp: HostTime,
    /// Total time spent blocked, including any fence wait.
    pub waited: Duration,
}

/// Emitted just before control returns to the caller's swap call.
#[derive(Clone, Copy, Debug)]
pub struct PreSwapEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of the hand-off.
    pub timestamp: HostTime,
    /// Intended presentation time.
    pub target_present: HostTime,
    /// Whether the frame overlaps the previous frame's GPU work.
    pub pipelined: bool,
}

/// Emitted after the swap call returns.
#[derive(Clone, Copy, Debug)]
pub struct PostSwapEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time after the swap.
    pub timestamp: HostTime,
    /// Intended presentation time.
    pub target_present: HostTime,
    /// Actual presentation time, if the platform reported one.
    pub actual_present: Option<HostTime>,
}

/// Emitted whenever the swap interval changes.
#[derive(Clone, Copy, Debug)]
pub struct SwapIntervalChangedEvent {
    /// Frame counter at the time of the change.
    pub frame_index: u64,
    /// Old and new interval, and why.
    pub change: IntervalChange,
    /// Refresh period the interval applies to.
    pub refresh_period: Duration,
}

/// Receives trace events from the pacing loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        _ = e;
    }

    /// Called before waiting for the release deadline.
    fn on_pre_wait(&mut self, e: &PreWaitEvent) {
        _ = e;
    }

    /// Called after waiting.
    fn on_post_wait(&mut self, e: &PostWaitEvent) {
        _ = e;
    }

    /// Called before the swap.
    fn on_pre_swap(&mut self, e: &PreSwapEvent) {
        _ = e;
    }

    /// Called after the swap.
    fn on_post_swap(&mut self, e: &PostSwapEvent) {
        _ = e;
    }

    /// Called when the swap interval changes.
    fn on_swap_interval_changed(&mut self, e: &SwapIntervalChangedEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self::from_option(Some(sink))
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::from_option(None)
    }

    /// Creates a tracer from an optional sink.
    #[inline]
    #[must_use]
    pub fn from_option(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameStartEvent`].
    #[inline]
    pub fn frame_start(&mut self, e: &FrameStartEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_start(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PreWaitEvent`].
    #[inline]
    pub fn pre_wait(&mut self, e: &PreWaitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pre_wait(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PostWaitEvent`].
    #[inline]
    pub fn post_wait(&mut self, e: &PostWaitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_post_wait(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PreSwapEvent`].
    #[inline]
    pub fn pre_swap(&mut self, e: &PreSwapEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pre_swap(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PostSwapEvent`].
    #[inline]
    pub fn post_swap(&mut self, e: &PostSwapEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_post_swap(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SwapIntervalChangedEvent`].
    #[inline]
    pub fn swap_interval_changed(&mut self, e: &SwapIntervalChangedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_swap_interval_changed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::ChangeReason;

    fn sample_start() -> FrameStartEvent {
        FrameStartEvent {
            frame_index: 42,
            timestamp: HostTime(1_000_000),
            swap_interval: 1,
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_frame_start(&sample_start());
        sink.on_swap_interval_changed(&SwapIntervalChangedEvent {
            frame_index: 0,
            change: IntervalChange {
                from: 1,
                to: 2,
                reason: ChangeReason::Slower,
            },
            refresh_period: Duration(16_666_667),
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_start(&sample_start());
        tracer.pre_wait(&PreWaitEvent {
            frame_index: 42,
            timestamp: HostTime(1),
            release_at: HostTime(2),
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            frames: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_start(&mut self, e: &FrameStartEvent) {
                self.frames.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { frames: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_start(&sample_start());
        tracer.post_wait(&PostWaitEvent {
            frame_index: 42,
            timestamp: HostTime(3),
            waited: Duration(1),
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.frames, &[42]);
    }
}
