// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Times are
//! printed in microseconds.

use std::io::Write;

use cadence_core::time::{Duration, HostTime};
use cadence_core::trace::{
    FrameStartEvent, PostSwapEvent, PostWaitEvent, PreSwapEvent, PreWaitEvent,
    SwapIntervalChangedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

fn dur_us(d: Duration) -> f64 {
    d.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        let _ = writeln!(
            self.writer,
            "[frame:start] frame={} at {:.1}µs interval={}",
            e.frame_index,
            us(e.timestamp),
            e.swap_interval,
        );
    }

    fn on_pre_wait(&mut self, e: &PreWaitEvent) {
        let _ = writeln!(
            self.writer,
            "[wait:begin] frame={} at {:.1}µs release={:.1}µs",
            e.frame_index,
            us(e.timestamp),
            us(e.release_at),
        );
    }

    fn on_post_wait(&mut self, e: &PostWaitEvent) {
        let _ = writeln!(
            self.writer,
            "[wait:end] frame={} at {:.1}µs waited={:.1}µs",
            e.frame_index,
            us(e.timestamp),
            dur_us(e.waited),
        );
    }

    fn on_pre_swap(&mut self, e: &PreSwapEvent) {
        let _ = writeln!(
            self.writer,
            "[swap:pre] frame={} at {:.1}µs target={:.1}µs pipelined={}",
            e.frame_index,
            us(e.timestamp),
            us(e.target_present),
            e.pipelined,
        );
    }

    fn on_post_swap(&mut self, e: &PostSwapEvent) {
        let outcome = match e.actual_present {
            Some(actual) if actual > e.target_present => "LATE",
            Some(_) => "ok",
            None => "?",
        };
        let actual = e
            .actual_present
            .map_or_else(|| "?".to_owned(), |t| format!("{:.1}µs", us(t)));
        let _ = writeln!(
            self.writer,
            "[swap:post] frame={} target={:.1}µs actual={actual} {outcome}",
            e.frame_index,
            us(e.target_present),
        );
    }

    fn on_swap_interval_changed(&mut self, e: &SwapIntervalChangedEvent) {
        let _ = writeln!(
            self.writer,
            "[interval] frame={} {} -> {} ({:?}) period={:.1}µs",
            e.frame_index,
            e.change.from,
            e.change.to,
            e.change.reason,
            dur_us(e.refresh_period),
        );
    }
}
