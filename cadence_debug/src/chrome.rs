// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`ChromeTraceSink`] streams pacing events as [Chrome Trace Event
//! Format][spec] JSON to the given writer. The output is a JSON array,
//! suitable for loading into `chrome://tracing` or
//! [Perfetto](https://ui.perfetto.dev/). The closing bracket is written by
//! [`ChromeTraceSink::finish`], or on drop.
//!
//! Waits become duration slices and the swap interval a counter track. Other
//! events are instants. Interval changes carry no timestamp of their own and
//! are placed at the most recent event.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use cadence_core::time::{Duration, HostTime};
use cadence_core::trace::{
    FrameStartEvent, PostSwapEvent, PostWaitEvent, PreSwapEvent, PreWaitEvent,
    SwapIntervalChangedEvent, TraceSink,
};

/// Streams trace events as Chrome Trace Event Format JSON.
pub struct ChromeTraceSink<W: Write> {
    writer: Option<W>,
    written: usize,
    error: Option<io::Error>,
    last_ts: f64,
}

impl<W: Write> std::fmt::Debug for ChromeTraceSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeTraceSink")
            .field("written", &self.written)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<W: Write> ChromeTraceSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            written: 0,
            error: None,
            last_ts: 0.0,
        }
    }

    /// Number of events written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Closes the JSON array and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error hit while writing any event, or the error
    /// from writing the closing bracket.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("trace already finished"))?;
        close(&mut writer, self.written)?;
        Ok(writer)
    }

    fn emit(&mut self, event: &Value) {
        if let Some(ts) = event["ts"].as_f64() {
            self.last_ts = ts;
        }
        if self.error.is_some() {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let separator: &[u8] = if self.written == 0 { b"[\n" } else { b",\n" };
        let result = writer
            .write_all(separator)
            .and_then(|()| serde_json::to_writer(&mut *writer, event).map_err(io::Error::from));
        match result {
            Ok(()) => self.written += 1,
            Err(err) => self.error = Some(err),
        }
    }
}

impl<W: Write> Drop for ChromeTraceSink<W> {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = close(writer, self.written);
        }
    }
}

fn close<W: Write>(writer: &mut W, written: usize) -> io::Result<()> {
    if written == 0 {
        writer.write_all(b"[]\n")?;
    } else {
        writer.write_all(b"\n]\n")?;
    }
    writer.flush()
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

fn dur_us(d: Duration) -> f64 {
    d.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for ChromeTraceSink<W> {
    fn on_frame_start(&mut self, e: &FrameStartEvent) {
        self.emit(&json!({
            "ph": "i",
            "name": "FrameStart",
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "swap_interval": e.swap_interval,
            }
        }));
    }

    fn on_pre_wait(&mut self, e: &PreWaitEvent) {
        self.emit(&json!({
            "ph": "B",
            "name": "Wait",
            "cat": "Pacing",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "release_at_us": us(e.release_at),
            }
        }));
    }

    fn on_post_wait(&mut self, e: &PostWaitEvent) {
        self.emit(&json!({
            "ph": "E",
            "name": "Wait",
            "cat": "Pacing",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "waited_us": dur_us(e.waited),
            }
        }));
    }

    fn on_pre_swap(&mut self, e: &PreSwapEvent) {
        self.emit(&json!({
            "ph": "i",
            "name": "PreSwap",
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "target_present_us": us(e.target_present),
                "pipelined": e.pipelined,
            }
        }));
    }

    fn on_post_swap(&mut self, e: &PostSwapEvent) {
        self.emit(&json!({
            "ph": "i",
            "name": "PostSwap",
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "target_present_us": us(e.target_present),
                "actual_present_us": e.actual_present.map(us),
                "late": e.actual_present.map(|t| t > e.target_present),
            }
        }));
    }

    fn on_swap_interval_changed(&mut self, e: &SwapIntervalChangedEvent) {
        self.emit(&json!({
            "ph": "C",
            "name": "SwapInterval",
            "cat": "Pacing",
            "ts": self.last_ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "interval": e.change.to,
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::interval::{ChangeReason, IntervalChange};

    #[test]
    fn finish_produces_valid_json() {
        let mut sink = ChromeTraceSink::new(Vec::new());
        sink.on_frame_start(&FrameStartEvent {
            frame_index: 0,
            timestamp: HostTime(1_000_000),
            swap_interval: 1,
        });
        sink.on_pre_wait(&PreWaitEvent {
            frame_index: 0,
            timestamp: HostTime(11_000_000),
            release_at: HostTime(17_666_667),
        });
        sink.on_post_wait(&PostWaitEvent {
            frame_index: 0,
            timestamp: HostTime(17_666_667),
            waited: Duration(6_666_667),
        });
        sink.on_post_swap(&PostSwapEvent {
            frame_index: 0,
            timestamp: HostTime(18_000_000),
            target_present: HostTime(17_666_667),
            actual_present: None,
        });
        assert_eq!(sink.written(), 4);

        let out = sink.finish().unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameStart");
        assert_eq!(parsed[0]["ts"], 1000.0);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[1]["name"], parsed[2]["name"]);

        assert_eq!(parsed[3]["args"]["actual_present_us"], Value::Null);
        assert_eq!(parsed[3]["args"]["late"], Value::Null);
    }

    #[test]
    fn interval_changes_become_a_counter() {
        let mut sink = ChromeTraceSink::new(Vec::new());
        sink.on_swap_interval_changed(&SwapIntervalChangedEvent {
            frame_index: 5,
            change: IntervalChange {
                from: 1,
                to: 2,
                reason: ChangeReason::Slower,
            },
            refresh_period: Duration(16_666_667),
        });
        let out = sink.finish().unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["ph"], "C");
        assert_eq!(parsed[0]["args"]["interval"], 2);
    }

    #[test]
    fn empty_trace_is_an_empty_array() {
        let sink = ChromeTraceSink::new(Vec::new());
        let out = sink.finish().unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn drop_closes_the_array() {
        let mut out = Vec::new();
        {
            let mut sink = ChromeTraceSink::new(&mut out);
            sink.on_pre_swap(&PreSwapEvent {
                frame_index: 1,
                timestamp: HostTime(2_000),
                target_present: HostTime(16_000),
                pipelined: true,
            });
        }
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["args"]["pipelined"], true);
    }
}
