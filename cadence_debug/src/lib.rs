// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and Chrome trace export for cadence frame-pacing
//! diagnostics.
//!
//! This crate provides [`TraceSink`](cadence_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`chrome::ChromeTraceSink`]: streams Chrome Trace Event Format JSON.
//!
//! Attach either with
//! [`PacingEngine::set_trace_sink`](cadence_core::PacingEngine::set_trace_sink).
//! Sinks only receive events when `cadence_core` is built with its `trace`
//! feature, which this crate enables.

pub mod chrome;
pub mod pretty;
