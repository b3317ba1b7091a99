// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame pacing for swap-chain render loops.
//!
//! `cadence_core` decides when a rendered frame should be handed to the
//! platform's swap call so that frames reach the display at an even cadence,
//! picks how many refresh periods each frame should occupy, and keeps
//! statistics about how well that worked.
//!
//! # Architecture
//!
//! A render thread drives the engine; platform callback threads feed it
//! timing through a shared bridge:
//!
//! ```text
//!   Compositor / display callbacks (any thread)
//!       │ publish_timing_changed, publish_vsync,
//!       │ publish_supported_refresh_rates
//!       ▼
//!   TimingBridge ────────────────────────────────┐
//!                                                │ latest timing
//!   render thread                                ▼
//!   record_frame_start ──► on_pre_swap ──► PresentationScheduler::plan
//!                              │                 │
//!                              │ sleep / fence   ▼
//!                              ▼            SwapDirective ──► swap call
//!                          on_post_swap ──► StatisticsCollector
//!                              │
//!                              ▼
//!                   SwapIntervalController ──► DisplayModes::request_mode
//! ```
//!
//! **[`engine`]**: [`PacingEngine`](engine::PacingEngine), the facade the
//! render loop calls three times per frame.
//!
//! **[`bridge`]**: [`TimingBridge`](bridge::TimingBridge), the mutex and
//! condition-variable mailbox between callback threads and the render thread.
//!
//! **[`timing`]**: Validated [`TimingModel`](timing::TimingModel) snapshots,
//! the supported refresh-rate set, and swap-interval arithmetic.
//!
//! **[`interval`]**: Hysteresis-based swap-interval and pipelining
//! selection.
//!
//! **[`scheduler`]**: Per-frame deadlines anchored to the vsync grid.
//!
//! **[`stats`]**: Idle, late, offset and latency histograms.
//!
//! **[`capability`]**: Optional platform features (presentation timestamps,
//! GPU fences, display modes) with no-op fallbacks.
//!
//! **[`time`]**: Nanosecond time types and the [`Clock`](time::Clock)
//! abstraction, including a manual clock for deterministic tests.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Logging
//!
//! Decisions are logged through [`tracing`]: `warn` for rejected timing and
//! degraded features, `info` for interval, pipelining and display-mode
//! changes, `debug` for everything else. The crate never installs a
//! subscriber.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bridge;
pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod scheduler;
pub mod stats;
pub mod time;
pub mod timing;
pub mod trace;

pub use config::PacingConfig;
pub use engine::PacingEngine;
pub use error::{Feature, PacingError};
