// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run closures on a designated thread's event loop.
//!
//! Some platform calls (display-mode switches, JNI-attached callbacks, UI
//! toolkit APIs) are only legal on one particular thread, while pacing
//! decisions are made on the render thread. [`Dispatcher`] bridges the two:
//!
//! ```text
//!   any thread                         bound thread
//!   ──────────                         ────────────
//!   DispatchSender::post(f) ──► channel ──► calloop dispatch ──► f()
//! ```
//!
//! The dispatcher is created on the target thread with that thread's
//! `calloop` [`LoopHandle`](calloop::LoopHandle):
//!
//! ```rust,ignore
//! let mut event_loop = calloop::EventLoop::<State>::try_new()?;
//! let dispatcher = Dispatcher::for_current_thread(Some(&event_loop.handle()));
//!
//! let sender = dispatcher.sender();
//! std::thread::spawn(move || {
//!     sender.post(|| switch_display_mode(42));
//! });
//!
//! event_loop.run(None, &mut state, |_| {})?;
//! ```
//!
//! Posting from the bound thread itself runs the closure immediately. A
//! dispatcher created without an event loop runs every posted closure on the
//! caller's thread and reports
//! [`PacingError::ThreadAffinityViolation`](cadence_core::PacingError::ThreadAffinityViolation).

mod dispatcher;

pub use dispatcher::{DispatchSender, Dispatcher, Task};
