// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`PacingEngine`] facade driven by the render loop.
//!
//! One engine serves one swap chain. The render thread owns it and calls, per
//! frame:
//!
//! ```rust,ignore
//! engine.record_frame_start();
//! // ... build the frame ...
//! let directive = engine.on_pre_swap();
//! swap_buffers(directive.present_hint);
//! engine.on_post_swap();
//! ```
//!
//! Platform callbacks reach the engine through the shared
//! [`TimingBridge`] returned by [`PacingEngine::bridge`]; the engine picks up
//! new timing at the start of each frame and at pre-swap.

use std::sync::Arc;

use crate::bridge::TimingBridge;
use crate::capability::Capabilities;
use crate::config::PacingConfig;
use crate::error::Feature;
use crate::interval::{FrameCost, IntervalChange, SwapIntervalController};
use crate::scheduler::{PresentReport, PresentationScheduler, SwapDirective};
use crate::stats::{FrameStats, StatisticsCollector};
use crate::time::{Clock, Duration, MonotonicClock};
use crate::timing::{TimingModel, calculate_swap_interval};
use crate::trace::{
    FrameStartEvent, PostSwapEvent, PostWaitEvent, PreSwapEvent, PreWaitEvent,
    SwapIntervalChangedEvent, TraceSink, Tracer,
};

/// Paces presentation of one swap chain.
///
/// Dropping the engine shuts down its [`TimingBridge`], which releases any
/// thread still blocked in it.
pub struct PacingEngine<C = MonotonicClock> {
    config: PacingConfig,
    clock: C,
    bridge: Arc<TimingBridge>,
    capabilities: Capabilities,
    degraded: Vec<Feature>,
    timing: TimingModel,
    timing_version: u64,
    controller: SwapIntervalController,
    scheduler: PresentationScheduler,
    stats: StatisticsCollector,
    auto_pipelining: bool,
    requested_mode: Option<i32>,
    sink: Option<Box<dyn TraceSink + Send>>,
}

impl<C> core::fmt::Debug for PacingEngine<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PacingEngine")
            .field("timing", &self.timing)
            .field("controller", &self.controller)
            .field("scheduler", &self.scheduler)
            .field("capabilities", &self.capabilities)
            .field("auto_pipelining", &self.auto_pipelining)
            .finish_non_exhaustive()
    }
}

impl PacingEngine<MonotonicClock> {
    /// Creates an engine on the system monotonic clock.
    #[must_use]
    pub fn with_monotonic_clock(config: PacingConfig, capabilities: Capabilities) -> Self {
        Self::new(config, capabilities, MonotonicClock)
    }
}

impl<C: Clock> PacingEngine<C> {
    /// Creates an engine.
    ///
    /// Missing capabilities are logged once here and listed by
    /// [`degraded_features`](Self::degraded_features); they are never
    /// reported again per frame.
    #[must_use]
    pub fn new(config: PacingConfig, capabilities: Capabilities, clock: C) -> Self {
        let degraded = capabilities.degraded_features();
        for feature in &degraded {
            tracing::warn!(%feature, "platform feature unavailable; running degraded");
        }

        let mut controller = SwapIntervalController::new(config.interval);
        controller
            .set_pipelining_allowed(config.auto_pipelining && capabilities.gpu_fence.is_supported());
        controller.set_auto(config.auto_swap_interval);
        let stats = StatisticsCollector::new(capabilities.present_timestamps.is_supported());

        Self {
            timing: TimingModel::from_period(config.default_refresh_period),
            timing_version: 0,
            auto_pipelining: config.auto_pipelining,
            requested_mode: None,
            bridge: Arc::new(TimingBridge::new()),
            scheduler: PresentationScheduler::new(),
            degraded,
            controller,
            stats,
            capabilities,
            clock,
            config,
            sink: None,
        }
    }

    /// The bridge platform callbacks publish timing through.
    #[must_use]
    pub fn bridge(&self) -> Arc<TimingBridge> {
        Arc::clone(&self.bridge)
    }

    /// Features running degraded on this platform.
    #[must_use]
    pub fn degraded_features(&self) -> &[Feature] {
        &self.degraded
    }

    /// The configuration the engine was created with.
    #[must_use]
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Installs a trace sink.
    ///
    /// Events are only delivered when the `trace` feature is enabled.
    pub fn set_trace_sink(&mut self, sink: impl TraceSink + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Removes the trace sink, if any.
    pub fn clear_trace_sink(&mut self) {
        self.sink = None;
    }

    /// Marks the start of CPU work for the next frame.
    pub fn record_frame_start(&mut self) {
        self.sync_timing();
        let now = self.clock.now();
        self.scheduler.record_frame_start(now);
        tracer(&mut self.sink).frame_start(&FrameStartEvent {
            frame_index: self.scheduler.next_frame_index(),
            timestamp: now,
            swap_interval: self.controller.interval(),
        });
    }

    /// Blocks until the frame may be swapped and returns how to swap it.
    ///
    /// With pipelining active this first waits (up to the configured fence
    /// timeout) for the GPU to finish the previous frame. A wait that runs
    /// past the release time pushes the release and target back by whole
    /// refresh periods. It then sleeps until the frame's release time.
    pub fn on_pre_swap(&mut self) -> SwapDirective {
        self.sync_timing();
        let now = self.clock.now();
        let pipelined = self.is_pipelining_active();
        let mut plan = self.scheduler.plan(
            now,
            &self.timing,
            self.bridge.latest_vsync(),
            self.controller.interval(),
            pipelined,
        );

        tracer(&mut self.sink).pre_wait(&PreWaitEvent {
            frame_index: plan.frame_index,
            timestamp: now,
            release_at: plan.release_at,
        });

        if pipelined && !self.capabilities.gpu_fence.is_complete() {
            if !self.capabilities.gpu_fence.wait(self.config.fence_timeout) {
                tracing::debug!(
                    frame_index = plan.frame_index,
                    timeout_ns = self.config.fence_timeout.nanos(),
                    "GPU fence wait timed out"
                );
            }
            let skipped = self.scheduler.catch_up(self.clock.now());
            if skipped > 0 {
                if let Some(moved) = self.scheduler.current_plan() {
                    plan = *moved;
                }
                tracing::debug!(
                    frame_index = plan.frame_index,
                    skipped,
                    "GPU fence wait overran the release time; retargeting"
                );
            }
        }
        if self.clock.now() < plan.release_at {
            self.clock.sleep_until(plan.release_at);
        }

        let released = self.clock.now();
        let waited = released.saturating_duration_since(now);
        self.scheduler.released(waited);
        tracer(&mut self.sink).post_wait(&PostWaitEvent {
            frame_index: plan.frame_index,
            timestamp: released,
            waited,
        });

        let directive = SwapDirective {
            frame_index: plan.frame_index,
            target_present: plan.target_present,
            present_hint: self
                .capabilities
                .present_hint
                .then_some(plan.target_present),
        };
        tracer(&mut self.sink).pre_swap(&PreSwapEvent {
            frame_index: plan.frame_index,
            timestamp: released,
            target_present: plan.target_present,
            pipelined,
        });
        directive
    }

    /// Accounts for the frame that was just swapped.
    ///
    /// Returns `None` if [`on_pre_swap`](Self::on_pre_swap) was not called
    /// for this frame.
    pub fn on_post_swap(&mut self) -> Option<PresentReport> {
        let Some(plan) = self.scheduler.current_plan().copied() else {
            tracing::debug!("post-swap without pre-swap; ignored");
            return None;
        };
        self.capabilities.gpu_fence.insert();
        let actual = self
            .capabilities
            .present_timestamps
            .actual_present(plan.frame_index);
        let report = self.scheduler.complete(actual, &mut self.stats)?;

        tracer(&mut self.sink).post_swap(&PostSwapEvent {
            frame_index: report.frame_index,
            timestamp: self.clock.now(),
            target_present: report.target_present,
            actual_present: report.actual_present,
        });

        let gpu_time = self.capabilities.gpu_fence.previous_frame_gpu_time();
        let cost = self.frame_cost(report.cpu_time, gpu_time);
        let was_pipelined = self.controller.is_pipelined();
        if let Some(change) = self
            .controller
            .observe(cost, self.timing.refresh_period())
        {
            self.on_interval_changed(change);
        }
        if self.controller.is_pipelined() != was_pipelined {
            tracing::debug!(
                frame_index = report.frame_index,
                pipelined = self.controller.is_pipelined(),
                "pipelining switched for the next frame"
            );
        }
        Some(report)
    }

    /// Turns automatic swap-interval selection on or off.
    pub fn set_auto_swap_interval(&mut self, enabled: bool) {
        tracing::info!(enabled, "auto swap interval");
        self.controller.set_auto(enabled);
    }

    /// Whether the swap interval is selected automatically.
    #[must_use]
    pub fn is_auto_swap_interval(&self) -> bool {
        self.controller.is_auto()
    }

    /// Sets the swap interval explicitly.
    ///
    /// 0 is treated as 1. Values above the configured maximum are clamped.
    /// The resulting frame time is also the shortest one auto mode will
    /// select afterwards.
    pub fn set_swap_interval(&mut self, interval: u32) {
        if interval == 0 {
            tracing::warn!("swap interval 0 requested; using 1");
        }
        let min_frame_time = self.timing.refresh_period().saturating_mul(interval.max(1));
        self.apply_swap_interval(interval, min_frame_time);
    }

    /// Sets the swap interval from a desired frame time on the current
    /// refresh period.
    ///
    /// Auto mode never selects a frame time shorter than `frame_time`.
    pub fn set_swap_interval_ns(&mut self, frame_time: Duration) {
        let interval = calculate_swap_interval(frame_time, self.timing.refresh_period());
        self.apply_swap_interval(interval, frame_time);
    }

    fn apply_swap_interval(&mut self, interval: u32, min_frame_time: Duration) {
        self.controller.set_min_frame_time(min_frame_time);
        if let Some(change) = self.controller.set_interval(interval) {
            self.on_interval_changed(change);
        }
    }

    /// Enables or disables auto pipeline mode.
    ///
    /// When enabled and a GPU fence is available, pipelining starts on and
    /// auto mode drops it while frames fit without it. When disabled no frame
    /// is pipelined.
    pub fn set_auto_pipelining(&mut self, enabled: bool) {
        tracing::info!(enabled, "auto pipelining");
        self.auto_pipelining = enabled;
        self.controller
            .set_pipelining_allowed(enabled && self.capabilities.gpu_fence.is_supported());
    }

    /// Whether pipelining is requested.
    #[must_use]
    pub fn auto_pipelining(&self) -> bool {
        self.auto_pipelining
    }

    /// Whether the next frame will be pipelined.
    #[must_use]
    pub fn is_pipelining_active(&self) -> bool {
        self.controller.is_pipelined()
    }

    /// Current swap interval in refresh periods.
    #[must_use]
    pub fn swap_interval(&self) -> u32 {
        self.controller.interval()
    }

    /// Current swap interval as a frame time.
    #[must_use]
    pub fn swap_interval_ns(&self) -> Duration {
        self.timing
            .refresh_period()
            .saturating_mul(self.controller.interval())
    }

    /// The timing model in use.
    #[must_use]
    pub fn current_timing(&self) -> TimingModel {
        self.timing
    }

    /// A copy of the statistics collected so far.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats.stats()
    }

    /// Zeroes all statistics, including the frame count.
    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    fn sync_timing(&mut self) {
        let Some(update) = self.bridge.take_timing(self.timing_version) else {
            return;
        };
        self.timing_version = update.version;
        let old_period = self.timing.refresh_period();
        self.timing = update.model;
        let new_period = update.model.refresh_period();
        if old_period == new_period {
            return;
        }
        tracing::info!(
            old_ns = old_period.nanos(),
            new_ns = new_period.nanos(),
            "refresh period changed"
        );
        if let Some(change) = self
            .controller
            .on_refresh_period_changed(old_period, new_period)
        {
            self.on_interval_changed(change);
        }
    }

    fn frame_cost(&self, cpu: Duration, gpu: Option<Duration>) -> FrameCost {
        let cap = self.config.max_frame_duration;
        FrameCost::new(cpu.min(cap), gpu.unwrap_or(Duration::ZERO).min(cap))
    }

    fn on_interval_changed(&mut self, change: IntervalChange) {
        tracer(&mut self.sink).swap_interval_changed(&SwapIntervalChangedEvent {
            frame_index: self.scheduler.next_frame_index(),
            change,
            refresh_period: self.timing.refresh_period(),
        });
        self.update_display_mode();
    }

    /// Requests the display mode that presents the current workload soonest.
    fn update_display_mode(&mut self) {
        if !self.controller.is_auto() || !self.capabilities.display_modes.is_supported() {
            return;
        }
        let Some(rates) = self.bridge.try_supported_refresh_rates() else {
            return;
        };
        let period = self.timing.refresh_period();
        let observed = self
            .controller
            .window_statistic()
            .unwrap_or_else(|| period.saturating_mul(self.controller.interval()));
        let floor = self.controller.min_frame_time();
        let Some(candidate) = rates.preferred_for(observed.max(floor)) else {
            return;
        };
        if self.requested_mode == Some(candidate.display_mode_id) {
            return;
        }
        tracing::info!(
            display_mode_id = candidate.display_mode_id,
            period_ns = candidate.period.nanos(),
            "requesting display mode"
        );
        self.capabilities
            .display_modes
            .request_mode(candidate.display_mode_id);
        self.requested_mode = Some(candidate.display_mode_id);
    }
}

impl<C> Drop for PacingEngine<C> {
    fn drop(&mut self) {
        self.bridge.shutdown();
    }
}

fn tracer(sink: &mut Option<Box<dyn TraceSink + Send>>) -> Tracer<'_> {
    Tracer::from_option(sink.as_deref_mut().map(|s| s as &mut dyn TraceSink))
}
