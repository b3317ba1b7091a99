// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Swap-interval selection with hysteresis.
//!
//! The [`SwapIntervalController`] decides how many refresh periods the loop
//! targets between presented frames. In auto mode it watches a bounded
//! window of recent frame costs and steps the interval up or down by one
//! after a sustained run of frames that do not fit (or comfortably fit) the
//! current budget. Stepping down needs a longer run than stepping up: a
//! stable lower frame rate is preferred over visible jank.
//!
//! The same window decides pipelining. Overlapping a frame's CPU work with
//! the previous frame's GPU work is tried before a longer interval, and is
//! dropped again once frames fit without it.

use std::collections::VecDeque;

use crate::time::Duration;
use crate::timing::calculate_swap_interval;

/// Which statistic of the duration window is compared against the budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowStatistic {
    /// The longest frame in the window.
    Max,
    /// Nearest-rank percentile (1–100) of the window.
    Percentile(u8),
}

/// Tunable thresholds for the [`SwapIntervalController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalConfig {
    /// Interval the controller starts at.
    pub initial_interval: u32,
    /// Highest interval auto mode may select.
    pub max_interval: u32,
    /// Capacity of the frame-duration ring buffer.
    pub window_len: usize,
    /// Statistic compared against the budget.
    pub statistic: WindowStatistic,
    /// Consecutive over-budget frames before the interval increases.
    pub slower_after: u32,
    /// Consecutive well-under-budget frames before the interval decreases.
    pub faster_after: u32,
    /// Hysteresis margin applied to both bounds. The lower bound subtracts it
    /// twice so frames right at a boundary do not flap.
    pub margin: Duration,
}

impl IntervalConfig {
    /// Balanced defaults: react to jank within three frames, recover after
    /// ten.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            initial_interval: 1,
            max_interval: 3,
            window_len: 10,
            statistic: WindowStatistic::Max,
            slower_after: 3,
            faster_after: 10,
            margin: Duration::from_millis(1),
        }
    }

    /// Allows longer intervals and is slower to speed back up.
    #[must_use]
    pub const fn power_saving() -> Self {
        Self {
            initial_interval: 1,
            max_interval: 4,
            window_len: 20,
            statistic: WindowStatistic::Percentile(90),
            slower_after: 3,
            faster_after: 30,
            margin: Duration::from_millis(1),
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Direction of an interval change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// Frames did not fit the budget; fewer frames per second.
    Slower,
    /// Frames fit a shorter budget; more frames per second.
    Faster,
    /// The refresh period changed and the interval was rescaled.
    RefreshChanged,
    /// The caller set the interval explicitly.
    Explicit,
}

/// A change of the current swap interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntervalChange {
    /// Interval before the change.
    pub from: u32,
    /// Interval after the change.
    pub to: u32,
    /// Why it changed.
    pub reason: ChangeReason,
}

/// CPU and GPU time spent on one frame.
///
/// How the two combine depends on whether the frame is pipelined: with
/// pipelining the CPU prepares a frame while the GPU is still drawing the
/// previous one, so the slower of the two sets the pace. Without it they run
/// back to back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameCost {
    /// CPU time from frame start to the pre-swap call.
    pub cpu: Duration,
    /// GPU time of the previous frame, or zero if unknown.
    pub gpu: Duration,
}

impl FrameCost {
    /// Creates a frame cost.
    #[must_use]
    pub const fn new(cpu: Duration, gpu: Duration) -> Self {
        Self { cpu, gpu }
    }

    /// Frame time when CPU and GPU work overlap.
    #[must_use]
    pub fn pipelined(self) -> Duration {
        self.cpu.max(self.gpu)
    }

    /// Frame time when CPU and GPU work run back to back.
    #[must_use]
    pub fn sequential(self) -> Duration {
        self.cpu.saturating_add(self.gpu)
    }

    /// Frame time in the given mode.
    #[must_use]
    pub fn in_mode(self, pipelined: bool) -> Duration {
        if pipelined {
            self.pipelined()
        } else {
            self.sequential()
        }
    }
}

/// A CPU-only cost.
impl From<Duration> for FrameCost {
    fn from(cpu: Duration) -> Self {
        Self::new(cpu, Duration::ZERO)
    }
}

/// Bounded ring of recent frame costs with a `drop_oldest` policy.
#[derive(Clone, Debug)]
struct CostWindow {
    samples: VecDeque<FrameCost>,
    capacity: usize,
}

impl CostWindow {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, sample: FrameCost) {
        if self.samples.len() == self.capacity {
            let _ = self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn statistic(&self, statistic: WindowStatistic, pipelined: bool) -> Option<Duration> {
        let costs = self.samples.iter().map(|c| c.in_mode(pipelined));
        match statistic {
            WindowStatistic::Max => costs.max(),
            WindowStatistic::Percentile(p) => {
                if self.samples.is_empty() {
                    return None;
                }
                let mut sorted: Vec<Duration> = costs.collect();
                sorted.sort_unstable();
                let n = sorted.len();
                let p = usize::from(p.clamp(1, 100));
                let rank = (p * n).div_ceil(100).clamp(1, n);
                Some(sorted[rank - 1])
            }
        }
    }
}

/// Chooses the swap interval, and whether to pipeline, from observed frame
/// costs.
///
/// Pipelining is only considered once the owner allows it (see
/// [`set_pipelining_allowed`](Self::set_pipelining_allowed)). It is then
/// switched on when frames only fit the budget with CPU and GPU overlapping,
/// and off again after a sustained run of frames that fit without it.
///
/// A minimum frame time (see [`set_min_frame_time`](Self::set_min_frame_time))
/// bounds how fast auto mode may go.
///
/// # Usage
///
/// ```rust,ignore
/// if let Some(change) = controller.observe(cost, timing.refresh_period()) {
///     // retarget presentation at change.to × refresh period
/// }
/// ```
#[derive(Clone, Debug)]
pub struct SwapIntervalController {
    config: IntervalConfig,
    current: u32,
    auto: bool,
    window: CostWindow,
    consecutive_slow: u32,
    consecutive_fast: u32,
    min_frame_time: Duration,
    pipelining_allowed: bool,
    pipelined: bool,
}

impl SwapIntervalController {
    /// Creates a controller in auto mode, with pipelining disallowed.
    #[must_use]
    pub fn new(config: IntervalConfig) -> Self {
        let max_interval = config.max_interval.max(1);
        Self {
            current: config.initial_interval.clamp(1, max_interval),
            auto: true,
            window: CostWindow::with_capacity(config.window_len),
            consecutive_slow: 0,
            consecutive_fast: 0,
            min_frame_time: Duration::ZERO,
            pipelining_allowed: false,
            pipelined: false,
            config: IntervalConfig {
                max_interval,
                ..config
            },
        }
    }

    /// Current swap interval (at least 1).
    #[must_use]
    pub fn interval(&self) -> u32 {
        self.current
    }

    /// Whether auto mode is on.
    #[must_use]
    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Whether frames are currently pipelined.
    #[must_use]
    pub fn is_pipelined(&self) -> bool {
        self.pipelined
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &IntervalConfig {
        &self.config
    }

    /// Current value of the configured window statistic, measured in the
    /// current pipelining mode.
    #[must_use]
    pub fn window_statistic(&self) -> Option<Duration> {
        self.window.statistic(self.config.statistic, self.pipelined)
    }

    /// Turns auto mode on or off.
    ///
    /// Turning it off freezes the interval at its current value, and
    /// pipelines every frame if pipelining is allowed.
    pub fn set_auto(&mut self, enabled: bool) {
        self.auto = enabled;
        self.reset_counters();
        if !enabled {
            self.set_pipelined(self.pipelining_allowed);
        }
    }

    /// Allows or forbids pipelining.
    ///
    /// Newly allowed pipelining starts switched on; auto mode turns it off
    /// once frames fit without it. Forbidding it switches it off at once.
    pub fn set_pipelining_allowed(&mut self, allowed: bool) {
        if allowed == self.pipelining_allowed {
            return;
        }
        self.pipelining_allowed = allowed;
        self.reset_counters();
        self.set_pipelined(allowed);
    }

    /// Sets the shortest frame time auto mode may target.
    ///
    /// The interval never steps down to a frame time below this one. Zero
    /// (the default) leaves auto mode free to reach an interval of 1.
    pub fn set_min_frame_time(&mut self, min_frame_time: Duration) {
        self.min_frame_time = min_frame_time;
        self.reset_counters();
    }

    /// The shortest frame time auto mode may target.
    #[must_use]
    pub fn min_frame_time(&self) -> Duration {
        self.min_frame_time
    }

    /// Sets the interval explicitly, clamped to `1..=max_interval`.
    ///
    /// In manual mode the value holds until auto mode is re-enabled. In auto
    /// mode it becomes the starting point for further adaptation.
    pub fn set_interval(&mut self, interval: u32) -> Option<IntervalChange> {
        let to = interval.clamp(1, self.config.max_interval);
        self.reset_counters();
        self.change_to(to, ChangeReason::Explicit)
    }

    /// Feeds one frame's cost and adapts the interval and pipelining in auto
    /// mode.
    ///
    /// A bare [`Duration`] is taken as CPU time with no GPU time.
    pub fn observe(
        &mut self,
        cost: impl Into<FrameCost>,
        refresh_period: Duration,
    ) -> Option<IntervalChange> {
        self.window.push(cost.into());
        if !self.auto {
            return None;
        }
        let sequential = self.window.statistic(self.config.statistic, false)?;
        let overlapped = self.window.statistic(self.config.statistic, true)?;
        let current_cost = if self.pipelined { overlapped } else { sequential };
        // The cheapest this workload can be paced at.
        let best_cost = if self.pipelining_allowed {
            overlapped
        } else {
            sequential
        };

        let upper = self.upper_bound(self.current, refresh_period);
        let lower = refresh_period
            .saturating_mul(self.current - 1)
            .saturating_sub(self.config.margin.saturating_mul(2));
        let may_go_faster = self.current > 1
            && self.min_frame_time <= refresh_period.saturating_mul(self.current - 1);

        if current_cost > upper {
            self.consecutive_slow += 1;
            self.consecutive_fast = 0;
            if self.consecutive_slow >= self.config.slower_after {
                self.reset_counters();
                if self.pipelining_allowed
                    && !self.pipelined
                    && (overlapped <= upper || self.current == self.config.max_interval)
                {
                    self.set_pipelined(true);
                    return None;
                }
                if self.current < self.config.max_interval {
                    let change = self.change_to(self.current + 1, ChangeReason::Slower);
                    self.settle_pipelining(sequential, refresh_period);
                    return change;
                }
            }
        } else if may_go_faster && best_cost < lower {
            self.consecutive_fast += 1;
            self.consecutive_slow = 0;
            if self.consecutive_fast >= self.config.faster_after {
                self.reset_counters();
                let change = self.change_to(self.current - 1, ChangeReason::Faster);
                self.settle_pipelining(sequential, refresh_period);
                return change;
            }
        } else if self.pipelined && self.fits_without_pipelining(sequential, upper) {
            self.consecutive_fast += 1;
            self.consecutive_slow = 0;
            if self.consecutive_fast >= self.config.faster_after {
                self.reset_counters();
                self.set_pipelined(false);
            }
        } else {
            self.reset_counters();
        }
        None
    }

    /// Rescales the interval to keep the same frame time on a new refresh
    /// period, and discards samples measured against the old one.
    pub fn on_refresh_period_changed(
        &mut self,
        old_period: Duration,
        new_period: Duration,
    ) -> Option<IntervalChange> {
        self.window.clear();
        self.reset_counters();
        let frame_time = old_period.saturating_mul(self.current);
        let to = calculate_swap_interval(frame_time, new_period).clamp(1, self.config.max_interval);
        self.change_to(to, ChangeReason::RefreshChanged)
    }

    fn upper_bound(&self, interval: u32, refresh_period: Duration) -> Duration {
        refresh_period
            .saturating_mul(interval)
            .saturating_sub(self.config.margin)
    }

    /// Sequential frames must clear the budget by two margins before
    /// pipelining is dropped.
    fn fits_without_pipelining(&self, sequential: Duration, upper: Duration) -> bool {
        self.pipelining_allowed
            && sequential < upper.saturating_sub(self.config.margin.saturating_mul(2))
    }

    /// Picks the pipelining mode for a freshly changed interval.
    fn settle_pipelining(&mut self, sequential: Duration, refresh_period: Duration) {
        if !self.pipelining_allowed {
            return;
        }
        let upper = self.upper_bound(self.current, refresh_period);
        let pipelined = !self.fits_without_pipelining(sequential, upper);
        self.set_pipelined(pipelined);
    }

    fn set_pipelined(&mut self, pipelined: bool) {
        if pipelined == self.pipelined {
            return;
        }
        self.pipelined = pipelined;
        tracing::info!(pipelined, interval = self.current, "pipelining changed");
    }

    fn change_to(&mut self, to: u32, reason: ChangeReason) -> Option<IntervalChange> {
        if to == self.current {
            return None;
        }
        let change = IntervalChange {
            from: self.current,
            to,
            reason,
        };
        self.current = to;
        tracing::info!(from = change.from, to, ?reason, "swap interval changed");
        Some(change)
    }

    fn reset_counters(&mut self) {
        self.consecutive_slow = 0;
        self.consecutive_fast = 0;
    }
}
