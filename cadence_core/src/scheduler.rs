// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame presentation deadlines and statistics bookkeeping.
//!
//! The [`PresentationScheduler`] walks each frame through
//! `Idle → AwaitingSwap → Presented`:
//!
//! 1. [`record_frame_start`](PresentationScheduler::record_frame_start)
//!    captures when CPU work began.
//! 2. [`plan`](PresentationScheduler::plan) anchors the frame to the display's
//!    vsync grid and computes when it may be released to the swap call and
//!    when it should reach the screen.
//! 3. [`released`](PresentationScheduler::released) records how long the
//!    caller actually blocked.
//! 4. [`complete`](PresentationScheduler::complete) takes the actual
//!    presentation time (if the platform has one) and forwards bucketed
//!    deltas to the [`StatisticsCollector`].
//!
//! The scheduler itself never blocks and never reads a clock; the engine
//! supplies timestamps and does the waiting.

use crate::stats::{StatKind, StatisticsCollector};
use crate::time::{Duration, HostTime};
use crate::timing::TimingModel;

/// Where the current frame is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// No frame in flight.
    Idle,
    /// Planned; waiting for the swap call to finish.
    AwaitingSwap,
    /// Swapped and accounted for.
    Presented,
}

/// What the caller should do with the upcoming swap call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapDirective {
    /// Frame counter.
    pub frame_index: u64,
    /// When the frame is intended to reach the display.
    pub target_present: HostTime,
    /// Value to attach to the swap as a presentation-time hint, or `None` if
    /// the platform does not accept one.
    pub present_hint: Option<HostTime>,
}

/// The schedule computed for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapPlan {
    /// Frame counter.
    pub frame_index: u64,
    /// When CPU work on the frame began.
    pub start: HostTime,
    /// CPU time from frame start to the pre-swap call.
    pub cpu_time: Duration,
    /// The vsync boundary the frame is anchored to.
    pub anchor: HostTime,
    /// Earliest time the frame may be handed to the swap call.
    pub release_at: HostTime,
    /// Intended presentation time.
    pub target_present: HostTime,
    /// Whether the frame overlaps the previous frame's GPU work.
    pub pipelined: bool,
    /// Refresh period the plan was computed against.
    pub refresh_period: Duration,
}

/// Outcome of a completed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentReport {
    /// Frame counter.
    pub frame_index: u64,
    /// Intended presentation time.
    pub target_present: HostTime,
    /// Actual presentation time, if known.
    pub actual_present: Option<HostTime>,
    /// Time the caller blocked before the swap.
    pub waited: Duration,
    /// CPU time of the frame.
    pub cpu_time: Duration,
    /// How far past the target the frame landed, if it was late.
    pub late_by: Option<Duration>,
}

/// Tracks one frame at a time from start to presentation.
#[derive(Clone, Debug)]
pub struct PresentationScheduler {
    phase: FramePhase,
    next_frame_index: u64,
    frame_start: Option<HostTime>,
    current: Option<SwapPlan>,
    waited: Duration,
    prev_actual: Option<HostTime>,
}

impl Default for PresentationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationScheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            next_frame_index: 0,
            frame_start: None,
            current: None,
            waited: Duration::ZERO,
            prev_actual: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Index the next planned frame will get.
    #[must_use]
    pub fn next_frame_index(&self) -> u64 {
        self.next_frame_index
    }

    /// The plan of the frame in flight, if any.
    #[must_use]
    pub fn current_plan(&self) -> Option<&SwapPlan> {
        self.current.as_ref()
    }

    /// Marks the start of CPU work for the next frame.
    ///
    /// Must be called before the frame's work begins to get meaningful
    /// latency numbers. If it is skipped, [`plan`](Self::plan) uses its own
    /// timestamp as the start.
    pub fn record_frame_start(&mut self, now: HostTime) {
        if self.phase == FramePhase::AwaitingSwap {
            tracing::debug!("frame started before the previous one was swapped; dropping it");
        }
        self.frame_start = Some(now);
        self.current = None;
        self.phase = FramePhase::Idle;
    }

    /// Computes the schedule for the frame about to be swapped.
    ///
    /// The frame is anchored to the last vsync boundary at or before its
    /// start, extrapolated from `last_vsync` with the refresh period. With no
    /// vsync known it is anchored to its own start. It is released
    /// `interval` refresh periods after the anchor and targets presentation
    /// at that time, or one interval later if `pipelined`.
    pub fn plan(
        &mut self,
        now: HostTime,
        timing: &TimingModel,
        last_vsync: Option<HostTime>,
        interval: u32,
        pipelined: bool,
    ) -> SwapPlan {
        if self.phase == FramePhase::AwaitingSwap {
            tracing::debug!(
                frame_index = self.next_frame_index.saturating_sub(1),
                "pre-swap called twice without post-swap; replanning"
            );
        }

        let period = timing.refresh_period();
        let start = self.frame_start.take().unwrap_or(now).min(now);
        let anchor = last_vsync.map_or(start, |vsync| vsync_boundary_at_or_before(vsync, start, period));
        let swap_time = period.saturating_mul(interval.max(1));
        let release_at = anchor.saturating_add(swap_time);
        let target_present = if pipelined {
            release_at.saturating_add(swap_time)
        } else {
            release_at
        };

        let plan = SwapPlan {
            frame_index: self.next_frame_index,
            start,
            cpu_time: now.saturating_duration_since(start),
            anchor,
            release_at,
            target_present,
            pipelined,
            refresh_period: period,
        };
        self.next_frame_index += 1;
        self.current = Some(plan);
        self.waited = Duration::ZERO;
        self.phase = FramePhase::AwaitingSwap;
        plan
    }

    /// Pushes the frame in flight back by whole refresh periods if `now` is
    /// already past its release time, so that its release and target stay
    /// on the vsync grid and in the future.
    ///
    /// Returns the number of periods skipped.
    pub fn catch_up(&mut self, now: HostTime) -> u64 {
        let Some(plan) = self.current.as_mut() else {
            return 0;
        };
        if now <= plan.release_at {
            return 0;
        }
        let skipped = now
            .saturating_duration_since(plan.release_at)
            .periods_ceil(plan.refresh_period);
        let shift = Duration(plan.refresh_period.0.saturating_mul(skipped));
        plan.release_at = plan.release_at.saturating_add(shift);
        plan.target_present = plan.target_present.saturating_add(shift);
        skipped
    }

    /// Records how long the caller blocked before handing the frame to the
    /// swap call.
    pub fn released(&mut self, waited: Duration) {
        self.waited = waited;
    }

    /// Finishes the frame in flight and records its statistics.
    ///
    /// Returns `None` (and records nothing) if no frame was planned.
    pub fn complete(
        &mut self,
        actual_present: Option<HostTime>,
        stats: &mut StatisticsCollector,
    ) -> Option<PresentReport> {
        if self.phase != FramePhase::AwaitingSwap {
            tracing::debug!("post-swap without a planned frame; ignored");
            return None;
        }
        let plan = self.current.take()?;
        let period = plan.refresh_period;

        stats.record(StatKind::Idle, self.waited.periods_floor(period));

        let mut late_by = None;
        if let Some(actual) = actual_present {
            if actual > plan.target_present {
                let late = actual.saturating_duration_since(plan.target_present);
                stats.record(StatKind::Late, late.periods_floor(period));
                late_by = Some(late);
            }
            if let Some(prev) = self.prev_actual {
                let offset = actual.saturating_duration_since(prev);
                stats.record(StatKind::OffsetFromPrevious, offset.periods_nearest(period));
            }
            let latency = actual.saturating_duration_since(plan.start);
            stats.record(StatKind::Latency, latency.periods_nearest(period));
        }
        self.prev_actual = actual_present;
        stats.record_frame();
        self.phase = FramePhase::Presented;

        Some(PresentReport {
            frame_index: plan.frame_index,
            target_present: plan.target_present,
            actual_present,
            waited: self.waited,
            cpu_time: plan.cpu_time,
            late_by,
        })
    }
}

/// The latest point on the vsync grid through `vsync` that is at or before
/// `t`.
fn vsync_boundary_at_or_before(vsync: HostTime, t: HostTime, period: Duration) -> HostTime {
    if period.is_zero() {
        return t;
    }
    if vsync <= t {
        let elapsed = t.saturating_duration_since(vsync);
        vsync.saturating_add(Duration(elapsed.periods_floor(period) * period.nanos()))
    } else {
        let ahead = vsync.saturating_duration_since(t).nanos();
        let steps = ahead.div_ceil(period.nanos());
        vsync.saturating_sub(Duration(steps.saturating_mul(period.nanos())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::MAX_FRAME_BUCKETS;

    const PERIOD: Duration = Duration(16_666_667);

    fn timing() -> TimingModel {
        TimingModel::from_period(PERIOD)
    }

    #[test]
    fn vsync_grid_extrapolation() {
        let v = HostTime(100_000_000);
        assert_eq!(vsync_boundary_at_or_before(v, v, PERIOD), v);
        assert_eq!(
            vsync_boundary_at_or_before(v, HostTime(v.0 + 20_000_000), PERIOD),
            HostTime(v.0 + PERIOD.0)
        );
        // A vsync reported after the frame start is walked backwards.
        assert_eq!(
            vsync_boundary_at_or_before(v, HostTime(v.0 - 1), PERIOD),
            HostTime(v.0 - PERIOD.0)
        );
        assert_eq!(
            vsync_boundary_at_or_before(v, HostTime(v.0 - PERIOD.0), PERIOD),
            HostTime(v.0 - PERIOD.0)
        );
    }

    #[test]
    fn plan_without_vsync_anchors_to_start() {
        let mut scheduler = PresentationScheduler::new();
        scheduler.record_frame_start(HostTime(1_000));
        let plan = scheduler.plan(HostTime(11_000), &timing(), None, 1, false);

        assert_eq!(plan.frame_index, 0);
        assert_eq!(plan.anchor, HostTime(1_000));
        assert_eq!(plan.cpu_time, Duration(10_000));
        assert_eq!(plan.release_at, HostTime(1_000 + PERIOD.0));
        assert_eq!(plan.target_present, plan.release_at);
        assert_eq!(scheduler.phase(), FramePhase::AwaitingSwap);
    }

    #[test]
    fn plan_with_interval_and_pipelining() {
        let mut scheduler = PresentationScheduler::new();
        let vsync = HostTime(50_000_000);
        scheduler.record_frame_start(HostTime(vsync.0 + 3_000_000));
        let plan = scheduler.plan(HostTime(vsync.0 + 9_000_000), &timing(), Some(vsync), 2, true);

        assert_eq!(plan.anchor, vsync);
        assert_eq!(plan.release_at, HostTime(vsync.0 + 2 * PERIOD.0));
        assert_eq!(plan.target_present, HostTime(vsync.0 + 4 * PERIOD.0));
        assert!(plan.pipelined);
    }

    #[test]
    fn catch_up_moves_overdue_frame_to_next_vsync() {
        let mut scheduler = PresentationScheduler::new();
        scheduler.record_frame_start(HostTime(0));
        let plan = scheduler.plan(HostTime(2_000_000), &timing(), None, 1, true);

        assert_eq!(scheduler.catch_up(plan.release_at), 0, "on time");
        assert_eq!(scheduler.current_plan(), Some(&plan));

        // 1.5 periods past the release time needs two whole periods.
        let now = HostTime(plan.release_at.0 + PERIOD.0 + PERIOD.0 / 2);
        assert_eq!(scheduler.catch_up(now), 2);
        let moved = *scheduler.current_plan().unwrap();
        assert_eq!(moved.release_at, HostTime(plan.release_at.0 + 2 * PERIOD.0));
        assert_eq!(moved.target_present, HostTime(plan.target_present.0 + 2 * PERIOD.0));
        assert!(moved.release_at >= now);
        assert_eq!(moved.start, plan.start, "frame start is kept for latency");
    }

    #[test]
    fn catch_up_without_plan_does_nothing() {
        let mut scheduler = PresentationScheduler::new();
        assert_eq!(scheduler.catch_up(HostTime(1_000_000_000)), 0);
        assert_eq!(scheduler.current_plan(), None);
    }

    #[test]
    fn missing_frame_start_uses_plan_time() {
        let mut scheduler = PresentationScheduler::new();
        let plan = scheduler.plan(HostTime(5_000), &timing(), None, 1, false);
        assert_eq!(plan.start, HostTime(5_000));
        assert_eq!(plan.cpu_time, Duration::ZERO);
    }

    #[test]
    fn on_time_frames_record_idle_but_not_late() {
        let mut scheduler = PresentationScheduler::new();
        let mut stats = StatisticsCollector::new(true);
        let mut t = HostTime(0);
        for _ in 0..5 {
            scheduler.record_frame_start(t);
            let plan = scheduler.plan(t + Duration::from_millis(10), &timing(), None, 1, false);
            scheduler.released(plan.release_at.saturating_duration_since(t + Duration::from_millis(10)));
            let report = scheduler.complete(Some(plan.target_present), &mut stats).unwrap();
            assert_eq!(report.late_by, None);
            t = plan.release_at;
        }

        let snapshot = stats.stats();
        assert_eq!(snapshot.total_frames, 5);
        assert_eq!(snapshot.idle_frames.unwrap()[0], 5);
        assert_eq!(snapshot.late_frames, Some([0; MAX_FRAME_BUCKETS]));
        // First frame has no predecessor.
        assert_eq!(snapshot.offset_from_previous_frame.unwrap()[1], 4);
        assert_eq!(snapshot.latency_frames.unwrap()[1], 5);
    }

    #[test]
    fn late_frame_is_bucketed_by_whole_periods() {
        let mut scheduler = PresentationScheduler::new();
        let mut stats = StatisticsCollector::new(true);
        scheduler.record_frame_start(HostTime(0));
        let plan = scheduler.plan(HostTime(30_000_000), &timing(), None, 1, false);
        let actual = HostTime(plan.target_present.0 + 2 * PERIOD.0 + 5);
        let report = scheduler.complete(Some(actual), &mut stats).unwrap();

        assert_eq!(report.late_by, Some(Duration(2 * PERIOD.0 + 5)));
        assert_eq!(stats.stats().late_frames.unwrap()[2], 1);
        assert_eq!(scheduler.phase(), FramePhase::Presented);
    }

    #[test]
    fn offset_skipped_after_unknown_presentation() {
        let mut scheduler = PresentationScheduler::new();
        let mut stats = StatisticsCollector::new(true);

        let first = scheduler.plan(HostTime(0), &timing(), None, 1, false);
        let _ = scheduler.complete(Some(first.target_present), &mut stats);
        let _ = scheduler.plan(HostTime(PERIOD.0), &timing(), None, 1, false);
        let _ = scheduler.complete(None, &mut stats);
        let third = scheduler.plan(HostTime(2 * PERIOD.0), &timing(), None, 1, false);
        let _ = scheduler.complete(Some(third.target_present), &mut stats);

        let offsets = stats.stats().offset_from_previous_frame.unwrap();
        assert_eq!(offsets.iter().sum::<u64>(), 0, "no two consecutive known times");
        assert_eq!(stats.stats().total_frames, 3);
    }

    #[test]
    fn complete_without_plan_is_ignored() {
        let mut scheduler = PresentationScheduler::new();
        let mut stats = StatisticsCollector::new(true);
        assert_eq!(scheduler.complete(Some(HostTime(1)), &mut stats), None);
        assert_eq!(stats.stats().total_frames, 0);
    }
}
