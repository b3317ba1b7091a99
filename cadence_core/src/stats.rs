// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame presentation statistics.
//!
//! [`StatisticsCollector`] keeps four fixed-size histograms, each counting
//! frames by a whole number of refresh periods:
//!
//! | Histogram | Bucket value |
//! |---|---|
//! | idle | refresh periods the pacing loop blocked before the swap |
//! | late | refresh periods a frame was presented after its target |
//! | offset | refresh periods between this and the previous presentation |
//! | latency | refresh periods from frame start to presentation |
//!
//! The last bucket is an overflow bucket ("N or more"). Counters only grow
//! until [`StatisticsCollector::clear`] is called.
//!
//! Histograms that depend on actual presentation times are reported as
//! `None` when the platform cannot supply them, so "nothing was late" and
//! "lateness could not be measured" stay distinguishable.

/// Number of buckets in every histogram.
pub const MAX_FRAME_BUCKETS: usize = 6;

/// Which histogram a sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatKind {
    /// Refresh periods spent waiting before the swap.
    Idle,
    /// Refresh periods past the target presentation time.
    Late,
    /// Refresh periods since the previous frame's presentation.
    OffsetFromPrevious,
    /// Refresh periods from frame start to presentation.
    Latency,
}

impl StatKind {
    const ALL: [Self; 4] = [
        Self::Idle,
        Self::Late,
        Self::OffsetFromPrevious,
        Self::Latency,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Late => 1,
            Self::OffsetFromPrevious => 2,
            Self::Latency => 3,
        }
    }

    /// Whether this histogram needs actual presentation times.
    #[must_use]
    pub const fn needs_present_time(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// A histogram of frame counts by refresh-period bucket.
pub type Histogram = [u64; MAX_FRAME_BUCKETS];

/// Immutable copy of the collected statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames that went through a full pre-swap/post-swap cycle.
    pub total_frames: u64,
    /// Frames by refresh periods waited before the swap.
    pub idle_frames: Option<Histogram>,
    /// Late frames by refresh periods past their target.
    pub late_frames: Option<Histogram>,
    /// Frames by refresh periods since the previous presentation.
    pub offset_from_previous_frame: Option<Histogram>,
    /// Frames by refresh periods from start to presentation.
    pub latency_frames: Option<Histogram>,
}

/// Accumulates [`FrameStats`] on the pacing thread.
#[derive(Clone, Debug)]
pub struct StatisticsCollector {
    histograms: [Histogram; 4],
    supported: [bool; 4],
    total_frames: u64,
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StatisticsCollector {
    /// Creates an empty collector.
    ///
    /// With `present_time_supported == false` the late, offset and latency
    /// histograms are reported as `None` and their samples are ignored.
    #[must_use]
    pub fn new(present_time_supported: bool) -> Self {
        let mut supported = [true; 4];
        for kind in StatKind::ALL {
            supported[kind.index()] = present_time_supported || !kind.needs_present_time();
        }
        Self {
            histograms: [[0; MAX_FRAME_BUCKETS]; 4],
            supported,
            total_frames: 0,
        }
    }

    /// Counts one frame in the bucket for `refresh_periods`.
    ///
    /// Values at or past the last bucket saturate into it.
    pub fn record(&mut self, kind: StatKind, refresh_periods: u64) {
        if !self.supported[kind.index()] {
            return;
        }
        let bucket = usize::try_from(refresh_periods)
            .unwrap_or(usize::MAX)
            .min(MAX_FRAME_BUCKETS - 1);
        let counter = &mut self.histograms[kind.index()][bucket];
        *counter = counter.saturating_add(1);
    }

    /// Counts one completed frame.
    pub fn record_frame(&mut self) {
        self.total_frames = self.total_frames.saturating_add(1);
    }

    /// Whether samples of `kind` are being collected.
    #[must_use]
    pub fn is_supported(&self, kind: StatKind) -> bool {
        self.supported[kind.index()]
    }

    /// Returns a copy of everything collected so far.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        let get = |kind: StatKind| {
            self.supported[kind.index()].then_some(self.histograms[kind.index()])
        };
        FrameStats {
            total_frames: self.total_frames,
            idle_frames: get(StatKind::Idle),
            late_frames: get(StatKind::Late),
            offset_from_previous_frame: get(StatKind::OffsetFromPrevious),
            latency_frames: get(StatKind::Latency),
        }
    }

    /// Zeroes every histogram and `total_frames`.
    pub fn clear(&mut self) {
        self.histograms = [[0; MAX_FRAME_BUCKETS]; 4];
        self.total_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lands_in_exact_bucket() {
        let mut stats = StatisticsCollector::new(true);
        stats.record(StatKind::Idle, 0);
        stats.record(StatKind::Idle, 2);
        stats.record(StatKind::Latency, 3);

        let snapshot = stats.stats();
        assert_eq!(snapshot.idle_frames, Some([1, 0, 1, 0, 0, 0]));
        assert_eq!(snapshot.latency_frames, Some([0, 0, 0, 1, 0, 0]));
        assert_eq!(snapshot.late_frames, Some([0; MAX_FRAME_BUCKETS]));
    }

    #[test]
    fn overflow_saturates_into_last_bucket() {
        let mut stats = StatisticsCollector::new(true);
        let mut expected_overflow = 0;
        for delta in (0..=1_000_000_u64).step_by(997).chain([
            5,
            6,
            7,
            1_000_000,
            u64::MAX,
        ]) {
            stats.record(StatKind::OffsetFromPrevious, delta);
            if delta >= MAX_FRAME_BUCKETS as u64 - 1 {
                expected_overflow += 1;
            }
        }
        let offset = stats.stats().offset_from_previous_frame.unwrap();
        assert_eq!(offset[MAX_FRAME_BUCKETS - 1], expected_overflow);
        assert_eq!(offset[0], 1, "only delta 0 lands in the first bucket");
    }

    #[test]
    fn unsupported_present_time_reports_no_data() {
        let mut stats = StatisticsCollector::new(false);
        stats.record(StatKind::Idle, 1);
        stats.record(StatKind::Late, 1);
        stats.record_frame();

        let snapshot = stats.stats();
        assert_eq!(snapshot.total_frames, 1);
        assert_eq!(snapshot.idle_frames, Some([0, 1, 0, 0, 0, 0]));
        assert_eq!(snapshot.late_frames, None);
        assert_eq!(snapshot.offset_from_previous_frame, None);
        assert_eq!(snapshot.latency_frames, None);
        assert!(!stats.is_supported(StatKind::Latency));
    }

    #[test]
    fn clear_resets_counters_and_total() {
        let mut stats = StatisticsCollector::default();
        stats.record(StatKind::Late, 4);
        stats.record_frame();
        stats.clear();

        let snapshot = stats.stats();
        assert_eq!(snapshot.total_frames, 0);
        assert_eq!(snapshot.late_frames, Some([0; MAX_FRAME_BUCKETS]));
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut stats = StatisticsCollector::default();
        let before = stats.stats();
        stats.record(StatKind::Idle, 0);
        assert_eq!(before.idle_frames, Some([0; MAX_FRAME_BUCKETS]));
    }
}
