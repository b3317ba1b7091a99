// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display timing snapshots and refresh-rate candidates.
//!
//! - [`TimingModel`]: refresh period plus compositor phase offsets, as last
//!   reported by the platform. Immutable; a new report replaces it wholesale.
//! - [`RefreshRateCandidate`] / [`RefreshRates`]: the display modes the
//!   platform can switch between, keyed by refresh period.
//! - [`calculate_swap_interval`]: how many refresh periods a frame time
//!   occupies.

use std::collections::BTreeMap;

use crate::error::PacingError;
use crate::time::{Duration, Offset};

/// Remainder below which a frame time is treated as an exact multiple of the
/// refresh period.
pub const REFRESH_RATE_MARGIN: Duration = Duration(500);

/// Candidates whose swap time reaches this bound are never preferred.
const MAX_PREFERRED_SWAP_TIME: Duration = Duration::from_millis(100);

/// A validated snapshot of display refresh timing.
///
/// Platforms report timing from a compositor callback thread; the pacing
/// loop only ever sees whole snapshots, never a mix of old and new fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimingModel {
    refresh_period: Duration,
    app_offset: Offset,
    sf_offset: Offset,
}

impl TimingModel {
    /// Validates a platform timing report.
    ///
    /// Offsets may be negative or zero. Any positive period is accepted, even
    /// an implausible one, since it is what the platform reported.
    ///
    /// # Errors
    ///
    /// Returns [`PacingError::InvalidTiming`] if `refresh_period_ns <= 0`.
    pub fn new(
        refresh_period_ns: i64,
        app_offset_ns: i64,
        sf_offset_ns: i64,
    ) -> Result<Self, PacingError> {
        match u64::try_from(refresh_period_ns) {
            Ok(period) if period > 0 => Ok(Self {
                refresh_period: Duration(period),
                app_offset: Offset(app_offset_ns),
                sf_offset: Offset(sf_offset_ns),
            }),
            _ => Err(PacingError::InvalidTiming { refresh_period_ns }),
        }
    }

    /// A model with zero offsets, used before the platform has reported.
    ///
    /// A zero `refresh_period` is bumped to 1 ns so the model stays valid.
    #[must_use]
    pub const fn from_period(refresh_period: Duration) -> Self {
        let refresh_period = if refresh_period.0 == 0 {
            Duration(1)
        } else {
            refresh_period
        };
        Self {
            refresh_period,
            app_offset: Offset::ZERO,
            sf_offset: Offset::ZERO,
        }
    }

    /// Time between two consecutive vsyncs.
    #[must_use]
    pub const fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    /// Phase offset of the application vsync.
    #[must_use]
    pub const fn app_offset(&self) -> Offset {
        self.app_offset
    }

    /// Phase offset of the compositor vsync.
    #[must_use]
    pub const fn sf_offset(&self) -> Offset {
        self.sf_offset
    }

    /// Refresh rate in hertz.
    #[must_use]
    pub fn refresh_rate_hz(&self) -> f64 {
        1e9 / self.refresh_period.0 as f64
    }
}

/// A display mode the platform can switch to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RefreshRateCandidate {
    /// Refresh period of this mode.
    pub period: Duration,
    /// Platform identifier used to request this mode.
    pub display_mode_id: i32,
}

/// The set of supported refresh rates, keyed by period (shortest first).
///
/// Published once by the platform's display-mode enumeration and shared
/// read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshRates {
    by_period: BTreeMap<Duration, i32>,
}

impl RefreshRates {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from the parallel arrays a platform enumeration returns.
    ///
    /// Entries with a non-positive period are skipped. Extra entries in the
    /// longer array are ignored.
    #[must_use]
    pub fn from_platform(periods_ns: &[i64], mode_ids: &[i32]) -> Self {
        periods_ns
            .iter()
            .zip(mode_ids)
            .filter_map(|(&period, &display_mode_id)| {
                let period = u64::try_from(period).ok().filter(|p| *p > 0)?;
                Some(RefreshRateCandidate {
                    period: Duration(period),
                    display_mode_id,
                })
            })
            .collect()
    }

    /// Adds a candidate, replacing any existing mode with the same period.
    pub fn insert(&mut self, candidate: RefreshRateCandidate) {
        self.by_period
            .insert(candidate.period, candidate.display_mode_id);
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_period.len()
    }

    /// Returns `true` if no candidates are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }

    /// Mode id for an exact period, if present.
    #[must_use]
    pub fn mode_for_period(&self, period: Duration) -> Option<i32> {
        self.by_period.get(&period).copied()
    }

    /// Iterates candidates from shortest to longest period.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = RefreshRateCandidate> + '_ {
        self.by_period
            .iter()
            .map(|(&period, &display_mode_id)| RefreshRateCandidate {
                period,
                display_mode_id,
            })
    }

    /// Picks the mode that presents a frame of `frame_time` soonest.
    ///
    /// For each candidate the swap time is `period × swap interval`. The
    /// smallest swap time wins; on a tie the longer period (lower refresh
    /// rate) is kept. Swap times of 100 ms or more never win.
    #[must_use]
    pub fn preferred_for(&self, frame_time: Duration) -> Option<RefreshRateCandidate> {
        let mut best: Option<(Duration, RefreshRateCandidate)> = None;
        for candidate in self.iter().rev() {
            let interval = calculate_swap_interval(frame_time, candidate.period);
            let swap_time = candidate.period.saturating_mul(interval);
            if swap_time >= MAX_PREFERRED_SWAP_TIME {
                continue;
            }
            match best {
                Some((best_time, _)) if swap_time >= best_time => {}
                _ => best = Some((swap_time, candidate)),
            }
        }
        best.map(|(_, candidate)| candidate)
    }
}

impl FromIterator<RefreshRateCandidate> for RefreshRates {
    fn from_iter<I: IntoIterator<Item = RefreshRateCandidate>>(iter: I) -> Self {
        let mut rates = Self::new();
        for candidate in iter {
            rates.insert(candidate);
        }
        rates
    }
}

/// Number of refresh periods a frame of `frame_time` occupies.
///
/// Always at least 1. A remainder of up to [`REFRESH_RATE_MARGIN`] is
/// treated as timing noise rather than an extra period.
#[must_use]
pub fn calculate_swap_interval(frame_time: Duration, refresh_period: Duration) -> u32 {
    if refresh_period.is_zero() || frame_time < refresh_period {
        return 1;
    }
    let whole = frame_time.0 / refresh_period.0;
    let remainder = frame_time.0 % refresh_period.0;
    let interval = whole + u64::from(remainder > REFRESH_RATE_MARGIN.0);
    u32::try_from(interval).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P60: Duration = Duration(16_666_666);
    const P90: Duration = Duration(11_111_111);
    const P120: Duration = Duration(8_333_333);

    #[test]
    fn rejects_non_positive_period() {
        assert_eq!(
            TimingModel::new(0, 0, 0),
            Err(PacingError::InvalidTiming {
                refresh_period_ns: 0
            })
        );
        assert_eq!(
            TimingModel::new(-16_000_000, 1, 2),
            Err(PacingError::InvalidTiming {
                refresh_period_ns: -16_000_000
            })
        );
    }

    #[test]
    fn accepts_negative_offsets() {
        let model = TimingModel::new(16_666_667, -2_000_000, 0).unwrap();
        assert_eq!(model.refresh_period(), Duration(16_666_667));
        assert_eq!(model.app_offset(), Offset(-2_000_000));
        assert_eq!(model.sf_offset(), Offset::ZERO);
        assert!((model.refresh_rate_hz() - 60.0).abs() < 0.01, "60 Hz");
    }

    #[test]
    fn accepts_implausible_but_positive_period() {
        let model = TimingModel::new(1, 0, 0).unwrap();
        assert_eq!(model.refresh_period(), Duration(1));
    }

    #[test]
    fn fallback_model_is_never_zero() {
        assert_eq!(
            TimingModel::from_period(Duration::ZERO).refresh_period(),
            Duration(1)
        );
        assert_eq!(TimingModel::from_period(P60).refresh_period(), P60);
    }

    #[test]
    fn swap_interval_arithmetic() {
        assert_eq!(calculate_swap_interval(Duration(5_000_000), P60), 1);
        assert_eq!(calculate_swap_interval(P60, P60), 1);
        // Within the margin of an exact multiple.
        assert_eq!(calculate_swap_interval(Duration(33_333_634), P60), 2);
        // Just beyond the margin.
        assert_eq!(calculate_swap_interval(Duration(33_334_334), P60), 3);
        assert_eq!(calculate_swap_interval(Duration(25_000_000), P60), 2);
        assert_eq!(calculate_swap_interval(P60, Duration::ZERO), 1);
    }

    #[test]
    fn platform_arrays_skip_bad_entries() {
        let rates = RefreshRates::from_platform(&[16_666_666, 0, -5, 8_333_333], &[1, 2, 3, 4]);
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.mode_for_period(P60), Some(1));
        assert_eq!(rates.mode_for_period(P120), Some(4));

        let periods: Vec<_> = rates.iter().map(|c| c.period).collect();
        assert_eq!(periods, [P120, P60], "ordered shortest first");
    }

    #[test]
    fn preferred_mode_minimises_swap_time() {
        let rates: RefreshRates = [
            RefreshRateCandidate {
                period: P60,
                display_mode_id: 60,
            },
            RefreshRateCandidate {
                period: P90,
                display_mode_id: 90,
            },
            RefreshRateCandidate {
                period: P120,
                display_mode_id: 120,
            },
        ]
        .into_iter()
        .collect();

        // 10 ms: 120 Hz needs 2 × 8.3 = 16.7, 90 Hz needs 11.1, 60 Hz 16.7.
        let best = rates.preferred_for(Duration::from_millis(10)).unwrap();
        assert_eq!(best.display_mode_id, 90);

        // 20 ms: 60 Hz needs 33.3 ms, 120 Hz 25 ms, 90 Hz 22.2 ms.
        let best = rates.preferred_for(Duration::from_millis(20)).unwrap();
        assert_eq!(best.display_mode_id, 90);

        // 16 ms: 60 Hz and 120 Hz tie at one 60 Hz period; the lower rate wins.
        let best = rates.preferred_for(Duration::from_millis(16)).unwrap();
        assert_eq!(best.display_mode_id, 60);
    }

    #[test]
    fn preferred_mode_ignores_very_slow_frames() {
        let rates: RefreshRates = [RefreshRateCandidate {
            period: P60,
            display_mode_id: 60,
        }]
        .into_iter()
        .collect();
        assert_eq!(rates.preferred_for(Duration::from_millis(120)), None);
        assert_eq!(RefreshRates::new().preferred_for(P60), None);
    }
}
