// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time, durations, and clock sources.
//!
//! [`HostTime`] is a point on the monotonic clock in nanoseconds. [`Duration`]
//! is a non-negative span in the same unit and [`Offset`] a signed one, used
//! for compositor phase offsets that platforms may report as negative.
//!
//! The [`Clock`] trait is how the pacing loop reads time and blocks. The
//! production clock is [`MonotonicClock`]; [`ManualClock`] only moves when
//! told to, which makes the whole engine deterministic under test.

use core::fmt;
use core::ops::{Add, Sub};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustix::time::{ClockId, Timespec, clock_gettime};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// A point in time on the monotonic clock, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }

    /// Saturating addition of a duration.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.0))
    }

    /// Saturating subtraction of a duration.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.0))
    }
}

/// Saturates at `u64::MAX`.
impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        self.saturating_add(rhs)
    }
}

/// Saturates at zero.
impl Sub<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Duration) -> Self {
        self.saturating_sub(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A non-negative span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Creates a duration from whole microseconds.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros * 1_000)
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns `true` if this duration is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Saturating multiplication by an integer factor.
    #[inline]
    #[must_use]
    pub const fn saturating_mul(self, rhs: u32) -> Self {
        Self(self.0.saturating_mul(rhs as u64))
    }

    /// Number of whole `period`s contained in `self`, rounded down.
    ///
    /// Returns 0 for a zero `period`.
    #[inline]
    #[must_use]
    pub const fn periods_floor(self, period: Self) -> u64 {
        if period.0 == 0 { 0 } else { self.0 / period.0 }
    }

    /// Number of `period`s needed to cover `self`, rounded up.
    ///
    /// Returns 0 for a zero `period`.
    #[inline]
    #[must_use]
    pub const fn periods_ceil(self, period: Self) -> u64 {
        if period.0 == 0 { 0 } else { self.0.div_ceil(period.0) }
    }

    /// Number of `period`s in `self`, rounded to the nearest whole period.
    ///
    /// Returns 0 for a zero `period`.
    #[inline]
    #[must_use]
    pub const fn periods_nearest(self, period: Self) -> u64 {
        if period.0 == 0 {
            0
        } else {
            self.0.saturating_add(period.0 / 2) / period.0
        }
    }

    /// Converts to a [`std::time::Duration`].
    #[inline]
    #[must_use]
    pub const fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0)
    }
}

/// Saturates at `u64::MAX`.
impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

/// Saturates at zero.
impl Sub for Duration {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// A signed span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset(pub i64);

impl Offset {
    /// A zero offset.
    pub const ZERO: Self = Self(0);

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({})", self.0)
    }
}

/// Source of monotonic time for the pacing loop.
///
/// `sleep_until` is the only place the engine blocks on time. It must return
/// once [`now`](Self::now) is at or past `deadline`.
pub trait Clock: Send {
    /// Returns the current monotonic time.
    fn now(&self) -> HostTime;

    /// Blocks the calling thread until `deadline`.
    fn sleep_until(&self, deadline: HostTime);
}

/// `CLOCK_MONOTONIC` clock that sleeps the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> HostTime {
        now()
    }

    fn sleep_until(&self, deadline: HostTime) {
        loop {
            let remaining = deadline.saturating_duration_since(now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.to_std());
        }
    }
}

/// Returns the current `CLOCK_MONOTONIC` time.
#[must_use]
pub fn now() -> HostTime {
    timespec_to_host_time(clock_gettime(ClockId::Monotonic))
}

fn timespec_to_host_time(timespec: Timespec) -> HostTime {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);

    let nanos_u128 = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    HostTime(u64::try_from(nanos_u128).unwrap_or(u64::MAX))
}

/// A clock that only moves when advanced.
///
/// Clones share the same time. [`sleep_until`](Clock::sleep_until) jumps the
/// clock forward to the deadline instead of blocking, so a simulated render
/// loop runs instantly while still observing realistic timestamps.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: HostTime) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(start.0)),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.nanos.fetch_add(duration.0, Ordering::SeqCst);
    }

    /// Sets the clock to `t` if `t` is later than the current reading.
    pub fn advance_to(&self, t: HostTime) {
        self.nanos.fetch_max(t.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline: HostTime) {
        self.advance_to(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_arithmetic() {
        let a = Duration(100);
        let b = Duration(30);
        assert_eq!((a + b).nanos(), 130);
        assert_eq!((a - b).nanos(), 70);
        assert_eq!(a.saturating_sub(Duration(200)), Duration::ZERO);
        assert_eq!(b - a, Duration::ZERO, "operators saturate instead of panicking");
        assert_eq!(Duration(u64::MAX) + a, Duration(u64::MAX));
        assert_eq!(Duration::from_millis(2), Duration(2_000_000));
    }

    #[test]
    fn period_rounding() {
        let period = Duration(16_600_000);
        assert_eq!(Duration(16_500_000).periods_floor(period), 0);
        assert_eq!(Duration(16_500_000).periods_nearest(period), 1);
        assert_eq!(Duration(33_200_000).periods_floor(period), 2);
        assert_eq!(Duration(8_000_000).periods_nearest(period), 0);
        assert_eq!(Duration(5).periods_floor(Duration::ZERO), 0);
        assert_eq!(Duration(16_600_001).periods_ceil(period), 2);
        assert_eq!(Duration(16_600_000).periods_ceil(period), 1);
        assert_eq!(Duration::ZERO.periods_ceil(period), 0);
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1000);
        let d = Duration(200);
        assert_eq!((t + d).nanos(), 1200);
        assert_eq!((t - d).nanos(), 800);
        assert_eq!(t.saturating_duration_since(HostTime(1500)), Duration::ZERO);
        assert_eq!(t.saturating_duration_since(HostTime(400)), Duration(600));
        assert_eq!(HostTime(u64::MAX).saturating_add(d), HostTime(u64::MAX));
        assert_eq!(HostTime(100) - d, HostTime(0), "saturates at zero");
        assert_eq!(HostTime(u64::MAX) + d, HostTime(u64::MAX));
    }

    #[test]
    fn monotonic_now_is_non_decreasing() {
        let first = now();
        let second = now();
        assert!(second >= first, "monotonic clock should not go backwards");
    }

    #[test]
    fn timespec_conversion_builds_nanoseconds() {
        let input = Timespec {
            tv_sec: 12,
            tv_nsec: 345_678_901,
        };
        assert_eq!(
            timespec_to_host_time(input),
            HostTime(12 * 1_000_000_000 + 345_678_901)
        );
    }

    #[test]
    fn timespec_conversion_saturates_on_large_values() {
        let input = Timespec {
            tv_sec: i64::MAX,
            tv_nsec: 999_999_999,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(u64::MAX));
    }

    #[test]
    fn manual_clock_sleep_jumps_forward() {
        let clock = ManualClock::new(HostTime(1_000));
        let shared = clock.clone();
        clock.sleep_until(HostTime(5_000));
        assert_eq!(shared.now(), HostTime(5_000));

        // Sleeping into the past never rewinds.
        clock.sleep_until(HostTime(2_000));
        assert_eq!(clock.now(), HostTime(5_000));

        shared.advance(Duration(10));
        assert_eq!(clock.now(), HostTime(5_010));
    }
}
