// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-thread delivery of platform timing to the pacing thread.
//!
//! Platform callbacks (compositor timing, vsync, display-mode enumeration)
//! arrive on threads the pacing loop does not own. [`TimingBridge`] is the
//! mailbox between them: one mutex guarding the latest published values and
//! two condition variables, one per kind of waiter.
//!
//! - Timing and vsync are **latest-wins**. An unconsumed timing model is
//!   overwritten by the next publication; the pacing thread picks up the
//!   newest one by version.
//! - The refresh-rate set is a **published fact**. The first publication
//!   releases every waiter, and every later
//!   [`await_supported_refresh_rates`](TimingBridge::await_supported_refresh_rates)
//!   returns the same shared set without blocking.
//!
//! Published values are immutable once stored, so readers copy (or clone an
//! `Arc`) under the lock and use the data after releasing it.
//!
//! [`shutdown`](TimingBridge::shutdown) wakes every waiter. The engine calls
//! it when dropped, so a thread blocked in the bridge never outlives it
//! silently.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::PacingError;
use crate::time::HostTime;
use crate::timing::{RefreshRates, TimingModel};

/// A timing model together with its publication sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingUpdate {
    /// The published model.
    pub model: TimingModel,
    /// Increases by one with every accepted publication, starting at 1.
    pub version: u64,
}

#[derive(Debug, Default)]
struct Mailbox {
    timing: Option<TimingUpdate>,
    vsync: Option<HostTime>,
    refresh_rates: Option<Arc<RefreshRates>>,
    shutting_down: bool,
}

/// Mailbox between platform callback threads and the pacing thread.
///
/// Shared as `Arc<TimingBridge>`; every method takes `&self` and may be
/// called from any thread.
#[derive(Debug, Default)]
pub struct TimingBridge {
    mailbox: Mutex<Mailbox>,
    timing_changed: Condvar,
    rates_published: Condvar,
}

impl TimingBridge {
    /// Creates an empty bridge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes new display timing.
    ///
    /// # Errors
    ///
    /// Returns [`PacingError::InvalidTiming`] for a non-positive period; the
    /// previously published model stays in place.
    pub fn publish_timing_changed(
        &self,
        refresh_period_ns: i64,
        app_offset_ns: i64,
        sf_offset_ns: i64,
    ) -> Result<(), PacingError> {
        let model = match TimingModel::new(refresh_period_ns, app_offset_ns, sf_offset_ns) {
            Ok(model) => model,
            Err(err) => {
                tracing::warn!(refresh_period_ns, "ignoring timing update: {err}");
                return Err(err);
            }
        };
        let mut mailbox = self.mailbox.lock();
        let version = mailbox.timing.map_or(1, |t| t.version + 1);
        mailbox.timing = Some(TimingUpdate { model, version });
        drop(mailbox);
        tracing::debug!(
            refresh_period_ns,
            app_offset_ns,
            sf_offset_ns,
            version,
            "timing published"
        );
        self.timing_changed.notify_one();
        Ok(())
    }

    /// Publishes the timestamp of a vsync.
    ///
    /// Timestamps older than the stored one are ignored.
    pub fn publish_vsync(&self, timestamp: HostTime) {
        let mut mailbox = self.mailbox.lock();
        if mailbox.vsync.is_none_or(|prev| timestamp > prev) {
            mailbox.vsync = Some(timestamp);
        }
    }

    /// Publishes the display's supported refresh rates and wakes every
    /// waiter.
    ///
    /// A later publication replaces the set; callers that already hold the
    /// previous `Arc` keep seeing the old one.
    pub fn publish_supported_refresh_rates(&self, rates: RefreshRates) {
        let count = rates.len();
        let mut mailbox = self.mailbox.lock();
        mailbox.refresh_rates = Some(Arc::new(rates));
        drop(mailbox);
        tracing::debug!(count, "supported refresh rates published");
        self.rates_published.notify_all();
    }

    /// Blocks until the supported refresh rates have been published.
    ///
    /// Returns immediately once they have. There is no built-in timeout: if
    /// the platform never publishes, this blocks until [`shutdown`].
    /// Callers that cannot afford that run it on a helper thread and give up
    /// after their own deadline.
    ///
    /// # Errors
    ///
    /// Returns [`PacingError::ShutdownWhileBlocked`] if the bridge shuts down
    /// before anything was published.
    ///
    /// [`shutdown`]: Self::shutdown
    pub fn await_supported_refresh_rates(&self) -> Result<Arc<RefreshRates>, PacingError> {
        let mut mailbox = self.mailbox.lock();
        loop {
            if let Some(rates) = &mailbox.refresh_rates {
                return Ok(Arc::clone(rates));
            }
            if mailbox.shutting_down {
                return Err(PacingError::ShutdownWhileBlocked);
            }
            self.rates_published.wait(&mut mailbox);
        }
    }

    /// The supported refresh rates, if already published.
    #[must_use]
    pub fn try_supported_refresh_rates(&self) -> Option<Arc<RefreshRates>> {
        self.mailbox.lock().refresh_rates.clone()
    }

    /// Blocks until a timing model newer than `seen_version` is published.
    ///
    /// # Errors
    ///
    /// Returns [`PacingError::ShutdownWhileBlocked`] if the bridge shuts down
    /// first.
    pub fn await_timing_after(&self, seen_version: u64) -> Result<TimingUpdate, PacingError> {
        let mut mailbox = self.mailbox.lock();
        loop {
            if let Some(update) = mailbox.timing.filter(|t| t.version > seen_version) {
                return Ok(update);
            }
            if mailbox.shutting_down {
                return Err(PacingError::ShutdownWhileBlocked);
            }
            self.timing_changed.wait(&mut mailbox);
        }
    }

    /// The latest timing model if it is newer than `seen_version`.
    #[must_use]
    pub fn take_timing(&self, seen_version: u64) -> Option<TimingUpdate> {
        self.mailbox
            .lock()
            .timing
            .filter(|t| t.version > seen_version)
    }

    /// The latest published timing model, if any.
    #[must_use]
    pub fn latest_timing(&self) -> Option<TimingModel> {
        self.mailbox.lock().timing.map(|t| t.model)
    }

    /// The latest published vsync timestamp, if any.
    #[must_use]
    pub fn latest_vsync(&self) -> Option<HostTime> {
        self.mailbox.lock().vsync
    }

    /// Wakes every blocked waiter and makes future waits return
    /// [`PacingError::ShutdownWhileBlocked`] instead of blocking.
    ///
    /// Values already published stay readable.
    pub fn shutdown(&self) {
        let mut mailbox = self.mailbox.lock();
        if mailbox.shutting_down {
            return;
        }
        mailbox.shutting_down = true;
        drop(mailbox);
        tracing::debug!("timing bridge shutting down");
        self.rates_published.notify_all();
        self.timing_changed.notify_all();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.mailbox.lock().shutting_down
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration as StdDuration;

    use super::*;
    use crate::time::Duration;
    use crate::timing::RefreshRateCandidate;

    fn sample_rates() -> RefreshRates {
        [
            RefreshRateCandidate {
                period: Duration(16_666_667),
                display_mode_id: 1,
            },
            RefreshRateCandidate {
                period: Duration(8_333_333),
                display_mode_id: 2,
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn rejected_timing_keeps_previous_model() {
        let bridge = TimingBridge::new();
        bridge
            .publish_timing_changed(16_666_667, 1_000, -500)
            .unwrap();
        let before = bridge.latest_timing();

        for period in [0, -1, i64::MIN] {
            assert_eq!(
                bridge.publish_timing_changed(period, 0, 0),
                Err(PacingError::InvalidTiming {
                    refresh_period_ns: period
                })
            );
            assert_eq!(bridge.latest_timing(), before);
        }
        assert_eq!(bridge.take_timing(0).map(|t| t.version), Some(1));
    }

    #[test]
    fn latest_timing_wins() {
        let bridge = TimingBridge::new();
        bridge.publish_timing_changed(16_666_667, 0, 0).unwrap();
        bridge.publish_timing_changed(11_111_111, 0, 0).unwrap();
        bridge.publish_timing_changed(8_333_333, 0, 0).unwrap();

        let update = bridge.take_timing(0).unwrap();
        assert_eq!(update.version, 3);
        assert_eq!(update.model.refresh_period(), Duration(8_333_333));
        assert_eq!(bridge.take_timing(3), None, "nothing newer than v3");
    }

    #[test]
    fn timing_published_from_another_thread_is_whole() {
        let bridge = Arc::new(TimingBridge::new());
        let publisher = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for i in 1..=1_000_i64 {
                    bridge.publish_timing_changed(i, i, i).unwrap();
                }
            })
        };
        let mut seen = 0;
        while seen < 1_000 {
            let update = bridge.await_timing_after(seen).unwrap();
            let model = update.model;
            let period = i64::try_from(model.refresh_period().nanos()).unwrap();
            assert_eq!(model.app_offset().nanos(), period);
            assert_eq!(model.sf_offset().nanos(), period);
            assert!(update.version > seen);
            seen = update.version;
        }
        publisher.join().unwrap();
    }

    #[test]
    fn older_vsync_is_ignored() {
        let bridge = TimingBridge::new();
        assert_eq!(bridge.latest_vsync(), None);
        bridge.publish_vsync(HostTime(2_000));
        bridge.publish_vsync(HostTime(1_000));
        assert_eq!(bridge.latest_vsync(), Some(HostTime(2_000)));
        bridge.publish_vsync(HostTime(3_000));
        assert_eq!(bridge.latest_vsync(), Some(HostTime(3_000)));
    }

    #[test]
    fn published_rates_are_returned_repeatedly() {
        let bridge = TimingBridge::new();
        assert!(bridge.try_supported_refresh_rates().is_none());
        bridge.publish_supported_refresh_rates(sample_rates());

        let first = bridge.await_supported_refresh_rates().unwrap();
        for _ in 0..10 {
            let again = bridge.await_supported_refresh_rates().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn waiters_are_released_by_publication() {
        let bridge = Arc::new(TimingBridge::new());
        let (tx, rx) = mpsc::channel();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let bridge = Arc::clone(&bridge);
                let tx = tx.clone();
                thread::spawn(move || {
                    let rates = bridge.await_supported_refresh_rates();
                    tx.send(rates.map(|r| r.len())).unwrap();
                })
            })
            .collect();

        bridge.publish_supported_refresh_rates(sample_rates());
        for _ in 0..3 {
            let got = rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
            assert_eq!(got, Ok(2));
        }
        for waiter in waiters {
            waiter.join().unwrap();
        }
    }

    #[test]
    fn unpublished_rates_time_out_externally_then_release_on_shutdown() {
        let bridge = Arc::new(TimingBridge::new());
        let (tx, rx) = mpsc::channel();
        let waiter = {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                tx.send(bridge.await_supported_refresh_rates()).unwrap();
            })
        };

        assert_eq!(
            rx.recv_timeout(StdDuration::from_millis(50)),
            Err(mpsc::RecvTimeoutError::Timeout),
            "nothing published; caller gives up and treats rates as unknown"
        );

        bridge.shutdown();
        let released = rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
        assert_eq!(released, Err(PacingError::ShutdownWhileBlocked));
        waiter.join().unwrap();

        assert!(bridge.is_shut_down());
        assert_eq!(
            bridge.await_supported_refresh_rates(),
            Err(PacingError::ShutdownWhileBlocked),
            "waits after shutdown return immediately"
        );
    }

    #[test]
    fn rates_stay_readable_after_shutdown() {
        let bridge = TimingBridge::new();
        bridge.publish_supported_refresh_rates(sample_rates());
        bridge.shutdown();
        assert_eq!(bridge.await_supported_refresh_rates().unwrap().len(), 2);
    }
}
