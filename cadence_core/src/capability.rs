// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional platform capabilities, resolved once at engine construction.
//!
//! Each capability is a small trait the platform glue implements. A platform
//! that lacks one passes [`Unsupported`] instead, which answers every query
//! with "no data" and never blocks. The engine asks each capability whether
//! it [`is_supported`](PresentTimestamps::is_supported) exactly once and
//! routes every frame through the trait object afterwards, so the per-frame
//! path has no platform branches.
//!
//! | Capability | Missing means |
//! |---|---|
//! | [`PresentTimestamps`] | late, offset and latency statistics report no data |
//! | [`GpuFence`] | pipelining is disabled; GPU time is not counted |
//! | [`DisplayModes`] | no refresh-rate switching |
//! | present hint | [`SwapDirective::present_hint`] is always `None` |
//!
//! [`SwapDirective::present_hint`]: crate::scheduler::SwapDirective::present_hint

use crate::error::Feature;
use crate::time::{Duration, HostTime};

/// Reports when a submitted frame actually reached the display.
pub trait PresentTimestamps: Send {
    /// Whether this implementation can return data at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Actual presentation time of frame `frame_index`, if known yet.
    fn actual_present(&mut self, frame_index: u64) -> Option<HostTime>;
}

/// Queries GPU completion of previously submitted frames.
pub trait GpuFence: Send {
    /// Whether this implementation is backed by a real fence.
    fn is_supported(&self) -> bool {
        true
    }

    /// Returns `true` if the GPU has finished the previous frame.
    fn is_complete(&mut self) -> bool;

    /// Blocks until the previous frame completes or `timeout` elapses.
    ///
    /// Returns `true` if the fence signalled.
    fn wait(&mut self, timeout: Duration) -> bool;

    /// Places a fence behind the frame that was just submitted.
    fn insert(&mut self) {}

    /// GPU execution time of the previous frame, if measurable.
    fn previous_frame_gpu_time(&mut self) -> Option<Duration> {
        None
    }
}

/// Switches the display between supported refresh rates.
///
/// The set of modes itself arrives asynchronously through
/// [`TimingBridge::publish_supported_refresh_rates`].
///
/// [`TimingBridge::publish_supported_refresh_rates`]: crate::bridge::TimingBridge::publish_supported_refresh_rates
pub trait DisplayModes: Send {
    /// Whether the platform can enumerate and switch modes.
    fn is_supported(&self) -> bool {
        true
    }

    /// Asks the platform to switch to `display_mode_id`.
    fn request_mode(&mut self, display_mode_id: i32);
}

/// The no-op stand-in for every missing capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl PresentTimestamps for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn actual_present(&mut self, _frame_index: u64) -> Option<HostTime> {
        None
    }
}

impl GpuFence for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_complete(&mut self) -> bool {
        true
    }

    fn wait(&mut self, _timeout: Duration) -> bool {
        true
    }
}

impl DisplayModes for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn request_mode(&mut self, _display_mode_id: i32) {}
}

/// The full set of platform capabilities handed to the engine.
///
/// Starts with everything [`Unsupported`]; the platform glue fills in what
/// it has.
///
/// ```rust,ignore
/// let capabilities = Capabilities::unsupported()
///     .with_present_timestamps(EglTimestamps::new(display, surface))
///     .with_gpu_fence(EglSyncFence::new(display))
///     .with_present_hint(true);
/// ```
pub struct Capabilities {
    pub(crate) present_timestamps: Box<dyn PresentTimestamps>,
    pub(crate) gpu_fence: Box<dyn GpuFence>,
    pub(crate) display_modes: Box<dyn DisplayModes>,
    pub(crate) present_hint: bool,
}

impl core::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Capabilities")
            .field("present_timestamps", &self.present_timestamps.is_supported())
            .field("gpu_fence", &self.gpu_fence.is_supported())
            .field("display_modes", &self.display_modes.is_supported())
            .field("present_hint", &self.present_hint)
            .finish()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::unsupported()
    }
}

impl Capabilities {
    /// A platform with no optional capabilities.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            present_timestamps: Box::new(Unsupported),
            gpu_fence: Box::new(Unsupported),
            display_modes: Box::new(Unsupported),
            present_hint: false,
        }
    }

    /// Uses `timestamps` to query actual presentation times.
    #[must_use]
    pub fn with_present_timestamps(mut self, timestamps: impl PresentTimestamps + 'static) -> Self {
        self.present_timestamps = Box::new(timestamps);
        self
    }

    /// Uses `fence` for GPU completion queries.
    #[must_use]
    pub fn with_gpu_fence(mut self, fence: impl GpuFence + 'static) -> Self {
        self.gpu_fence = Box::new(fence);
        self
    }

    /// Uses `modes` to switch refresh rates.
    #[must_use]
    pub fn with_display_modes(mut self, modes: impl DisplayModes + 'static) -> Self {
        self.display_modes = Box::new(modes);
        self
    }

    /// Declares whether the swap call accepts a presentation-time hint.
    #[must_use]
    pub fn with_present_hint(mut self, supported: bool) -> Self {
        self.present_hint = supported;
        self
    }

    /// Features that will run degraded with these capabilities.
    #[must_use]
    pub fn degraded_features(&self) -> Vec<Feature> {
        let mut features = Vec::new();
        if !self.present_timestamps.is_supported() {
            features.push(Feature::PresentationTime);
        }
        if !self.present_hint {
            features.push(Feature::PresentationTimeHint);
        }
        if !self.gpu_fence.is_supported() {
            features.push(Feature::GpuFence);
        }
        if !self.display_modes.is_supported() {
            features.push(Feature::RefreshRateEnumeration);
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTimestamps(HostTime);

    impl PresentTimestamps for FixedTimestamps {
        fn actual_present(&mut self, _frame_index: u64) -> Option<HostTime> {
            Some(self.0)
        }
    }

    #[test]
    fn unsupported_reports_every_feature() {
        let capabilities = Capabilities::unsupported();
        assert_eq!(
            capabilities.degraded_features(),
            [
                Feature::PresentationTime,
                Feature::PresentationTimeHint,
                Feature::GpuFence,
                Feature::RefreshRateEnumeration,
            ]
        );
    }

    #[test]
    fn supplied_capabilities_are_not_degraded() {
        let mut capabilities = Capabilities::unsupported()
            .with_present_timestamps(FixedTimestamps(HostTime(42)))
            .with_present_hint(true);
        assert_eq!(
            capabilities.degraded_features(),
            [Feature::GpuFence, Feature::RefreshRateEnumeration]
        );
        assert_eq!(
            capabilities.present_timestamps.actual_present(0),
            Some(HostTime(42))
        );
    }

    #[test]
    fn unsupported_fence_never_blocks() {
        let mut fence = Unsupported;
        assert!(fence.is_complete());
        assert!(fence.wait(Duration::from_millis(50)));
        assert_eq!(fence.previous_frame_gpu_time(), None);
    }
}
