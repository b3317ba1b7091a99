// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use crate::interval::IntervalConfig;
use crate::time::Duration;

/// Refresh period assumed until the platform reports one (60 Hz).
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration(16_666_667);

/// Configuration for the [`PacingEngine`](crate::engine::PacingEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    /// Refresh period used until the first timing publication.
    pub default_refresh_period: Duration,
    /// Swap-interval hysteresis settings.
    pub interval: IntervalConfig,
    /// Upper bound on the pipelining fence wait.
    pub fence_timeout: Duration,
    /// Frame-duration samples (CPU and GPU separately) are clamped to this.
    pub max_frame_duration: Duration,
    /// Whether the swap interval starts in auto mode.
    pub auto_swap_interval: bool,
    /// Whether auto pipeline mode starts enabled. It only takes effect with a
    /// GPU fence, and pipelines frames only while they need the overlap.
    pub auto_pipelining: bool,
}

impl PacingConfig {
    /// Balanced defaults for interactive rendering.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            default_refresh_period: DEFAULT_REFRESH_PERIOD,
            interval: IntervalConfig::standard(),
            fence_timeout: Duration::from_millis(50),
            max_frame_duration: Duration::from_millis(100),
            auto_swap_interval: true,
            auto_pipelining: true,
        }
    }

    /// Allows longer swap intervals and recovers more slowly.
    #[must_use]
    pub const fn power_saving() -> Self {
        Self {
            interval: IntervalConfig::power_saving(),
            ..Self::standard()
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::standard()
    }
}
