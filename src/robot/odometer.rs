//! # Wheel odometer
//!
//! Two encoder inputs each raise an interrupt on every rising edge. The
//! interrupt handlers only bump a counter; a periodic sampler swaps both
//! counters to zero, averages them and publishes the result for readers.
//!
//! ```text
//!  left edge ISR ──▶ left  ┐
//!                          ├── sample() ──swap(0)──▶ published window ──▶ get_speed()
//!  right edge ISR ─▶ right ┘
//! ```
//!
//! All state is atomic so an [`Odometer`] can live in a `static` and be
//! shared between the handlers, the sampler and the control loop.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::utils::config::OdometerConfig;
use crate::utils::math::round2;

/// Raw edge counts accumulated since the last sample.
///
/// Only the edge handlers increment and only [`EdgeCounters::take`] reads;
/// readers of speed go through the published window instead.
#[derive(Debug)]
pub struct EdgeCounters {
    left: AtomicU32,
    right: AtomicU32,
}

impl EdgeCounters {
    pub const fn new() -> Self {
        Self {
            left: AtomicU32::new(0),
            right: AtomicU32::new(0),
        }
    }

    /// Count one left edge. O(1), safe from interrupt context.
    #[inline]
    pub fn record_left(&self) {
        self.left.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one right edge. O(1), safe from interrupt context.
    #[inline]
    pub fn record_right(&self) {
        self.right.fetch_add(1, Ordering::Relaxed);
    }

    /// Swap both counters to zero and return what they held.
    ///
    /// Each swap is atomic, so an edge lands either in this window or the
    /// next one, never both and never neither. The critical section keeps
    /// the two swaps adjacent so both wheels close the window together.
    pub fn take(&self) -> (u32, u32) {
        critical_section::with(|_| {
            let left = self.left.swap(0, Ordering::AcqRel);
            let right = self.right.swap(0, Ordering::AcqRel);
            (left, right)
        })
    }
}

impl Default for EdgeCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one sampler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowSample {
    pub left: u32,
    pub right: u32,
    /// Mean of the two wheel counts
    pub count: f32,
}

/// Interrupt-driven wheel odometer.
#[derive(Debug)]
pub struct Odometer {
    counters: EdgeCounters,
    /// `left + right` of the last closed window; the average is half of it.
    window_sum: AtomicU32,
    config: OdometerConfig,
}

impl Odometer {
    pub const fn new(config: OdometerConfig) -> Self {
        Self {
            counters: EdgeCounters::new(),
            window_sum: AtomicU32::new(0),
            config,
        }
    }

    /// Left encoder rising-edge handler.
    #[inline]
    pub fn record_left(&self) {
        self.counters.record_left();
    }

    /// Right encoder rising-edge handler.
    #[inline]
    pub fn record_right(&self) {
        self.counters.record_right();
    }

    /// Periodic sampler: close the window, publish the averaged count and
    /// reset both counters.
    pub fn sample(&self) -> WindowSample {
        let (left, right) = self.counters.take();
        let sum = left.saturating_add(right);
        self.window_sum.store(sum, Ordering::Release);
        trace!("odometer window left={} right={}", left, right);

        WindowSample {
            left,
            right,
            count: sum as f32 / 2.0,
        }
    }

    /// Average edge count of the last published window.
    #[inline]
    pub fn window_count(&self) -> f32 {
        self.window_sum.load(Ordering::Acquire) as f32 / 2.0
    }

    /// Distance covered during the last window, in centimetres, rounded to
    /// two decimals.
    pub fn get_speed(&self) -> f32 {
        let turns = self.window_count() / self.config.pulses_per_revolution as f32;
        round2(turns * self.config.wheel_circumference_cm())
    }

    /// Linear speed in cm/s derived from the last window and the configured
    /// sample period.
    pub fn speed_cm_per_s(&self) -> f32 {
        let period = self.config.sample_period.as_secs_f32();
        if period <= 0.0 {
            return 0.0;
        }
        let turns = self.window_count() / self.config.pulses_per_revolution as f32;
        round2(turns * self.config.wheel_circumference_cm() / period)
    }

    #[inline]
    pub fn config(&self) -> &OdometerConfig {
        &self.config
    }
}
