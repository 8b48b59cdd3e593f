//! Wall-clock to fixed-step conversion.
//!
//! The frame driver hands in whatever time passed since the last frame; the
//! simulation only ever advances in whole ticks of `step`. The sub-tick
//! remainder is carried into the next call.

use crate::math::Real;

#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepper {
    step: Real,
    max_frame_dt: Real,
    accumulator: Real,
}

impl FixedStepper {
    /// `step` is the fixed tick; frame deltas above `max_frame_dt` are clamped
    /// so a hitch cannot queue an unbounded number of ticks.
    pub fn new(step: Real, max_frame_dt: Real) -> Self {
        Self {
            step,
            max_frame_dt: max_frame_dt.max(step),
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> Real {
        self.step
    }

    /// Time received but not yet simulated; always in `[0, step)`.
    pub fn remainder(&self) -> Real {
        self.accumulator
    }

    /// Add a frame's elapsed time and return how many fixed ticks are now due.
    ///
    /// Negative, NaN or infinite deltas count as zero.
    pub fn accumulate(&mut self, real_dt: Real) -> u32 {
        let dt = if real_dt.is_finite() {
            real_dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += dt;
        let mut ticks = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            ticks += 1;
        }
        ticks
    }

    /// Drop any pending remainder.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
