//! Frame clock

use std::time::Instant;

/// Period after which [`Timer::animation_time`] wraps, in seconds
///
/// Noise masks scroll with time; wrapping keeps the float bound to the
/// kernel precise in long sessions.
pub const ANIMATION_PERIOD: f32 = 3600.0;

/// Frame clock feeding the animated kernel inputs
///
/// Driven either by wall time with [`Timer::update`] or by a fixed step with
/// [`Timer::advance`] (headless runs and tests).
#[derive(Debug, Clone)]
pub struct Timer {
    last_tick: Instant,
    step: f32,
    elapsed: f64,
    frames: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Clock at zero
    pub fn new() -> Self {
        Self { last_tick: Instant::now(), step: 0.0, elapsed: 0.0, frames: 0 }
    }

    /// Step by the wall time since the previous tick
    pub fn update(&mut self) {
        let now = Instant::now();
        let step = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.advance(step);
    }

    /// Step by `delta_time` seconds; negative steps count as zero
    pub fn advance(&mut self, delta_time: f32) {
        self.step = delta_time.max(0.0);
        self.elapsed += f64::from(self.step);
        self.frames += 1;
    }

    /// Length of the last step
    pub const fn delta_time(&self) -> f32 {
        self.step
    }

    /// Seconds since creation
    pub fn total_time(&self) -> f32 {
        self.elapsed as f32
    }

    /// Time bound to the kernels, wrapped to [`ANIMATION_PERIOD`]
    pub fn animation_time(&self) -> f32 {
        (self.elapsed % f64::from(ANIMATION_PERIOD)) as f32
    }

    /// Steps taken
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_step_advance() {
        let mut timer = Timer::new();
        for _ in 0..4 {
            timer.advance(0.25);
        }
        assert_eq!(timer.frame_count(), 4);
        assert_relative_eq!(timer.total_time(), 1.0);
        assert_relative_eq!(timer.delta_time(), 0.25);
    }

    #[test]
    fn test_negative_step_is_ignored() {
        let mut timer = Timer::new();
        timer.advance(-1.0);
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.total_time(), 0.0);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn test_animation_time_wraps() {
        let mut timer = Timer::new();
        timer.advance(ANIMATION_PERIOD);
        timer.advance(2.5);
        assert_relative_eq!(timer.animation_time(), 2.5, epsilon = 1e-3);
        assert_relative_eq!(timer.total_time(), ANIMATION_PERIOD + 2.5, epsilon = 1e-2);
    }
}
