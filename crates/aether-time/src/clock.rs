//! Frame clock for the HUD tick loop

use std::time::{Duration, Instant};

use aether_core::FrameTime;

/// Largest step a single tick may take. Longer gaps (tab suspended, laptop
/// asleep) are clamped so timers and smoothing do not jump.
pub const MAX_TICK_STEP: Duration = Duration::from_millis(100);

/// Monotonic frame clock
/// INVARIANT: the value never decreases
pub struct FrameClock {
    /// Current frame time
    value: FrameTime,
    /// Last OS instant observed by `tick`
    last_update: Instant,
    /// Step clamp
    max_step: Duration,
}

impl FrameClock {
    /// Create a new clock starting at zero
    pub fn new() -> Self {
        FrameClock {
            value: FrameTime::ZERO,
            last_update: Instant::now(),
            max_step: MAX_TICK_STEP,
        }
    }

    pub fn with_max_step(max_step: Duration) -> Self {
        FrameClock {
            max_step,
            ..Self::new()
        }
    }

    /// Advance by elapsed real time since the last tick
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        self.last_update = now;
        self.advance(elapsed)
    }

    /// Advance by an explicit step (clamped)
    pub fn advance(&mut self, dt: Duration) -> FrameTime {
        let step = dt.min(self.max_step);
        self.value = self.value.saturating_add(step);
        self.value
    }

    /// Current time without advancing
    pub fn now(&self) -> FrameTime {
        self.value
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_monotonic() {
        let mut clock = FrameClock::new();
        let t1 = clock.tick();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.tick();
        assert!(t2 > t1);
    }

    #[test]
    fn test_clock_advance_exact() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_millis(16));
        clock.advance(Duration::from_millis(17));
        assert_eq!(clock.now(), FrameTime::from_millis(33));
    }

    #[test]
    fn test_clock_clamps_large_gaps() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now(), FrameTime::ZERO + MAX_TICK_STEP);
    }
}
