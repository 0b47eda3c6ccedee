//! Time primitives for the HUD
//!
//! All runtime components share one frame timeline: microseconds since the
//! runtime started. Timers, cooldowns and smoothing read this value instead
//! of the OS clock so that every tick is reproducible in tests.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Frame time - monotonic, microseconds since runtime epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTime(pub u64);

impl FrameTime {
    pub const ZERO: FrameTime = FrameTime(0);
    pub const MAX: FrameTime = FrameTime(u64::MAX);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        FrameTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        FrameTime(millis.saturating_mul(1000))
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        FrameTime((secs.max(0.0) * 1_000_000.0) as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        FrameTime(self.0.saturating_add(duration.as_micros() as u64))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        FrameTime(self.0.saturating_sub(duration.as_micros() as u64))
    }

    /// Elapsed time since an earlier instant (zero if `earlier` is later)
    #[inline]
    pub fn since(self, earlier: FrameTime) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for FrameTime {
    type Output = FrameTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for FrameTime {
    type Output = FrameTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub<FrameTime> for FrameTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: FrameTime) -> Self::Output {
        self.since(rhs)
    }
}

impl std::fmt::Debug for FrameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_conversions() {
        let t = FrameTime::from_millis(1500);
        assert_eq!(t.as_micros(), 1_500_000);
        assert_eq!(t.as_millis(), 1500);
        assert!((t.as_secs_f64() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_frame_time_arithmetic() {
        let t = FrameTime::from_millis(100);
        assert_eq!(t + Duration::from_millis(50), FrameTime::from_millis(150));
        assert_eq!(t - Duration::from_millis(500), FrameTime::ZERO);
        assert_eq!(FrameTime::from_millis(150) - t, Duration::from_millis(50));
        assert_eq!(t - FrameTime::from_millis(150), Duration::ZERO);
    }
}
