//! Rendered-frame rate meter

use std::time::Duration;

use aether_core::FrameTime;

/// Counts frames and publishes the count once per window
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    window_start: FrameTime,
    frames: u32,
    last: u32,
}

impl FpsMeter {
    pub fn new(window: Duration, now: FrameTime) -> Self {
        FpsMeter {
            window,
            window_start: now,
            frames: 0,
            last: 0,
        }
    }

    /// Record a rendered frame. Returns the published count when a window closes.
    pub fn frame(&mut self, now: FrameTime) -> Option<u32> {
        self.frames += 1;
        if now.since(self.window_start) < self.window {
            return None;
        }
        self.last = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(self.last)
    }

    /// Last published count
    pub fn fps(&self) -> u32 {
        self.last
    }
}
