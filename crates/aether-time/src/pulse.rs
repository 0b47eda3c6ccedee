//! Self-clearing pulse
//!
//! A pulse is active for a fixed duration after its last trigger.
//! Re-triggering while active restarts the window.

use std::time::Duration;

use aether_core::FrameTime;

#[derive(Debug, Clone)]
pub struct Pulse {
    duration: Duration,
    until: Option<FrameTime>,
}

impl Pulse {
    pub fn new(duration: Duration) -> Self {
        Pulse {
            duration,
            until: None,
        }
    }

    /// Start or restart the pulse
    pub fn trigger(&mut self, now: FrameTime) {
        self.until = Some(now + self.duration);
    }

    pub fn is_active(&self, now: FrameTime) -> bool {
        matches!(self.until, Some(until) if now < until)
    }

    /// Clear an expired pulse. Returns true on the tick it clears.
    pub fn expire(&mut self, now: FrameTime) -> bool {
        match self.until {
            Some(until) if now >= until => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.until = None;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
