//! Gesture edge detector - horizontal swipes from hand samples
//!
//! Tracks the primary hand's middle-finger base between detection ticks and
//! turns a large horizontal jump into one discrete swipe, followed by a
//! cooldown measured in ticks.

use aether_core::{FilterState, HandFrame};

/// Detector thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Minimum |Δx| between consecutive samples (normalized units)
    pub swipe_threshold: f32,
    /// Ticks ignored after a swipe (~1s at 30Hz)
    pub cooldown_ticks: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: 0.1,
            cooldown_ticks: 30,
        }
    }
}

/// Swipe direction, the sign of Δx
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    Positive,
    Negative,
}

impl SwipeDirection {
    /// Step through the filter cycle
    pub fn apply(self, filter: FilterState) -> FilterState {
        match self {
            SwipeDirection::Positive => filter.next(),
            SwipeDirection::Negative => filter.prev(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwipeDirection::Positive => "positive",
            SwipeDirection::Negative => "negative",
        }
    }
}

/// A detected swipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swipe {
    pub direction: SwipeDirection,
    pub delta: f32,
}

/// Previous reference sample
#[derive(Debug, Clone, Copy, PartialEq)]
enum Reference {
    /// No hand on the previous tick. The next sample only seeds.
    Absent,
    Seen(f32),
}

#[derive(Debug, Clone)]
pub struct GestureEdgeDetector {
    config: GestureConfig,
    previous: Reference,
    cooldown: u32,
}

impl GestureEdgeDetector {
    pub fn new(config: GestureConfig) -> Self {
        GestureEdgeDetector {
            config,
            previous: Reference::Absent,
            cooldown: 0,
        }
    }

    /// Feed one detection tick. `None` means detection produced no hand data.
    pub fn observe(&mut self, hands: Option<&HandFrame>) -> Option<Swipe> {
        let x = hands
            .and_then(HandFrame::primary)
            .and_then(|hand| hand.reference_point())
            .map(|point| point.x);

        if self.cooldown > 0 {
            self.cooldown -= 1;
            // The reference stays at the swipe position; only a lost hand clears it
            if x.is_none() {
                self.previous = Reference::Absent;
            }
            return None;
        }

        let Some(x) = x else {
            self.previous = Reference::Absent;
            return None;
        };

        let previous = std::mem::replace(&mut self.previous, Reference::Seen(x));
        let Reference::Seen(prev_x) = previous else {
            return None;
        };

        let delta = x - prev_x;
        if delta.abs() <= self.config.swipe_threshold {
            return None;
        }

        self.cooldown = self.config.cooldown_ticks;
        let direction = if delta > 0.0 {
            SwipeDirection::Positive
        } else {
            SwipeDirection::Negative
        };
        tracing::debug!(direction = direction.as_str(), delta, "swipe detected");
        Some(Swipe { direction, delta })
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown
    }

    pub fn reset(&mut self) {
        self.previous = Reference::Absent;
        self.cooldown = 0;
    }
}

impl Default for GestureEdgeDetector {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::{FrameTime, Hand, Handedness, Landmark, HAND_LANDMARK_COUNT};
    use proptest::prelude::*;

    fn hands_at(x: f32) -> HandFrame {
        let points = vec![Landmark::new(x, 0.5, 0.0); HAND_LANDMARK_COUNT];
        HandFrame::new(
            FrameTime::ZERO,
            vec![Hand::new(points, Handedness::Right, 0.95)],
        )
    }

    #[test]
    fn test_single_swipe_then_cooldown() {
        let mut detector = GestureEdgeDetector::default();
        assert!(detector.observe(Some(&hands_at(0.2))).is_none());
        assert!(detector.observe(Some(&hands_at(0.2))).is_none());

        let swipe = detector.observe(Some(&hands_at(0.35))).unwrap();
        assert_eq!(swipe.direction, SwipeDirection::Positive);

        // Large movement during the next 29 ticks must not swipe
        for i in 0..29 {
            let x = if i % 2 == 0 { 0.9 } else { 0.1 };
            assert!(detector.observe(Some(&hands_at(x))).is_none());
        }
    }

    #[test]
    fn test_small_motion_ignored() {
        let mut detector = GestureEdgeDetector::default();
        detector.observe(Some(&hands_at(0.50)));
        assert!(detector.observe(Some(&hands_at(0.59))).is_none());
        assert!(detector.observe(Some(&hands_at(0.50))).is_none());
    }

    #[test]
    fn test_negative_swipe() {
        let mut detector = GestureEdgeDetector::default();
        detector.observe(Some(&hands_at(0.8)));
        let swipe = detector.observe(Some(&hands_at(0.5))).unwrap();
        assert_eq!(swipe.direction, SwipeDirection::Negative);
        assert_eq!(swipe.direction.apply(FilterState::Standard), FilterState::Ghost);
    }

    #[test]
    fn test_reappearing_hand_does_not_swipe() {
        let mut detector = GestureEdgeDetector::default();
        detector.observe(Some(&hands_at(0.1)));
        detector.observe(None);
        detector.observe(Some(&HandFrame::empty(FrameTime::ZERO)));
        // Far from the last seen position, but the hand was gone in between
        assert!(detector.observe(Some(&hands_at(0.9))).is_none());
    }

    #[test]
    fn test_cooldown_expires() {
        let config = GestureConfig {
            swipe_threshold: 0.1,
            cooldown_ticks: 3,
        };
        let mut detector = GestureEdgeDetector::new(config);
        detector.observe(Some(&hands_at(0.2)));
        assert!(detector.observe(Some(&hands_at(0.5))).is_some());
        for _ in 0..3 {
            assert!(detector.observe(Some(&hands_at(0.5))).is_none());
        }
        assert_eq!(detector.cooldown_remaining(), 0);
        assert!(detector.observe(Some(&hands_at(0.8))).is_some());
    }

    #[test]
    fn test_reference_frozen_through_cooldown() {
        let mut detector = GestureEdgeDetector::default();
        detector.observe(Some(&hands_at(0.2)));
        assert!(detector.observe(Some(&hands_at(0.35))).is_some());
        for _ in 0..30 {
            assert!(detector.observe(Some(&hands_at(0.9))).is_none());
        }
        // Compared against 0.35, not the held 0.9
        let swipe = detector.observe(Some(&hands_at(0.9))).unwrap();
        assert_eq!(swipe.direction, SwipeDirection::Positive);
    }

    #[test]
    fn test_hand_lost_during_cooldown_clears_reference() {
        let mut detector = GestureEdgeDetector::default();
        detector.observe(Some(&hands_at(0.2)));
        assert!(detector.observe(Some(&hands_at(0.35))).is_some());
        detector.observe(None);
        for _ in 0..29 {
            assert!(detector.observe(Some(&hands_at(0.9))).is_none());
        }
        assert_eq!(detector.cooldown_remaining(), 0);
        // Reappeared during cooldown, so this sample only seeds
        assert!(detector.observe(Some(&hands_at(0.5))).is_none());
    }

    #[test]
    fn test_positive_swipe_from_ghost_wraps_to_standard() {
        assert_eq!(
            SwipeDirection::Positive.apply(FilterState::Ghost),
            FilterState::Standard
        );
    }

    proptest! {
        #[test]
        fn prop_swipes_separated_by_cooldown(xs in proptest::collection::vec(0.0f32..1.0, 1..400)) {
            let mut detector = GestureEdgeDetector::default();
            let mut last_swipe: Option<usize> = None;
            for (tick, x) in xs.iter().enumerate() {
                if detector.observe(Some(&hands_at(*x))).is_some() {
                    if let Some(prev) = last_swipe {
                        prop_assert!(tick - prev > 30);
                    }
                    last_swipe = Some(tick);
                }
            }
        }
    }
}
