//! Tracking data - landmark frames produced by the detection capability
//!
//! Frames are immutable once produced. They are shared by reference count
//! between the ghost buffer, the rule engines and the renderer.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::FrameTime;

/// Landmarks per detected face
pub const FACE_LANDMARK_COUNT: usize = 478;

/// Landmarks per detected hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Maximum hands per frame
pub const MAX_HANDS: usize = 2;

/// Face landmark at the nose tip
pub const NOSE_TIP: usize = 1;

/// Hand landmark at the middle-finger base (MCP joint)
pub const MIDDLE_FINGER_MCP: usize = 9;

/// Blendshape category names consumed by the emotion rules
pub mod blendshape {
    pub const BROW_DOWN_LEFT: &str = "browDownLeft";
    pub const BROW_DOWN_RIGHT: &str = "browDownRight";
    pub const MOUTH_SMILE_LEFT: &str = "mouthSmileLeft";
    pub const MOUTH_SMILE_RIGHT: &str = "mouthSmileRight";
    pub const JAW_OPEN: &str = "jawOpen";
}

/// A single tracked point.
/// x, y are normalized screen coordinates in [0, 1]; z is relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }
}

/// Named expression scores in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendshapeScores(HashMap<String, f32>);

impl BlendshapeScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score, clamped to [0, 1]
    pub fn with(mut self, name: impl Into<String>, score: f32) -> Self {
        self.insert(name, score);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, score: f32) {
        self.0.insert(name.into(), score.clamp(0.0, 1.0));
    }

    /// Missing categories score zero
    #[inline]
    pub fn score(&self, name: &str) -> f32 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for BlendshapeScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut scores = BlendshapeScores::new();
        for (name, score) in iter {
            scores.insert(name, score);
        }
        scores
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceFrame {
    timestamp: FrameTime,
    landmarks: Vec<Landmark>,
    blendshapes: Option<BlendshapeScores>,
}

impl FaceFrame {
    /// Build a face frame. Landmarks past the model's point count are dropped.
    pub fn new(
        timestamp: FrameTime,
        mut landmarks: Vec<Landmark>,
        blendshapes: Option<BlendshapeScores>,
    ) -> Self {
        landmarks.truncate(FACE_LANDMARK_COUNT);
        FaceFrame {
            timestamp,
            landmarks,
            blendshapes,
        }
    }

    pub fn timestamp(&self) -> FrameTime {
        self.timestamp
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    pub fn blendshapes(&self) -> Option<&BlendshapeScores> {
        self.blendshapes.as_ref()
    }

    /// Primary tracked point of the face (nose tip)
    pub fn anchor(&self) -> Option<Landmark> {
        self.landmark(NOSE_TIP)
    }

    pub fn into_shared(self) -> SharedFace {
        Arc::new(self)
    }
}

/// Face frame shared between consumers
pub type SharedFace = Arc<FaceFrame>;

/// Which hand the model believes it sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Left" | "left" => Handedness::Left,
            "Right" | "right" => Handedness::Right,
            _ => Handedness::Unknown,
        }
    }
}

/// One detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    landmarks: Vec<Landmark>,
    handedness: Handedness,
    confidence: f32,
}

impl Hand {
    pub fn new(mut landmarks: Vec<Landmark>, handedness: Handedness, confidence: f32) -> Self {
        landmarks.truncate(HAND_LANDMARK_COUNT);
        Hand {
            landmarks,
            handedness,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Middle-finger base, used for swipe and audio tracking
    pub fn reference_point(&self) -> Option<Landmark> {
        self.landmark(MIDDLE_FINGER_MCP)
    }
}

/// Zero to two hands detected in one tick
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    timestamp: FrameTime,
    hands: Vec<Hand>,
}

impl HandFrame {
    pub fn new(timestamp: FrameTime, mut hands: Vec<Hand>) -> Self {
        hands.truncate(MAX_HANDS);
        HandFrame { timestamp, hands }
    }

    pub fn empty(timestamp: FrameTime) -> Self {
        HandFrame {
            timestamp,
            hands: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> FrameTime {
        self.timestamp
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    /// The first reported hand drives gestures and audio
    pub fn primary(&self) -> Option<&Hand> {
        self.hands.first()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    pub fn into_shared(self) -> SharedHands {
        Arc::new(self)
    }
}

/// Hand frame shared between consumers
pub type SharedHands = Arc<HandFrame>;

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_at(x: f32) -> Hand {
        let landmarks = (0..HAND_LANDMARK_COUNT)
            .map(|_| Landmark::new(x, 0.5, 0.0))
            .collect();
        Hand::new(landmarks, Handedness::Right, 0.9)
    }

    #[test]
    fn test_missing_blendshape_scores_zero() {
        let scores = BlendshapeScores::new().with(blendshape::JAW_OPEN, 0.7);
        assert_eq!(scores.score(blendshape::JAW_OPEN), 0.7);
        assert_eq!(scores.score(blendshape::BROW_DOWN_LEFT), 0.0);
    }

    #[test]
    fn test_blendshape_scores_clamped() {
        let scores: BlendshapeScores = [("jawOpen", 1.7), ("browDownLeft", -0.2)]
            .into_iter()
            .collect();
        assert_eq!(scores.score("jawOpen"), 1.0);
        assert_eq!(scores.score("browDownLeft"), 0.0);
    }

    #[test]
    fn test_face_frame_truncates_excess_points() {
        let points = vec![Landmark::default(); FACE_LANDMARK_COUNT + 10];
        let face = FaceFrame::new(FrameTime::ZERO, points, None);
        assert_eq!(face.landmarks().len(), FACE_LANDMARK_COUNT);
    }

    #[test]
    fn test_hand_frame_keeps_two_hands() {
        let frame = HandFrame::new(
            FrameTime::ZERO,
            vec![hand_at(0.1), hand_at(0.2), hand_at(0.3)],
        );
        assert_eq!(frame.hands().len(), MAX_HANDS);
        assert_eq!(frame.primary().unwrap().reference_point().unwrap().x, 0.1);
    }

    #[test]
    fn test_short_hand_has_no_reference_point() {
        let hand = Hand::new(vec![Landmark::default(); 4], Handedness::Unknown, 0.5);
        assert!(hand.reference_point().is_none());
    }

    #[test]
    fn test_handedness_from_label() {
        assert_eq!(Handedness::from_label("Left"), Handedness::Left);
        assert_eq!(Handedness::from_label("Right"), Handedness::Right);
        assert_eq!(Handedness::from_label("?"), Handedness::Unknown);
    }
}
