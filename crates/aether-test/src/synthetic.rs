//! Synthetic tracking data
//!
//! Seeded generators for face and hand frames, so scenario tests can feed
//! plausible landmarks without a model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use aether_core::{
    blendshape, BlendshapeScores, FaceFrame, FrameTime, Hand, HandFrame, Handedness, Landmark,
    FACE_LANDMARK_COUNT, HAND_LANDMARK_COUNT, MIDDLE_FINGER_MCP, NOSE_TIP,
};

/// Seeded source of tracking frames
#[derive(Debug, Clone)]
pub struct SyntheticTracker {
    rng: StdRng,
    /// Per-landmark jitter, normalized units
    jitter: f32,
}

impl SyntheticTracker {
    pub fn new(seed: u64) -> Self {
        SyntheticTracker {
            rng: StdRng::seed_from_u64(seed),
            jitter: 0.002,
        }
    }

    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    fn jittered(&mut self, x: f32, y: f32) -> Landmark {
        let j = self.jitter;
        let dx = if j > 0.0 { self.rng.gen_range(-j..=j) } else { 0.0 };
        let dy = if j > 0.0 { self.rng.gen_range(-j..=j) } else { 0.0 };
        Landmark::new((x + dx).clamp(0.0, 1.0), (y + dy).clamp(0.0, 1.0), 0.0)
    }

    /// Full face mesh laid out on an ellipse around (cx, cy), nose tip at the center
    pub fn face_at(
        &mut self,
        at: FrameTime,
        cx: f32,
        cy: f32,
        blendshapes: Option<BlendshapeScores>,
    ) -> FaceFrame {
        let mut landmarks = Vec::with_capacity(FACE_LANDMARK_COUNT);
        for i in 0..FACE_LANDMARK_COUNT {
            if i == NOSE_TIP {
                landmarks.push(Landmark::new(cx, cy, -0.05));
                continue;
            }
            let angle = i as f32 / FACE_LANDMARK_COUNT as f32 * std::f32::consts::TAU;
            let ring = 0.3 + 0.7 * ((i % 7) as f32 / 6.0);
            let x = cx + 0.12 * ring * angle.cos();
            let y = cy + 0.16 * ring * angle.sin();
            landmarks.push(self.jittered(x, y));
        }
        FaceFrame::new(at, landmarks, blendshapes)
    }

    /// Single right hand whose middle-finger base sits at (x, y)
    pub fn hand_at(&mut self, at: FrameTime, x: f32, y: f32) -> HandFrame {
        let mut landmarks = Vec::with_capacity(HAND_LANDMARK_COUNT);
        for i in 0..HAND_LANDMARK_COUNT {
            if i == MIDDLE_FINGER_MCP {
                landmarks.push(Landmark::new(x, y, 0.0));
                continue;
            }
            let finger = (i.saturating_sub(1) / 4) as f32;
            let joint = (i.saturating_sub(1) % 4) as f32;
            landmarks.push(self.jittered(x + (finger - 2.0) * 0.02, y - joint * 0.025));
        }
        HandFrame::new(at, vec![Hand::new(landmarks, Handedness::Right, 0.95)])
    }

    /// Random blendshape scores, each in [0, ceiling]
    pub fn blendshapes(&mut self, ceiling: f32) -> BlendshapeScores {
        let ceiling = ceiling.clamp(0.0, 1.0);
        let mut scores = BlendshapeScores::new();
        for name in [
            blendshape::BROW_DOWN_LEFT,
            blendshape::BROW_DOWN_RIGHT,
            blendshape::MOUTH_SMILE_LEFT,
            blendshape::MOUTH_SMILE_RIGHT,
            blendshape::JAW_OPEN,
        ] {
            scores.insert(name, self.rng.gen_range(0.0..=ceiling));
        }
        scores
    }

    /// Hand positions for a steady hand followed by one jump of `delta`,
    /// `hold` samples on each side
    pub fn swipe_path(&mut self, start: f32, delta: f32, hold: usize) -> Vec<f32> {
        let mut path = Vec::with_capacity(hold * 2);
        for _ in 0..hold {
            path.push(start);
        }
        for _ in 0..hold {
            path.push((start + delta).clamp(0.0, 1.0));
        }
        path
    }
}

impl Default for SyntheticTracker {
    fn default() -> Self {
        Self::new(0xAE7E)
    }
}

/// Neutral expression, below every default threshold
pub fn neutral() -> BlendshapeScores {
    BlendshapeScores::new()
        .with(blendshape::BROW_DOWN_LEFT, 0.1)
        .with(blendshape::MOUTH_SMILE_LEFT, 0.1)
        .with(blendshape::JAW_OPEN, 0.1)
}

pub fn frowning() -> BlendshapeScores {
    BlendshapeScores::new().with(blendshape::BROW_DOWN_RIGHT, 0.8)
}

pub fn smiling() -> BlendshapeScores {
    BlendshapeScores::new().with(blendshape::MOUTH_SMILE_LEFT, 0.9)
}

pub fn jaw_open() -> BlendshapeScores {
    BlendshapeScores::new().with(blendshape::JAW_OPEN, 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_has_full_mesh_and_anchor() {
        let mut tracker = SyntheticTracker::new(1);
        let face = tracker.face_at(FrameTime::from_millis(5), 0.4, 0.6, None);
        assert_eq!(face.landmarks().len(), FACE_LANDMARK_COUNT);
        assert_eq!(face.landmark(NOSE_TIP), Some(Landmark::new(0.4, 0.6, -0.05)));
        assert!(face
            .landmarks()
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
    }

    #[test]
    fn test_hand_reference_point_is_exact() {
        let mut tracker = SyntheticTracker::new(2).with_jitter(0.05);
        let frame = tracker.hand_at(FrameTime::ZERO, 0.25, 0.5);
        let hand = frame.primary().expect("one hand");
        assert_eq!(hand.landmarks().len(), HAND_LANDMARK_COUNT);
        assert_eq!(hand.reference_point().map(|p| p.x), Some(0.25));
    }

    #[test]
    fn test_same_seed_same_frames() {
        let a = SyntheticTracker::new(9).face_at(FrameTime::ZERO, 0.5, 0.5, None);
        let b = SyntheticTracker::new(9).face_at(FrameTime::ZERO, 0.5, 0.5, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_swipe_path() {
        let path = SyntheticTracker::default().swipe_path(0.25, 0.5, 3);
        assert_eq!(path, vec![0.25, 0.25, 0.25, 0.75, 0.75, 0.75]);
    }

    #[test]
    fn test_blendshapes_respect_ceiling() {
        let mut tracker = SyntheticTracker::new(3);
        for _ in 0..20 {
            let scores = tracker.blendshapes(0.3);
            assert_eq!(scores.len(), 5);
            assert!(scores.score(blendshape::JAW_OPEN) <= 0.3);
        }
    }
}
