//! HUD invariants under arbitrary tracking input

use proptest::prelude::*;

use aether_core::{BlendshapeScores, FilterState, FrameTime, ModuleState};
use aether_test::{frowning, jaw_open, neutral, smiling, HudHarness, SyntheticTracker};

fn expression(kind: u8) -> BlendshapeScores {
    match kind {
        1 => frowning(),
        2 => smiling(),
        3 => jaw_open(),
        _ => neutral(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_hud_invariants_hold_every_tick(
        script in proptest::collection::vec(
            (
                proptest::option::of(0.0f32..1.0),
                proptest::option::of(0.0f32..1.0),
                0u8..4,
            ),
            1..80,
        )
    ) {
        let mut hud = HudHarness::new(42).unwrap();
        let mut tracker = SyntheticTracker::new(42);
        let mut face_seen = false;

        for (tick, (face_x, hand_x, kind)) in script.iter().enumerate() {
            let face = face_x.map(|x| {
                tracker.face_at(FrameTime::ZERO, x, 0.5, Some(expression(*kind)))
            });
            let hands = hand_x.map(|x| tracker.hand_at(FrameTime::ZERO, x, 0.5));
            face_seen |= face.is_some();
            hud.detector().set(face, hands);

            let snap = hud.step();
            let stats = hud.runtime().stats();

            prop_assert_eq!(stats.detections, tick as u64 + 1);
            prop_assert!(hud.runtime().ghost_buffered() <= 60);
            prop_assert_eq!(snap.idle, !face_seen);
            prop_assert!((110.0 - 1e-3..=550.0 + 1e-3).contains(&snap.audio.frequency));
            prop_assert!((-1e-6..=0.05 + 1e-6).contains(&snap.audio.gain));
            prop_assert!(snap.ghost.is_none() || snap.filter == FilterState::Ghost);

            // Emotion runs after the gesture, so a matching expression always decides
            if face_x.is_some() {
                match *kind {
                    1 => {
                        prop_assert_eq!(snap.filter, FilterState::Combat);
                    }
                    2 => {
                        prop_assert_eq!(snap.filter, FilterState::Ghost);
                    }
                    3 => {
                        prop_assert_eq!(snap.filter, FilterState::Neural);
                        prop_assert_eq!(snap.module, ModuleState::Glitch);
                    }
                    _ => {}
                }
            }
        }
    }
}
