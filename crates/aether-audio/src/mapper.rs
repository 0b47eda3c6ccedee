//! Spatial audio mapper
//!
//! Not a state machine: the target is a pure function of the current frames,
//! and the only state is the smoothed output and the time it was computed.

use std::time::Duration;

use aether_core::{FaceFrame, FrameTime, HandFrame, NOSE_TIP};

/// Mapper tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMapperConfig {
    /// Gain while anything is tracked
    pub gain_level: f32,
    /// Frequency at x = 1
    pub min_frequency: f32,
    /// Frequency at x = 0
    pub max_frequency: f32,
    /// Exponential time constant
    pub smoothing: Duration,
}

impl Default for AudioMapperConfig {
    fn default() -> Self {
        Self {
            gain_level: 0.05,
            min_frequency: 110.0,
            max_frequency: 550.0,
            smoothing: Duration::from_millis(100),
        }
    }
}

/// Oscillator output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorParams {
    /// Hz
    pub frequency: f32,
    pub gain: f32,
}

impl OscillatorParams {
    /// Values an oscillator starts from when first armed
    pub const INITIAL: OscillatorParams = OscillatorParams {
        frequency: 220.0,
        gain: 0.0,
    };
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Where the primary tracked point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedSource {
    Hand,
    Face,
}

#[derive(Debug, Clone)]
pub struct SpatialAudioMapper {
    config: AudioMapperConfig,
    current: OscillatorParams,
    last_update: Option<FrameTime>,
}

impl SpatialAudioMapper {
    pub fn new(config: AudioMapperConfig) -> Self {
        SpatialAudioMapper {
            config,
            current: OscillatorParams::INITIAL,
            last_update: None,
        }
    }

    pub fn config(&self) -> &AudioMapperConfig {
        &self.config
    }

    pub fn current(&self) -> OscillatorParams {
        self.current
    }

    /// Primary horizontal position. Hands win over the face.
    pub fn primary_x(
        face: Option<&FaceFrame>,
        hands: Option<&HandFrame>,
    ) -> Option<(TrackedSource, f32)> {
        if let Some(hand) = hands.and_then(HandFrame::primary) {
            let x = hand.reference_point().map_or(0.5, |p| p.x);
            return Some((TrackedSource::Hand, x));
        }
        face.map(|face| {
            let x = face.landmark(NOSE_TIP).map_or(0.5, |p| p.x);
            (TrackedSource::Face, x)
        })
    }

    /// Inverted linear map of x in [0, 1] onto the frequency range
    pub fn frequency_for(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let span = self.config.max_frequency - self.config.min_frequency;
        self.config.min_frequency + (1.0 - x) * span
    }

    /// Target for the given frames. With nothing tracked the frequency holds
    /// and only the gain falls to zero.
    pub fn target(&self, face: Option<&FaceFrame>, hands: Option<&HandFrame>) -> OscillatorParams {
        match Self::primary_x(face, hands) {
            Some((_, x)) => OscillatorParams {
                frequency: self.frequency_for(x),
                gain: self.config.gain_level,
            },
            None => OscillatorParams {
                frequency: self.current.frequency,
                gain: 0.0,
            },
        }
    }

    /// Move the output toward the current target
    pub fn update(
        &mut self,
        now: FrameTime,
        face: Option<&FaceFrame>,
        hands: Option<&HandFrame>,
    ) -> OscillatorParams {
        let target = self.target(face, hands);
        let dt = match self.last_update {
            Some(last) => now.since(last),
            None => Duration::ZERO,
        };
        self.last_update = Some(now);

        let alpha = smoothing_factor(dt, self.config.smoothing);
        self.current.frequency += (target.frequency - self.current.frequency) * alpha;
        self.current.gain += (target.gain - self.current.gain) * alpha;
        self.current
    }

    pub fn reset(&mut self) {
        self.current = OscillatorParams::INITIAL;
        self.last_update = None;
    }
}

impl Default for SpatialAudioMapper {
    fn default() -> Self {
        Self::new(AudioMapperConfig::default())
    }
}

/// Fraction of the remaining distance covered in `dt`
pub fn smoothing_factor(dt: Duration, tau: Duration) -> f32 {
    if tau.is_zero() {
        return 1.0;
    }
    let ratio = dt.as_secs_f32() / tau.as_secs_f32();
    1.0 - (-ratio).exp()
}
