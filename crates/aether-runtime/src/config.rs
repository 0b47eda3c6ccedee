//! HUD configuration
//!
//! Every tunable lives here. Durations are written in human form (`"50ms"`,
//! `"3s"`) in JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use aether_audio::AudioMapperConfig;
use aether_core::{AetherError, AetherResult, CaptureConstraints, FacingMode};
use aether_transport::{IceConfig, LivePolicy, STUN_SERVERS};
use aether_visual::{EmotionThresholds, GestureConfig, GHOST_CAPACITY, GHOST_MIN_PLAYBACK};

use crate::LogConfig;

mod duration_str {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

/// Ghost ring and playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostSettings {
    pub capacity: usize,
    pub min_playback: usize,
    #[serde(with = "duration_str")]
    pub period: Duration,
}

impl Default for GhostSettings {
    fn default() -> Self {
        GhostSettings {
            capacity: GHOST_CAPACITY,
            min_playback: GHOST_MIN_PLAYBACK,
            period: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub swipe_threshold: f32,
    /// Detection ticks ignored after a swipe
    pub cooldown_ticks: u32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        let defaults = GestureConfig::default();
        GestureSettings {
            swipe_threshold: defaults.swipe_threshold,
            cooldown_ticks: defaults.cooldown_ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionSettings {
    pub brow_down: f32,
    pub smile: f32,
    pub jaw_open: f32,
}

impl Default for EmotionSettings {
    fn default() -> Self {
        let defaults = EmotionThresholds::default();
        EmotionSettings {
            brow_down: defaults.brow_down,
            smile: defaults.smile,
            jaw_open: defaults.jaw_open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub gain_level: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
    #[serde(with = "duration_str")]
    pub smoothing: Duration,
}

impl Default for AudioSettings {
    fn default() -> Self {
        let defaults = AudioMapperConfig::default();
        AudioSettings {
            gain_level: defaults.gain_level,
            min_frequency: defaults.min_frequency,
            max_frequency: defaults.max_frequency,
            smoothing: defaults.smoothing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    #[serde(with = "duration_str")]
    pub period: Duration,
    /// Lines kept on screen
    pub depth: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            period: Duration::from_secs(3),
            depth: 5,
        }
    }
}

/// How a sender decides a call is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveMode {
    #[default]
    Optimistic,
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    pub live: LiveMode,
    #[serde(with = "duration_str")]
    pub grace: Duration,
}

impl Default for SenderSettings {
    fn default() -> Self {
        SenderSettings {
            live: LiveMode::Optimistic,
            grace: aether_transport::DEFAULT_LIVE_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub viewer: CaptureConstraints,
    pub sender: CaptureConstraints,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            viewer: CaptureConstraints::viewer(),
            sender: CaptureConstraints::sender(),
        }
    }
}

/// Full HUD configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    /// Driver tick period, roughly the display paint rate
    #[serde(with = "duration_str")]
    pub tick_interval: Duration,
    /// Minimum spacing between detections. Zero detects on every tick.
    #[serde(with = "duration_str")]
    pub detection_interval: Duration,
    pub ghost: GhostSettings,
    pub gesture: GestureSettings,
    pub emotion: EmotionSettings,
    #[serde(with = "duration_str")]
    pub highlight: Duration,
    pub audio: AudioSettings,
    #[serde(with = "duration_str")]
    pub fps_window: Duration,
    pub analysis: AnalysisSettings,
    pub sender: SenderSettings,
    pub ice_servers: Vec<String>,
    pub capture: CaptureSettings,
    pub log: LogConfig,
}

impl Default for HudConfig {
    fn default() -> Self {
        HudConfig {
            tick_interval: Duration::from_millis(16),
            detection_interval: Duration::ZERO,
            ghost: GhostSettings::default(),
            gesture: GestureSettings::default(),
            emotion: EmotionSettings::default(),
            highlight: aether_visual::HIGHLIGHT_DURATION,
            audio: AudioSettings::default(),
            fps_window: Duration::from_secs(1),
            analysis: AnalysisSettings::default(),
            sender: SenderSettings::default(),
            ice_servers: STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            capture: CaptureSettings::default(),
            log: LogConfig::default(),
        }
    }
}

impl HudConfig {
    /// Half-rate detection and ghost playback for constrained devices
    pub fn low_power() -> Self {
        let defaults = Self::default();
        HudConfig {
            tick_interval: defaults.tick_interval * 2,
            detection_interval: Duration::from_millis(33),
            ghost: GhostSettings {
                period: defaults.ghost.period * 2,
                ..defaults.ghost.clone()
            },
            capture: CaptureSettings {
                viewer: CaptureConstraints {
                    width: 640,
                    height: 480,
                    facing: FacingMode::User,
                    audio: false,
                },
                ..CaptureSettings::default()
            },
            ..defaults
        }
    }

    pub fn from_json_str(json: &str) -> AetherResult<Self> {
        let config: HudConfig =
            serde_json::from_str(json).map_err(|e| AetherError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> AetherResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AetherError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> AetherResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AetherError::InvalidConfig(e.to_string()))
    }

    /// Reject values the components cannot run with
    pub fn validate(&self) -> AetherResult<()> {
        let invalid = |msg: &str| Err(AetherError::InvalidConfig(msg.to_string()));

        if self.tick_interval.is_zero() {
            return invalid("tick_interval must be positive");
        }
        if self.ghost.capacity == 0 {
            return invalid("ghost.capacity must be positive");
        }
        if self.ghost.min_playback > self.ghost.capacity {
            return invalid("ghost.min_playback exceeds ghost.capacity");
        }
        if self.ghost.period.is_zero() {
            return invalid("ghost.period must be positive");
        }
        if !(self.gesture.swipe_threshold > 0.0) {
            return invalid("gesture.swipe_threshold must be positive");
        }
        let thresholds = [self.emotion.brow_down, self.emotion.smile, self.emotion.jaw_open];
        if thresholds.iter().any(|t| !(*t > 0.0)) {
            return invalid("emotion thresholds must be positive");
        }
        if !(self.audio.gain_level >= 0.0) {
            return invalid("audio.gain_level must not be negative");
        }
        if !(self.audio.min_frequency > 0.0)
            || self.audio.min_frequency >= self.audio.max_frequency
        {
            return invalid("audio frequency range is inverted or empty");
        }
        if self.fps_window.is_zero() {
            return invalid("fps_window must be positive");
        }
        if self.analysis.period.is_zero() || self.analysis.depth == 0 {
            return invalid("analysis period and depth must be positive");
        }
        self.ice_config().validate()?;
        Ok(())
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            swipe_threshold: self.gesture.swipe_threshold,
            cooldown_ticks: self.gesture.cooldown_ticks,
        }
    }

    pub fn emotion_thresholds(&self) -> EmotionThresholds {
        EmotionThresholds {
            brow_down: self.emotion.brow_down,
            smile: self.emotion.smile,
            jaw_open: self.emotion.jaw_open,
        }
    }

    pub fn audio_mapper(&self) -> AudioMapperConfig {
        AudioMapperConfig {
            gain_level: self.audio.gain_level,
            min_frequency: self.audio.min_frequency,
            max_frequency: self.audio.max_frequency,
            smoothing: self.audio.smoothing,
        }
    }

    pub fn ice_config(&self) -> IceConfig {
        IceConfig::new(self.ice_servers.clone())
    }

    pub fn live_policy(&self) -> LivePolicy {
        match self.sender.live {
            LiveMode::Optimistic => LivePolicy::Optimistic {
                grace: self.sender.grace,
            },
            LiveMode::Acknowledged => LivePolicy::Acknowledged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = HudConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ghost.capacity, 60);
        assert_eq!(config.ghost.min_playback, 10);
        assert_eq!(config.ghost.period, Duration::from_millis(50));
        assert_eq!(config.gesture.cooldown_ticks, 30);
        assert_eq!(config.highlight, Duration::from_millis(500));
        assert_eq!(config.analysis.depth, 5);
        assert_eq!(config.capture.viewer.width, 1280);
        assert_eq!(config.capture.sender.height, 480);
        assert_eq!(config.ice_servers.len(), 2);
        assert!(matches!(config.live_policy(), LivePolicy::Optimistic { grace } if grace == Duration::from_millis(500)));
    }

    #[test]
    fn test_human_durations_parse() {
        let config = HudConfig::from_json_str(
            r#"{
                "ghost": { "period": "100ms" },
                "analysis": { "period": "5s" },
                "sender": { "live": "acknowledged" },
                "log": { "level": "debug", "format": "json" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.ghost.period, Duration::from_millis(100));
        assert_eq!(config.ghost.capacity, 60);
        assert_eq!(config.analysis.period, Duration::from_secs(5));
        assert_eq!(config.live_policy(), LivePolicy::Acknowledged);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_rejects_bad_duration() {
        let err = HudConfig::from_json_str(r#"{"fps_window": "soon"}"#).unwrap_err();
        assert!(matches!(err, AetherError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = HudConfig::default();
        config.ghost.min_playback = 61;
        assert!(config.validate().is_err());

        let mut config = HudConfig::default();
        config.audio.min_frequency = 600.0;
        assert!(config.validate().is_err());

        let mut config = HudConfig::default();
        config.gesture.swipe_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = HudConfig::default();
        config.ice_servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_power_halves_rates() {
        let config = HudConfig::low_power();
        assert!(config.validate().is_ok());
        assert_eq!(config.ghost.period, Duration::from_millis(100));
        assert!(config.detection_interval > Duration::ZERO);
    }

    #[test]
    fn test_json_roundtrip_keeps_durations_readable() {
        let json = HudConfig::default().to_json_string().unwrap();
        assert!(json.contains("\"50ms\""));
        assert_eq!(HudConfig::from_json_str(&json).unwrap(), HudConfig::default());
    }
}
