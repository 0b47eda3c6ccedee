//! Emotion rule engine - blendshape scores to filter/module overrides
//!
//! Rules are checked in priority order and the first match wins:
//!
//! | # | Condition | Override |
//! |---|-----------|----------|
//! | 1 | browDownLeft or browDownRight > 0.5 | filter = combat |
//! | 2 | mouthSmileLeft or mouthSmileRight > 0.5 | filter = ghost |
//! | 3 | jawOpen > 0.4 | filter = neural, module = glitch |
//!
//! Missing scores count as zero. No match means no change.

use aether_core::{blendshape, BlendshapeScores, FilterState, ModuleState};

/// Score thresholds (strictly greater than)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionThresholds {
    pub brow_down: f32,
    pub smile: f32,
    pub jaw_open: f32,
}

impl Default for EmotionThresholds {
    fn default() -> Self {
        Self {
            brow_down: 0.5,
            smile: 0.5,
            jaw_open: 0.4,
        }
    }
}

/// Which rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionRule {
    BrowDown,
    Smile,
    JawOpen,
}

impl EmotionRule {
    /// Evaluation order
    pub const PRIORITY: [EmotionRule; 3] =
        [EmotionRule::BrowDown, EmotionRule::Smile, EmotionRule::JawOpen];

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionRule::BrowDown => "brow_down",
            EmotionRule::Smile => "smile",
            EmotionRule::JawOpen => "jaw_open",
        }
    }
}

/// State requested by a matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionOverride {
    pub rule: EmotionRule,
    pub filter: Option<FilterState>,
    pub module: Option<ModuleState>,
}

#[derive(Debug, Clone, Default)]
pub struct EmotionRuleEngine {
    thresholds: EmotionThresholds,
}

impl EmotionRuleEngine {
    pub fn new(thresholds: EmotionThresholds) -> Self {
        EmotionRuleEngine { thresholds }
    }

    /// Evaluate the rules. Absent scores are a no-op.
    pub fn evaluate(&self, scores: Option<&BlendshapeScores>) -> Option<EmotionOverride> {
        let scores = scores?;
        EmotionRule::PRIORITY
            .into_iter()
            .find(|rule| self.matches(*rule, scores))
            .map(Self::override_for)
    }

    fn matches(&self, rule: EmotionRule, scores: &BlendshapeScores) -> bool {
        let t = &self.thresholds;
        match rule {
            EmotionRule::BrowDown => {
                scores.score(blendshape::BROW_DOWN_LEFT) > t.brow_down
                    || scores.score(blendshape::BROW_DOWN_RIGHT) > t.brow_down
            }
            EmotionRule::Smile => {
                scores.score(blendshape::MOUTH_SMILE_LEFT) > t.smile
                    || scores.score(blendshape::MOUTH_SMILE_RIGHT) > t.smile
            }
            EmotionRule::JawOpen => scores.score(blendshape::JAW_OPEN) > t.jaw_open,
        }
    }

    fn override_for(rule: EmotionRule) -> EmotionOverride {
        match rule {
            EmotionRule::BrowDown => EmotionOverride {
                rule,
                filter: Some(FilterState::Combat),
                module: None,
            },
            EmotionRule::Smile => EmotionOverride {
                rule,
                filter: Some(FilterState::Ghost),
                module: None,
            },
            EmotionRule::JawOpen => EmotionOverride {
                rule,
                filter: Some(FilterState::Neural),
                module: Some(ModuleState::Glitch),
            },
        }
    }

    pub fn thresholds(&self) -> EmotionThresholds {
        self.thresholds
    }
}
