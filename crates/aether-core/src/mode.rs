//! Visual control state
//!
//! The HUD has two independent single-value cells:
//! - FilterState: colour grading and protocol label (cycled by swipes)
//! - ModuleState: which 3D module the renderer draws
//!
//! Every value is reachable from every other value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AetherError;

/// Visual filter, in swipe-cycle order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FilterState {
    #[default]
    Standard = 0,
    Neural = 1,
    Combat = 2,
    Ghost = 3,
}

impl FilterState {
    /// Cycle order used by swipe gestures
    pub const ALL: [FilterState; 4] = [
        FilterState::Standard,
        FilterState::Neural,
        FilterState::Combat,
        FilterState::Ghost,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next filter, wrapping from last to first
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous filter, wrapping from first to last
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterState::Standard => "standard",
            FilterState::Neural => "neural",
            FilterState::Combat => "combat",
            FilterState::Ghost => "ghost",
        }
    }

    /// Protocol label shown in the status panel
    pub fn label(self) -> &'static str {
        match self {
            FilterState::Standard => "STANDARD_V4",
            FilterState::Neural => "NEURAL_LINK",
            FilterState::Combat => "COMBAT_INIT",
            FilterState::Ghost => "GHOST_MODE",
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterState {
    type Err = AetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AetherError::InvalidConfig(format!("unknown filter {s:?}")))
    }
}

/// Render module selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ModuleState {
    #[default]
    Mesh = 0,
    Core = 1,
    Pulse = 2,
    Glitch = 3,
}

impl ModuleState {
    pub const ALL: [ModuleState; 4] = [
        ModuleState::Mesh,
        ModuleState::Core,
        ModuleState::Pulse,
        ModuleState::Glitch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleState::Mesh => "mesh",
            ModuleState::Core => "core",
            ModuleState::Pulse => "pulse",
            ModuleState::Glitch => "glitch",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleState {
    type Err = AetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AetherError::InvalidConfig(format!("unknown module {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_cycle_wraps_forward() {
        assert_eq!(FilterState::Standard.next(), FilterState::Neural);
        assert_eq!(FilterState::Ghost.next(), FilterState::Standard);
    }

    #[test]
    fn test_filter_cycle_wraps_backward() {
        assert_eq!(FilterState::Standard.prev(), FilterState::Ghost);
        assert_eq!(FilterState::Combat.prev(), FilterState::Neural);
    }

    #[test]
    fn test_every_filter_reachable() {
        for start in FilterState::ALL {
            let mut seen = vec![start];
            let mut f = start;
            for _ in 0..3 {
                f = f.next();
                seen.push(f);
            }
            for target in FilterState::ALL {
                assert!(seen.contains(&target));
            }
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("ghost".parse::<FilterState>().unwrap(), FilterState::Ghost);
        assert_eq!("glitch".parse::<ModuleState>().unwrap(), ModuleState::Glitch);
        assert!("Ghost".parse::<FilterState>().is_err());
    }
}
