//! Simulated analysis feed shown in the HUD corner

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Lines the feed draws from
pub const ANALYSIS_CATALOGUE: [&str; 8] = [
    "SCANNING_ENVIRONMENT...",
    "OBJECT_DETECTED: UNKNOWN",
    "CORE_PHASE_STABLE",
    "NEURAL_LINK_ESTABLISHED",
    "BIOMETRIC_DATA_SYNCED",
    "NODE_STRENGTH: 98%",
    "ENCRYPTION: AES-256",
    "PROTOCOL_V4_ACTIVE",
];

/// Feed contents before the first step
pub const INITIAL_ANALYSIS: [&str; 2] = ["SYSTEM_READY", "IDLE_MODE_ACTIVE"];

#[derive(Debug, Clone)]
pub struct AnalysisFeed {
    lines: VecDeque<&'static str>,
    depth: usize,
    rng: StdRng,
}

impl AnalysisFeed {
    pub fn new(depth: usize) -> Self {
        Self::with_rng(depth, StdRng::from_entropy())
    }

    pub fn with_rng(depth: usize, rng: StdRng) -> Self {
        let depth = depth.max(1);
        let mut lines: VecDeque<&'static str> = INITIAL_ANALYSIS.iter().copied().collect();
        while lines.len() > depth {
            lines.pop_front();
        }
        AnalysisFeed { lines, depth, rng }
    }

    /// Append one random catalogue line, keeping the last `depth`
    pub fn step(&mut self) -> &'static str {
        let line = ANALYSIS_CATALOGUE
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(INITIAL_ANALYSIS[0]);
        if self.lines.len() == self.depth {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        line
    }

    /// Oldest first
    pub fn lines(&self) -> Vec<&'static str> {
        self.lines.iter().copied().collect()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
