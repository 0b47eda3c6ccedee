//! Bounded diagnostic log for a sender session

use std::collections::VecDeque;

/// Entries kept by default
pub const SESSION_LOG_DEPTH: usize = 10;

#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: VecDeque<String>,
    depth: usize,
}

impl SessionLog {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        SessionLog {
            entries: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Append a line, dropping the oldest past the depth.
    /// Every line is mirrored to tracing.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "aether_transport::sender", "{}", line);
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|line| line.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new(SESSION_LOG_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_ten() {
        let mut log = SessionLog::default();
        for i in 0..25 {
            log.push(format!("line {}", i));
        }
        assert_eq!(log.len(), 10);
        assert_eq!(log.entries().next(), Some("line 15"));
        assert_eq!(log.last(), Some("line 24"));
    }

    proptest::proptest! {
        #[test]
        fn prop_window_is_most_recent_lines(depth in 1usize..16, count in 0usize..64) {
            let mut log = SessionLog::new(depth);
            for i in 0..count {
                log.push(format!("line {}", i));
            }
            let kept: Vec<String> = log.entries().map(str::to_string).collect();
            let expected: Vec<String> = (count.saturating_sub(depth)..count)
                .map(|i| format!("line {}", i))
                .collect();
            proptest::prop_assert_eq!(kept, expected);
        }
    }
}
