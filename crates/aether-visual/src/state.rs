//! Visual/module state machine
//!
//! Three sources write the same two cells: explicit user selection, swipe
//! gestures (filter only, cyclic) and emotion rules (both). There is no
//! lock between them. Within a tick the runtime applies gesture first and
//! emotion second, so a matching emotion rule wins that tick.
//!
//! Changing the filter starts a highlight pulse. Re-asserting the current
//! value is a no-op and leaves the pulse alone.

use std::time::Duration;

use aether_core::{FilterState, FrameTime, ModuleState};
use aether_time::Pulse;

use crate::{EmotionOverride, Swipe};

/// Highlight pulse length after a filter change
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(500);

/// Who requested a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSource {
    User,
    Gesture,
    Emotion,
}

impl ControlSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlSource::User => "user",
            ControlSource::Gesture => "gesture",
            ControlSource::Emotion => "emotion",
        }
    }
}

/// What one write actually changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateChange {
    pub filter: Option<FilterState>,
    pub module: Option<ModuleState>,
}

impl StateChange {
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.module.is_none()
    }
}

/// Read-only copy of the control state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualControl {
    pub filter: FilterState,
    pub module: ModuleState,
    pub highlight: bool,
}

#[derive(Debug, Clone)]
pub struct VisualStateMachine {
    filter: FilterState,
    module: ModuleState,
    highlight: Pulse,
    last_writer: Option<ControlSource>,
    transitions: u64,
}

impl VisualStateMachine {
    pub fn new() -> Self {
        Self::with_highlight(HIGHLIGHT_DURATION)
    }

    pub fn with_highlight(duration: Duration) -> Self {
        VisualStateMachine {
            filter: FilterState::default(),
            module: ModuleState::default(),
            highlight: Pulse::new(duration),
            last_writer: None,
            transitions: 0,
        }
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn module(&self) -> ModuleState {
        self.module
    }

    pub fn last_writer(&self) -> Option<ControlSource> {
        self.last_writer
    }

    /// Number of effective changes so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Set the filter. Returns true if it changed.
    pub fn set_filter(
        &mut self,
        filter: FilterState,
        source: ControlSource,
        now: FrameTime,
    ) -> bool {
        if self.filter == filter {
            return false;
        }
        tracing::debug!(
            from = self.filter.as_str(),
            to = filter.as_str(),
            source = source.as_str(),
            "filter changed"
        );
        self.filter = filter;
        self.last_writer = Some(source);
        self.transitions += 1;
        self.highlight.trigger(now);
        true
    }

    /// Set the module. Returns true if it changed.
    pub fn set_module(&mut self, module: ModuleState, source: ControlSource) -> bool {
        if self.module == module {
            return false;
        }
        tracing::debug!(
            from = self.module.as_str(),
            to = module.as_str(),
            source = source.as_str(),
            "module changed"
        );
        self.module = module;
        self.last_writer = Some(source);
        self.transitions += 1;
        true
    }

    /// Step the filter cycle in the swipe direction
    pub fn apply_swipe(&mut self, swipe: Swipe, now: FrameTime) -> FilterState {
        let target = swipe.direction.apply(self.filter);
        self.set_filter(target, ControlSource::Gesture, now);
        self.filter
    }

    /// Apply an emotion override. Unchanged cells are left untouched.
    pub fn apply_override(&mut self, verdict: &EmotionOverride, now: FrameTime) -> StateChange {
        let mut change = StateChange::default();
        if let Some(filter) = verdict.filter {
            if self.set_filter(filter, ControlSource::Emotion, now) {
                change.filter = Some(filter);
            }
        }
        if let Some(module) = verdict.module {
            if self.set_module(module, ControlSource::Emotion) {
                change.module = Some(module);
            }
        }
        change
    }

    pub fn highlight_active(&self, now: FrameTime) -> bool {
        self.highlight.is_active(now)
    }

    /// Clear an elapsed highlight. Returns true on the tick it clears.
    pub fn expire_highlight(&mut self, now: FrameTime) -> bool {
        self.highlight.expire(now)
    }

    pub fn control(&self, now: FrameTime) -> VisualControl {
        VisualControl {
            filter: self.filter,
            module: self.module,
            highlight: self.highlight_active(now),
        }
    }
}

impl Default for VisualStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
