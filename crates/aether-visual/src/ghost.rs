//! Ghost buffer - a short history of face frames replayed as an afterimage
//!
//! Writes happen on every new face frame; reads happen on an independent
//! playback timer. Readers hold a cursor, never a reference into the
//! buffer, so eviction between reads cannot invalidate them.

use std::collections::VecDeque;

use aether_core::SharedFace;

/// Frames kept for ghost playback
pub const GHOST_CAPACITY: usize = 60;

/// Frames required before playback starts
pub const GHOST_MIN_PLAYBACK: usize = 10;

/// Fixed-capacity FIFO with drop-oldest eviction
#[derive(Debug, Clone)]
pub struct LandmarkRing<T> {
    frames: VecDeque<T>,
    capacity: usize,
    min_playback: usize,
}

impl<T> LandmarkRing<T> {
    pub fn new(capacity: usize, min_playback: usize) -> Self {
        let capacity = capacity.max(1);
        LandmarkRing {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            min_playback: min_playback.min(capacity),
        }
    }

    /// Append a frame. Returns the evicted oldest frame when full.
    pub fn push(&mut self, frame: T) -> Option<T> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Frame at `cursor mod len`, or `None` while the buffer is shorter than
    /// the playback threshold.
    pub fn sample(&self, cursor: GhostCursor) -> Option<&T> {
        if !self.is_playable() {
            return None;
        }
        let index = (cursor.0 % self.frames.len() as u64) as usize;
        self.frames.get(index)
    }

    pub fn is_playable(&self) -> bool {
        self.frames.len() >= self.min_playback && !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_playback(&self) -> usize {
        self.min_playback
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl<T> Default for LandmarkRing<T> {
    fn default() -> Self {
        Self::new(GHOST_CAPACITY, GHOST_MIN_PLAYBACK)
    }
}

/// Playback position, independent of buffer age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GhostCursor(pub u64);

impl GhostCursor {
    #[inline]
    pub fn advance(self) -> GhostCursor {
        GhostCursor(self.0.wrapping_add(1))
    }
}

/// Ghost playback: samples the ring on each playback tick
#[derive(Debug, Clone, Default)]
pub struct GhostPlayback {
    cursor: GhostCursor,
    current: Option<SharedFace>,
}

impl GhostPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// One playback tick. While the ring is below threshold the previous
    /// ghost frame (if any) is held and the cursor does not move.
    pub fn step(&mut self, ring: &LandmarkRing<SharedFace>) -> Option<SharedFace> {
        if let Some(frame) = ring.sample(self.cursor) {
            self.current = Some(SharedFace::clone(frame));
            self.cursor = self.cursor.advance();
        }
        self.current.clone()
    }

    pub fn current(&self) -> Option<&SharedFace> {
        self.current.as_ref()
    }

    pub fn cursor(&self) -> GhostCursor {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = GhostCursor::default();
        self.current = None;
    }
}
