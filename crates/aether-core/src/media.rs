//! Media stream handles
//!
//! A `MediaStream` is the owning handle for a camera or remote media stream.
//! Consumers such as the frame scheduler and renderer receive a `StreamView`,
//! which can observe the stream but never stop it. The stream stays active
//! until its owner stops or drops it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::StreamId;

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Track kind inside a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug)]
struct StreamInner {
    id: StreamId,
    tracks: Vec<TrackKind>,
    active: AtomicBool,
}

/// Owning media stream handle
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

impl MediaStream {
    /// Wrap a stream with the given tracks under a fresh id
    pub fn new(tracks: Vec<TrackKind>) -> Self {
        Self::with_id(
            StreamId::new(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)),
            tracks,
        )
    }

    pub fn with_id(id: StreamId, tracks: Vec<TrackKind>) -> Self {
        MediaStream {
            inner: Arc::new(StreamInner {
                id,
                tracks,
                active: AtomicBool::new(true),
            }),
        }
    }

    /// Empty stream used to answer calls without sending media back
    pub fn placeholder() -> Self {
        Self::new(Vec::new())
    }

    /// Single video track, as produced by a camera
    pub fn video() -> Self {
        Self::new(vec![TrackKind::Video])
    }

    pub fn id(&self) -> StreamId {
        self.inner.id
    }

    pub fn video_tracks(&self) -> usize {
        count(&self.inner.tracks, TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> usize {
        count(&self.inner.tracks, TrackKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.video_tracks() > 0
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Read-only handle for consumers
    pub fn share(&self) -> StreamView {
        StreamView {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stop all tracks. Outstanding views observe the stream as inactive.
    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.inner.active.store(false, Ordering::Release);
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.inner.id)
            .field("tracks", &self.inner.tracks)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Read-only view of a media stream
#[derive(Clone)]
pub struct StreamView {
    inner: Arc<StreamInner>,
}

impl StreamView {
    pub fn id(&self) -> StreamId {
        self.inner.id
    }

    pub fn video_tracks(&self) -> usize {
        count(&self.inner.tracks, TrackKind::Video)
    }

    pub fn has_video(&self) -> bool {
        self.video_tracks() > 0
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }
}

impl PartialEq for StreamView {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StreamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamView")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

fn count(tracks: &[TrackKind], kind: TrackKind) -> usize {
    tracks.iter().filter(|t| **t == kind).count()
}
