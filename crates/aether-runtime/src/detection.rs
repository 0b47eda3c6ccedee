//! Detection capability - face and hand landmark models
//!
//! Loading a model is asynchronous and may fail. Once loaded, detection is a
//! synchronous call made from the frame scheduler, at most once per tick.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use aether_core::{AetherResult, FaceFrame, FrameTime, HandFrame, StreamId};

/// The current picture of the backing video, handed to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrame {
    pub stream: StreamId,
    pub timestamp: FrameTime,
}

/// Loaded landmark models
pub trait Detector: Send {
    fn detect_face(&mut self, frame: &VideoFrame) -> Option<FaceFrame>;

    fn detect_hands(&mut self, frame: &VideoFrame) -> Option<HandFrame>;

    /// Release the model. Called once on teardown.
    fn close(&mut self) {}
}

pub type BoxedDetector = Box<dyn Detector>;

pub type LoadFuture = Pin<Box<dyn Future<Output = AetherResult<BoxedDetector>> + Send>>;

/// Asynchronous model loader
pub trait DetectorLoader: Send + Sync {
    fn load(&self) -> LoadFuture;
}

/// Output of one detection tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub face: Option<FaceFrame>,
    pub hands: Option<HandFrame>,
}

/// Model availability
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectionStatus {
    #[default]
    Loading,
    Ready,
    /// Load failed. Tracking stays off for this source.
    Unavailable(String),
}

impl DetectionStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, DetectionStatus::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Loading => "loading",
            DetectionStatus::Ready => "ready",
            DetectionStatus::Unavailable(_) => "unavailable",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStatus::Unavailable(reason) => write!(f, "unavailable ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
