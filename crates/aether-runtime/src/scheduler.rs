//! Frame scheduler - one detection attempt per rendered frame
//!
//! Detection runs inside `tick` and returns before the next one can start,
//! so there is never more than one outstanding detection. A tick with no
//! detector or no decodable video does nothing and scheduling continues.
//! After `teardown` the scheduler never touches its detector again.

use std::time::Duration;

use aether_core::{AetherResult, FrameTime, StreamView};

use crate::{BoxedDetector, Detection, DetectionStatus, VideoFrame};

/// Decoding progress of the backing video, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    /// Enough to render the current frame
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// The video element detection reads from
pub trait VideoSource: Send {
    /// Point the element at a stream, or detach it
    fn attach(&mut self, stream: Option<StreamView>);

    fn attached(&self) -> Option<&StreamView>;

    fn ready_state(&self) -> ReadyState;

    /// Grab the current frame, if any
    fn capture(&mut self, now: FrameTime) -> Option<VideoFrame>;
}

/// Video element backed directly by a stream: ready as soon as the attached
/// stream is live and carries video.
#[derive(Debug, Default)]
pub struct StreamVideo {
    stream: Option<StreamView>,
}

impl StreamVideo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoSource for StreamVideo {
    fn attach(&mut self, stream: Option<StreamView>) {
        self.stream = stream;
    }

    fn attached(&self) -> Option<&StreamView> {
        self.stream.as_ref()
    }

    fn ready_state(&self) -> ReadyState {
        match &self.stream {
            Some(stream) if stream.is_active() && stream.has_video() => ReadyState::HaveEnoughData,
            Some(stream) if stream.is_active() => ReadyState::HaveMetadata,
            _ => ReadyState::HaveNothing,
        }
    }

    fn capture(&mut self, now: FrameTime) -> Option<VideoFrame> {
        if self.ready_state() < ReadyState::HaveCurrentData {
            return None;
        }
        self.stream.as_ref().map(|stream| VideoFrame {
            stream: stream.id(),
            timestamp: now,
        })
    }
}

/// What a scheduler tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Detected(Detection),
    /// No video, or not decoded far enough
    NotReady,
    /// Model still loading or failed to load
    NoDetector,
    /// Too soon after the previous detection
    Throttled,
    /// Torn down
    Stopped,
}

pub struct FrameScheduler {
    generation: u64,
    detector: Option<BoxedDetector>,
    status: DetectionStatus,
    running: bool,
    min_interval: Duration,
    last_detection: Option<FrameTime>,
}

impl FrameScheduler {
    /// Scheduler for one video source. `generation` tags its model load.
    pub fn new(generation: u64, min_interval: Duration) -> Self {
        FrameScheduler {
            generation,
            detector: None,
            status: DetectionStatus::Loading,
            running: true,
            min_interval,
            last_detection: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> &DetectionStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Hand over the result of the model load. Failure is logged once and
    /// leaves tracking disabled.
    pub fn install(&mut self, loaded: AetherResult<BoxedDetector>) {
        match loaded {
            Ok(mut detector) => {
                if !self.running {
                    tracing::debug!(generation = self.generation, "model arrived after teardown");
                    detector.close();
                    return;
                }
                if let Some(mut previous) = self.detector.replace(detector) {
                    previous.close();
                }
                self.status = DetectionStatus::Ready;
                tracing::info!(generation = self.generation, "detection ready");
            }
            Err(e) => {
                tracing::warn!(
                    generation = self.generation,
                    reason = %e,
                    "detection unavailable, tracking disabled"
                );
                self.status = DetectionStatus::Unavailable(e.to_string());
            }
        }
    }

    /// One rendered frame
    pub fn tick(&mut self, video: &mut dyn VideoSource, now: FrameTime) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }
        let Some(detector) = self.detector.as_mut() else {
            return TickOutcome::NoDetector;
        };
        if let Some(last) = self.last_detection {
            if now.since(last) < self.min_interval {
                return TickOutcome::Throttled;
            }
        }
        if video.ready_state() < ReadyState::HaveCurrentData {
            return TickOutcome::NotReady;
        }
        let Some(frame) = video.capture(now) else {
            return TickOutcome::NotReady;
        };

        self.last_detection = Some(now);
        TickOutcome::Detected(Detection {
            face: detector.detect_face(&frame),
            hands: detector.detect_hands(&frame),
        })
    }

    /// Stop scheduling and release the model
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let Some(mut detector) = self.detector.take() {
            detector.close();
        }
        tracing::debug!(generation = self.generation, "frame scheduler torn down");
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("generation", &self.generation)
            .field("status", &self.status)
            .field("running", &self.running)
            .field("has_detector", &self.detector.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use aether_core::{AetherError, FaceFrame, HandFrame, Landmark, MediaStream};

    #[derive(Default)]
    struct Counts {
        face_calls: AtomicUsize,
        closed: AtomicUsize,
    }

    struct CountingDetector(Arc<Counts>);

    impl crate::Detector for CountingDetector {
        fn detect_face(&mut self, frame: &VideoFrame) -> Option<FaceFrame> {
            self.0.face_calls.fetch_add(1, Ordering::SeqCst);
            Some(FaceFrame::new(frame.timestamp, vec![Landmark::new(0.5, 0.5, 0.0); 2], None))
        }

        fn detect_hands(&mut self, frame: &VideoFrame) -> Option<HandFrame> {
            Some(HandFrame::empty(frame.timestamp))
        }

        fn close(&mut self) {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ready_scheduler(counts: &Arc<Counts>) -> FrameScheduler {
        let mut scheduler = FrameScheduler::new(1, Duration::ZERO);
        scheduler.install(Ok(Box::new(CountingDetector(Arc::clone(counts)))));
        scheduler
    }

    #[test]
    fn test_not_ready_without_video() {
        let counts = Arc::new(Counts::default());
        let mut scheduler = ready_scheduler(&counts);
        let mut video = StreamVideo::new();

        assert_eq!(scheduler.tick(&mut video, FrameTime::ZERO), TickOutcome::NotReady);
        assert_eq!(counts.face_calls.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_detects_once_video_is_ready() {
        let counts = Arc::new(Counts::default());
        let mut scheduler = ready_scheduler(&counts);
        let camera = MediaStream::video();
        let mut video = StreamVideo::new();
        video.attach(Some(camera.share()));

        let outcome = scheduler.tick(&mut video, FrameTime::from_millis(16));
        let TickOutcome::Detected(detection) = outcome else {
            panic!("expected a detection, got {:?}", outcome);
        };
        assert_eq!(detection.face.unwrap().timestamp(), FrameTime::from_millis(16));
        assert_eq!(counts.face_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stopped_stream_is_not_ready() {
        let counts = Arc::new(Counts::default());
        let mut scheduler = ready_scheduler(&counts);
        let camera = MediaStream::video();
        let mut video = StreamVideo::new();
        video.attach(Some(camera.share()));
        camera.stop();

        assert_eq!(video.ready_state(), ReadyState::HaveNothing);
        assert_eq!(scheduler.tick(&mut video, FrameTime::ZERO), TickOutcome::NotReady);
    }

    #[test]
    fn test_load_failure_disables_tracking() {
        let mut scheduler = FrameScheduler::new(1, Duration::ZERO);
        scheduler.install(Err(AetherError::DetectionInit("model fetch failed".into())));
        assert!(matches!(scheduler.status(), DetectionStatus::Unavailable(r) if r.contains("model fetch failed")));

        let camera = MediaStream::video();
        let mut video = StreamVideo::new();
        video.attach(Some(camera.share()));
        assert_eq!(scheduler.tick(&mut video, FrameTime::ZERO), TickOutcome::NoDetector);
    }

    #[test]
    fn test_teardown_releases_model_and_stops() {
        let counts = Arc::new(Counts::default());
        let mut scheduler = ready_scheduler(&counts);
        let camera = MediaStream::video();
        let mut video = StreamVideo::new();
        video.attach(Some(camera.share()));

        scheduler.teardown();
        scheduler.teardown();
        assert_eq!(counts.closed.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.tick(&mut video, FrameTime::ZERO), TickOutcome::Stopped);
        assert_eq!(counts.face_calls.load(Ordering::SeqCst), 0);

        // A load finishing after teardown is closed immediately
        scheduler.install(Ok(Box::new(CountingDetector(Arc::clone(&counts)))));
        assert_eq!(counts.closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_min_interval_throttles() {
        let counts = Arc::new(Counts::default());
        let mut scheduler = FrameScheduler::new(1, Duration::from_millis(33));
        scheduler.install(Ok(Box::new(CountingDetector(Arc::clone(&counts)))));
        let camera = MediaStream::video();
        let mut video = StreamVideo::new();
        video.attach(Some(camera.share()));

        assert!(matches!(scheduler.tick(&mut video, FrameTime::from_millis(0)), TickOutcome::Detected(_)));
        assert_eq!(scheduler.tick(&mut video, FrameTime::from_millis(16)), TickOutcome::Throttled);
        assert!(matches!(scheduler.tick(&mut video, FrameTime::from_millis(33)), TickOutcome::Detected(_)));
        assert_eq!(counts.face_calls.load(Ordering::SeqCst), 2);
    }
}
