//! Deterministic stand-ins for platform capabilities

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use aether_audio::{AudioError, OscillatorParams, OscillatorSink};
use aether_core::{
    AetherError, AetherResult, CaptureConstraints, CaptureDevice, CaptureError, FaceFrame,
    FrameTime, HandFrame, MediaStream, StreamView,
};
use aether_runtime::{
    BoxedDetector, Detection, Detector, DetectorLoader, LoadFuture, ReadyState, VideoFrame,
    VideoSource,
};
use aether_transport::DebugPreviewSink;

/// Camera that succeeds or fails on demand
#[derive(Debug, Clone, Default)]
pub struct FakeCamera {
    inner: Arc<Mutex<CameraState>>,
}

#[derive(Debug, Default)]
struct CameraState {
    failure: Option<CaptureError>,
    requests: Vec<CaptureConstraints>,
    issued: Vec<StreamView>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera whose every acquisition fails
    pub fn failing(error: CaptureError) -> Self {
        let camera = Self::default();
        camera.fail_with(Some(error));
        camera
    }

    pub fn fail_with(&self, error: Option<CaptureError>) {
        self.inner.lock().failure = error;
    }

    pub fn requests(&self) -> Vec<CaptureConstraints> {
        self.inner.lock().requests.clone()
    }

    /// Views of every stream handed out, oldest first
    pub fn issued(&self) -> Vec<StreamView> {
        self.inner.lock().issued.clone()
    }

    /// Streams handed out and still running
    pub fn active_streams(&self) -> usize {
        self.inner
            .lock()
            .issued
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    /// Synchronous acquisition, for drivers that do not await
    pub fn open(&self, constraints: CaptureConstraints) -> Result<MediaStream, CaptureError> {
        let mut state = self.inner.lock();
        state.requests.push(constraints);
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        let stream = MediaStream::video();
        state.issued.push(stream.share());
        Ok(stream)
    }
}

impl CaptureDevice for FakeCamera {
    fn acquire(
        &mut self,
        constraints: CaptureConstraints,
    ) -> impl Future<Output = Result<MediaStream, CaptureError>> + Send {
        let result = self.open(constraints);
        async move { result }
    }
}

/// Detector replaying scripted results. Clones share the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    /// Played once each, in order
    queued: VecDeque<Detection>,
    /// Returned when nothing is queued
    steady: Detection,
    calls: u64,
    closed: u64,
    pending_hands: Option<HandFrame>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for every detection from now on
    pub fn set(&self, face: Option<FaceFrame>, hands: Option<HandFrame>) {
        let mut script = self.inner.lock();
        script.queued.clear();
        script.steady = Detection { face, hands };
    }

    /// Results played once each before falling back to the steady one
    pub fn queue(&self, detections: impl IntoIterator<Item = Detection>) {
        self.inner.lock().queued.extend(detections);
    }

    /// Face detections performed
    pub fn calls(&self) -> u64 {
        self.inner.lock().calls
    }

    pub fn closed(&self) -> u64 {
        self.inner.lock().closed
    }

    pub fn boxed(&self) -> BoxedDetector {
        Box::new(self.clone())
    }
}

impl Detector for ScriptedDetector {
    fn detect_face(&mut self, frame: &VideoFrame) -> Option<FaceFrame> {
        let mut script = self.inner.lock();
        script.calls += 1;
        let next = match script.queued.pop_front() {
            Some(detection) => detection,
            None => script.steady.clone(),
        };
        script.pending_hands = next.hands;
        next.face.map(|face| {
            FaceFrame::new(
                frame.timestamp,
                face.landmarks().to_vec(),
                face.blendshapes().cloned(),
            )
        })
    }

    fn detect_hands(&mut self, frame: &VideoFrame) -> Option<HandFrame> {
        let hands = self.inner.lock().pending_hands.take()?;
        Some(HandFrame::new(frame.timestamp, hands.hands().to_vec()))
    }

    fn close(&mut self) {
        self.inner.lock().closed += 1;
    }
}

/// Loader resolving to a shared scripted detector, or failing
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoader {
    detector: ScriptedDetector,
    failure: Arc<Mutex<Option<String>>>,
    loads: Arc<Mutex<u64>>,
}

impl ScriptedLoader {
    pub fn new(detector: ScriptedDetector) -> Self {
        ScriptedLoader {
            detector,
            ..Self::default()
        }
    }

    pub fn fail_with(&self, reason: Option<&str>) {
        *self.failure.lock() = reason.map(str::to_string);
    }

    pub fn loads(&self) -> u64 {
        *self.loads.lock()
    }

    pub fn detector(&self) -> &ScriptedDetector {
        &self.detector
    }

    /// Synchronous load, for drivers that do not await
    pub fn load_now(&self) -> AetherResult<BoxedDetector> {
        *self.loads.lock() += 1;
        match self.failure.lock().clone() {
            Some(reason) => Err(AetherError::DetectionInit(reason)),
            None => Ok(self.detector.boxed()),
        }
    }
}

impl DetectorLoader for ScriptedLoader {
    fn load(&self) -> LoadFuture {
        let result = self.load_now();
        Box::pin(async move { result })
    }
}

/// Video element that needs a number of frames to warm up after attach
#[derive(Debug, Default)]
pub struct WarmupVideo {
    stream: Option<StreamView>,
    warmup: u32,
    remaining: u32,
}

impl WarmupVideo {
    pub fn new(warmup: u32) -> Self {
        WarmupVideo {
            stream: None,
            warmup,
            remaining: warmup,
        }
    }
}

impl VideoSource for WarmupVideo {
    fn attach(&mut self, stream: Option<StreamView>) {
        self.stream = stream;
        self.remaining = self.warmup;
    }

    fn attached(&self) -> Option<&StreamView> {
        self.stream.as_ref()
    }

    fn ready_state(&self) -> ReadyState {
        match &self.stream {
            Some(stream) if stream.is_active() && stream.has_video() => {
                if self.remaining == 0 {
                    ReadyState::HaveEnoughData
                } else {
                    ReadyState::HaveMetadata
                }
            }
            _ => ReadyState::HaveNothing,
        }
    }

    fn capture(&mut self, now: FrameTime) -> Option<VideoFrame> {
        let stream = self.stream.as_ref()?;
        if !stream.is_active() || !stream.has_video() {
            return None;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return None;
        }
        Some(VideoFrame {
            stream: stream.id(),
            timestamp: now,
        })
    }
}

/// Oscillator that records everything sent to it
#[derive(Debug, Clone, Default)]
pub struct RecordingOscillator {
    inner: Arc<Mutex<OscillatorLog>>,
}

#[derive(Debug, Default)]
struct OscillatorLog {
    started: bool,
    stopped: bool,
    params: Vec<OscillatorParams>,
    refuse: bool,
}

impl RecordingOscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oscillator that refuses to start
    pub fn refusing() -> Self {
        let osc = Self::default();
        osc.inner.lock().refuse = true;
        osc
    }

    pub fn started(&self) -> bool {
        self.inner.lock().started
    }

    pub fn stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    pub fn params(&self) -> Vec<OscillatorParams> {
        self.inner.lock().params.clone()
    }

    pub fn last(&self) -> Option<OscillatorParams> {
        self.inner.lock().params.last().copied()
    }
}

impl OscillatorSink for RecordingOscillator {
    fn start(&mut self, initial: OscillatorParams) -> Result<(), AudioError> {
        let mut log = self.inner.lock();
        if log.refuse {
            return Err(AudioError::Unavailable("autoplay blocked".into()));
        }
        log.started = true;
        log.params.push(initial);
        Ok(())
    }

    fn set_params(&mut self, params: OscillatorParams) {
        self.inner.lock().params.push(params);
    }

    fn stop(&mut self) {
        self.inner.lock().stopped = true;
    }
}

/// Debug preview that keeps every image shown
#[derive(Debug, Clone, Default)]
pub struct RecordingPreview {
    images: Arc<Mutex<Vec<String>>>,
}

impl RecordingPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> Vec<String> {
        self.images.lock().clone()
    }
}

impl DebugPreviewSink for RecordingPreview {
    fn show(&mut self, image: &str) {
        self.images.lock().push(image.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::StreamId;

    fn frame(ms: u64) -> VideoFrame {
        VideoFrame {
            stream: StreamId::new(1),
            timestamp: FrameTime::from_millis(ms),
        }
    }

    #[test]
    fn test_queued_detections_play_before_steady() {
        let detector = ScriptedDetector::new();
        let mut boxed = detector.boxed();
        let face = FaceFrame::new(FrameTime::ZERO, Vec::new(), None);
        detector.queue([Detection {
            face: Some(face),
            hands: None,
        }]);

        let first = boxed.detect_face(&frame(10)).unwrap();
        assert_eq!(first.timestamp(), FrameTime::from_millis(10));
        assert!(boxed.detect_face(&frame(20)).is_none());
        assert_eq!(detector.calls(), 2);

        boxed.close();
        assert_eq!(detector.closed(), 1);
    }

    #[test]
    fn test_camera_failure_and_release() {
        let camera = FakeCamera::new();
        let constraints = CaptureConstraints::default();
        let stream = camera.open(constraints).unwrap();
        assert_eq!(camera.active_streams(), 1);
        stream.stop();
        assert_eq!(camera.active_streams(), 0);

        camera.fail_with(Some(CaptureError::NoDevice));
        assert_eq!(camera.open(constraints).unwrap_err(), CaptureError::NoDevice);
        assert_eq!(camera.requests().len(), 2);
    }

    #[test]
    fn test_warmup_video_needs_frames() {
        let stream = MediaStream::video();
        let mut video = WarmupVideo::new(2);
        video.attach(Some(stream.share()));
        assert_eq!(video.ready_state(), ReadyState::HaveMetadata);
        assert!(video.capture(FrameTime::ZERO).is_none());
        assert!(video.capture(FrameTime::ZERO).is_none());
        assert_eq!(video.ready_state(), ReadyState::HaveEnoughData);
        assert!(video.capture(FrameTime::ZERO).is_some());
    }

    #[test]
    fn test_refusing_oscillator() {
        let mut osc = RecordingOscillator::refusing();
        assert!(osc.start(OscillatorParams::INITIAL).is_err());
        assert!(!osc.started());
    }
}
