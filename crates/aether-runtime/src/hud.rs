//! HUD runtime - per-frame orchestration
//!
//! `tick` runs a fixed sequence of stages:
//! 1. Advance clock
//! 2. Drain inbox (commands, async completions) and bridge events
//! 3. Fire due tasks (ghost playback, analysis feed)
//! 4. Frame scheduler detection
//! 5. Ghost write
//! 6. Gesture
//! 7. Emotion
//! 8. Expire highlight
//! 9. Audio
//! 10. Publish snapshot
//!
//! Gesture and emotion both read the frame detected in stage 4. Emotion runs
//! after gesture, so a matching rule overrides a swipe within the same tick.
//!
//! Nothing here awaits. Camera and model loads are handed out as
//! `HudRequest`s and their results come back through the inbox.

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};

use aether_audio::{AudioEngine, OscillatorParams, OscillatorSink, SpatialAudioMapper};
use aether_core::{
    AetherResult, CaptureConstraints, CaptureError, FaceFrame, FilterState, FrameTime, HandFrame,
    MediaStream, ModuleState, PeerId, SharedFace, SharedHands, StreamView,
};
use aether_time::{FpsMeter, TaskScheduler};
use aether_transport::{BridgeStatus, DebugPreviewSink, JoinLink, PeerTransport, ViewerBridge};
use aether_visual::{
    ghost_for, ControlSource, EmotionRuleEngine, FilterStyle, GestureEdgeDetector, GhostPlayback,
    LandmarkRing, RenderDirective, VisualStateMachine,
};

use crate::{
    AnalysisFeed, BoxedDetector, DetectionStatus, FrameScheduler, HudConfig, TickOutcome,
    VideoSource, INITIAL_ANALYSIS,
};

pub type BoxedTransport = Box<dyn PeerTransport>;
pub type BoxedOscillator = Box<dyn OscillatorSink + Send>;

/// Where the HUD takes its video from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceMode {
    /// Own camera
    #[default]
    Local,
    /// Viewer bridge stream, once connected
    Remote,
}

impl SourceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMode::Local => "local",
            SourceMode::Remote => "remote",
        }
    }
}

/// Input to the runtime, consumed at the start of the next tick
pub enum HudCommand {
    SelectFilter(FilterState),
    SelectModule(ModuleState),
    SwitchMode(SourceMode),
    OpenBridge,
    CloseBridge,
    ReinitializeBridge,
    /// First user interaction; audio may start
    ArmAudio,
    DetectorLoaded {
        generation: u64,
        result: AetherResult<BoxedDetector>,
    },
    CameraAcquired {
        generation: u64,
        result: Result<MediaStream, CaptureError>,
    },
}

impl HudCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HudCommand::SelectFilter(_) => "select_filter",
            HudCommand::SelectModule(_) => "select_module",
            HudCommand::SwitchMode(_) => "switch_mode",
            HudCommand::OpenBridge => "open_bridge",
            HudCommand::CloseBridge => "close_bridge",
            HudCommand::ReinitializeBridge => "reinitialize_bridge",
            HudCommand::ArmAudio => "arm_audio",
            HudCommand::DetectorLoaded { .. } => "detector_loaded",
            HudCommand::CameraAcquired { .. } => "camera_acquired",
        }
    }
}

impl fmt::Debug for HudCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HudCommand::SelectFilter(filter) => write!(f, "SelectFilter({:?})", filter),
            HudCommand::SelectModule(module) => write!(f, "SelectModule({:?})", module),
            HudCommand::SwitchMode(mode) => write!(f, "SwitchMode({:?})", mode),
            HudCommand::DetectorLoaded { generation, result } => f
                .debug_struct("DetectorLoaded")
                .field("generation", generation)
                .field("ok", &result.is_ok())
                .finish(),
            HudCommand::CameraAcquired { generation, result } => f
                .debug_struct("CameraAcquired")
                .field("generation", generation)
                .field("result", result)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Posting side of the runtime inbox
#[derive(Debug, Clone)]
pub struct HudInbox {
    tx: mpsc::UnboundedSender<HudCommand>,
}

impl HudInbox {
    /// Returns false once the runtime is gone
    pub fn send(&self, command: HudCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Asynchronous work the runtime needs done for its current video source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudRequest {
    LoadDetector {
        generation: u64,
    },
    AcquireCamera {
        generation: u64,
        constraints: CaptureConstraints,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HudTask {
    GhostPlayback,
    Analysis,
}

#[derive(Debug, Clone, PartialEq)]
enum ActiveSource {
    Camera,
    Remote(StreamView),
}

impl ActiveSource {
    fn as_str(&self) -> &'static str {
        match self {
            ActiveSource::Camera => "camera",
            ActiveSource::Remote(_) => "remote",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub detections: u64,
    /// Ticks where the video was not ready
    pub skipped_ticks: u64,
    pub swipes: u64,
    pub emotion_overrides: u64,
    pub ghost_samples: u64,
    pub source_rebuilds: u64,
    pub last_tick_duration: Duration,
}

/// Everything a renderer or audio consumer needs for one frame
#[derive(Clone, Debug)]
pub struct HudSnapshot {
    pub at: FrameTime,
    pub mode: SourceMode,
    pub face: Option<SharedFace>,
    pub hands: Option<SharedHands>,
    pub filter: FilterState,
    pub module: ModuleState,
    pub style: FilterStyle,
    pub directive: RenderDirective,
    /// Only while the ghost filter is active
    pub ghost: Option<SharedFace>,
    pub highlight: bool,
    pub fps: u32,
    pub analysis: Vec<&'static str>,
    pub detection: DetectionStatus,
    /// No face seen on the current source yet
    pub idle: bool,
    pub bridge: BridgeStatus,
    pub peer_id: Option<PeerId>,
    pub camera_error: Option<String>,
    pub audio: OscillatorParams,
}

impl HudSnapshot {
    fn blank() -> Self {
        let filter = FilterState::default();
        HudSnapshot {
            at: FrameTime::ZERO,
            mode: SourceMode::Local,
            face: None,
            hands: None,
            filter,
            module: ModuleState::default(),
            style: FilterStyle::for_filter(filter),
            directive: RenderDirective::Idle,
            ghost: None,
            highlight: false,
            fps: 0,
            analysis: INITIAL_ANALYSIS.to_vec(),
            detection: DetectionStatus::Loading,
            idle: true,
            bridge: BridgeStatus::Initializing,
            peer_id: None,
            camera_error: None,
            audio: OscillatorParams::INITIAL,
        }
    }
}

pub struct HudRuntime {
    config: HudConfig,
    now: FrameTime,
    mode: SourceMode,
    source: ActiveSource,
    source_generation: u64,
    inbox_tx: mpsc::UnboundedSender<HudCommand>,
    inbox: mpsc::UnboundedReceiver<HudCommand>,
    requests: Vec<HudRequest>,
    tasks: TaskScheduler<HudTask>,
    frames: FrameScheduler,
    video: Box<dyn VideoSource>,
    camera: Option<MediaStream>,
    camera_error: Option<String>,
    bridge: ViewerBridge<BoxedTransport>,
    ring: LandmarkRing<SharedFace>,
    ghost: GhostPlayback,
    gesture: GestureEdgeDetector,
    emotion: EmotionRuleEngine,
    visual: VisualStateMachine,
    mapper: SpatialAudioMapper,
    audio: Option<AudioEngine<BoxedOscillator>>,
    fps: FpsMeter,
    analysis: AnalysisFeed,
    face: Option<SharedFace>,
    hands: Option<SharedHands>,
    face_seen: bool,
    stats: RuntimeStats,
    published: watch::Sender<HudSnapshot>,
    shut_down: bool,
}

impl HudRuntime {
    pub fn new(
        config: HudConfig,
        transport: BoxedTransport,
        video: Box<dyn VideoSource>,
    ) -> AetherResult<Self> {
        Self::with_rng(config, transport, video, StdRng::from_entropy())
    }

    /// Deterministic peer ids and analysis feed
    pub fn with_rng(
        config: HudConfig,
        transport: BoxedTransport,
        video: Box<dyn VideoSource>,
        mut rng: StdRng,
    ) -> AetherResult<Self> {
        config.validate()?;

        let now = FrameTime::ZERO;
        let generation = 1;
        let mut tasks = TaskScheduler::new();
        tasks.schedule_every(now, config.ghost.period, HudTask::GhostPlayback);
        tasks.schedule_every(now, config.analysis.period, HudTask::Analysis);

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(HudSnapshot::blank());
        let bridge_rng = StdRng::seed_from_u64(rng.gen());
        let analysis_rng = StdRng::seed_from_u64(rng.gen());

        let runtime = HudRuntime {
            now,
            mode: SourceMode::Local,
            source: ActiveSource::Camera,
            source_generation: generation,
            inbox_tx,
            inbox,
            requests: vec![
                HudRequest::LoadDetector { generation },
                HudRequest::AcquireCamera {
                    generation,
                    constraints: config.capture.viewer,
                },
            ],
            tasks,
            frames: FrameScheduler::new(generation, config.detection_interval),
            video,
            camera: None,
            camera_error: None,
            bridge: ViewerBridge::with_rng(transport, config.ice_config(), bridge_rng),
            ring: LandmarkRing::new(config.ghost.capacity, config.ghost.min_playback),
            ghost: GhostPlayback::new(),
            gesture: GestureEdgeDetector::new(config.gesture_config()),
            emotion: EmotionRuleEngine::new(config.emotion_thresholds()),
            visual: VisualStateMachine::with_highlight(config.highlight),
            mapper: SpatialAudioMapper::new(config.audio_mapper()),
            audio: None,
            fps: FpsMeter::new(config.fps_window, now),
            analysis: AnalysisFeed::with_rng(config.analysis.depth, analysis_rng),
            face: None,
            hands: None,
            face_seen: false,
            stats: RuntimeStats::default(),
            published,
            shut_down: false,
            config,
        };
        tracing::info!(generation, "hud runtime created");
        Ok(runtime)
    }

    /// Attach the audio output. Replacing a sink disposes the old engine.
    pub fn set_audio_sink(&mut self, sink: BoxedOscillator) {
        if let Some(mut previous) = self.audio.replace(AudioEngine::new(sink)) {
            previous.dispose();
        }
    }

    pub fn set_preview_sink(&mut self, sink: Box<dyn DebugPreviewSink>) {
        self.bridge.set_preview_sink(sink);
    }

    pub fn config(&self) -> &HudConfig {
        &self.config
    }

    pub fn now(&self) -> FrameTime {
        self.now
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn filter(&self) -> FilterState {
        self.visual.filter()
    }

    pub fn module(&self) -> ModuleState {
        self.visual.module()
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn detection_status(&self) -> &DetectionStatus {
        self.frames.status()
    }

    /// Generation of the current video source
    pub fn source_generation(&self) -> u64 {
        self.source_generation
    }

    pub fn bridge(&self) -> &ViewerBridge<BoxedTransport> {
        &self.bridge
    }

    pub fn join_link(&self, origin: &str) -> Option<JoinLink> {
        self.bridge.join_link(origin)
    }

    pub fn audio(&self) -> Option<&AudioEngine<BoxedOscillator>> {
        self.audio.as_ref()
    }

    /// Frames currently held for ghost playback
    pub fn ghost_buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn inbox(&self) -> HudInbox {
        HudInbox {
            tx: self.inbox_tx.clone(),
        }
    }

    /// Take the pending asynchronous work
    pub fn take_requests(&mut self) -> Vec<HudRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> HudSnapshot {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HudSnapshot> {
        self.published.subscribe()
    }

    /// Run one frame
    pub fn tick(&mut self, now: FrameTime) {
        if self.shut_down {
            return;
        }
        let started = Instant::now();
        self.stats.ticks += 1;

        // Stage 1: Advance clock
        self.now = self.now.max(now);
        let now = self.now;

        // Stage 2: Drain inbox and bridge events
        self.drain_inbox(now);
        self.bridge.poll();
        self.sync_source();

        // Stage 3: Fire due tasks
        self.run_tasks(now);

        // Stage 4: Detection
        if self.detect(now) {
            // Stage 5: Ghost write
            if let Some(face) = &self.face {
                self.ring.push(SharedFace::clone(face));
            }

            // Stage 6: Gesture
            if let Some(swipe) = self.gesture.observe(self.hands.as_deref()) {
                self.stats.swipes += 1;
                self.visual.apply_swipe(swipe, now);
            }

            // Stage 7: Emotion
            let scores = self.face.as_deref().and_then(FaceFrame::blendshapes);
            if let Some(verdict) = self.emotion.evaluate(scores) {
                let change = self.visual.apply_override(&verdict, now);
                if !change.is_empty() {
                    self.stats.emotion_overrides += 1;
                    tracing::debug!(rule = verdict.rule.as_str(), "emotion override");
                }
            }
        }

        // Stage 8: Expire highlight
        self.visual.expire_highlight(now);

        // Stage 9: Audio
        let params = self
            .mapper
            .update(now, self.face.as_deref(), self.hands.as_deref());
        if let Some(engine) = self.audio.as_mut() {
            engine.update(params);
        }

        // Stage 10: Publish snapshot
        self.fps.frame(now);
        self.published.send_replace(self.build_snapshot());

        self.stats.last_tick_duration = started.elapsed();
    }

    fn drain_inbox(&mut self, now: FrameTime) {
        while let Ok(command) = self.inbox.try_recv() {
            tracing::trace!(command = command.name(), "hud command");
            self.handle_command(command, now);
        }
    }

    fn handle_command(&mut self, command: HudCommand, now: FrameTime) {
        match command {
            HudCommand::SelectFilter(filter) => {
                self.visual.set_filter(filter, ControlSource::User, now);
            }
            HudCommand::SelectModule(module) => {
                self.visual.set_module(module, ControlSource::User);
            }
            HudCommand::SwitchMode(mode) => self.switch_mode(mode),
            HudCommand::OpenBridge => self.open_bridge(),
            HudCommand::CloseBridge => self.close_bridge(),
            HudCommand::ReinitializeBridge => {
                if let Err(e) = self.bridge.reinitialize() {
                    tracing::warn!(reason = %e, "bridge reinitialization failed");
                }
            }
            HudCommand::ArmAudio => self.arm_audio(),
            HudCommand::DetectorLoaded { generation, result } => {
                if generation == self.frames.generation() {
                    self.frames.install(result);
                } else {
                    tracing::debug!(
                        generation,
                        current = self.source_generation,
                        "stale model load discarded"
                    );
                    if let Ok(mut detector) = result {
                        detector.close();
                    }
                }
            }
            HudCommand::CameraAcquired { generation, result } => self.on_camera(generation, result),
        }
    }

    fn switch_mode(&mut self, mode: SourceMode) {
        if mode == self.mode {
            if mode == SourceMode::Remote {
                self.open_bridge();
            }
            return;
        }
        tracing::info!(from = self.mode.as_str(), to = mode.as_str(), "source mode switched");
        self.mode = mode;
        match mode {
            SourceMode::Remote => self.open_bridge(),
            SourceMode::Local => {
                if let Err(e) = self.bridge.close(false) {
                    tracing::debug!(reason = %e, "bridge close reported an error");
                }
            }
        }
    }

    fn open_bridge(&mut self) {
        if let Err(e) = self.bridge.start() {
            tracing::warn!(reason = %e, "bridge failed to start");
        }
    }

    fn close_bridge(&mut self) {
        if let Err(e) = self.bridge.close(false) {
            tracing::debug!(reason = %e, "bridge close reported an error");
        }
        if self.mode == SourceMode::Remote {
            tracing::info!("bridge closed, falling back to local camera");
            self.mode = SourceMode::Local;
        }
    }

    fn arm_audio(&mut self) {
        match self.audio.as_mut() {
            Some(engine) => {
                if let Err(e) = engine.arm() {
                    tracing::warn!(reason = %e, "audio could not start");
                }
            }
            None => tracing::debug!("no audio sink attached"),
        }
    }

    fn on_camera(&mut self, generation: u64, result: Result<MediaStream, CaptureError>) {
        let current = generation == self.source_generation
            && self.source == ActiveSource::Camera
            && self.camera.is_none();
        match result {
            Ok(stream) if current => {
                tracing::info!(stream = %stream.id(), "local camera acquired");
                self.video.attach(Some(stream.share()));
                self.camera = Some(stream);
                self.camera_error = None;
            }
            Ok(stream) => {
                tracing::debug!(generation, stream = %stream.id(), "stale camera released");
                stream.stop();
            }
            Err(e) if current => {
                tracing::warn!(reason = %e, "local camera unavailable");
                self.camera_error = Some(e.to_string());
            }
            Err(e) => tracing::debug!(generation, reason = %e, "stale camera failure ignored"),
        }
    }

    /// Rebuild the video source when the effective source changed
    fn sync_source(&mut self) {
        let desired = match (self.mode, self.bridge.remote_stream()) {
            (SourceMode::Remote, Some(stream)) => ActiveSource::Remote(stream),
            _ => ActiveSource::Camera,
        };
        if desired != self.source {
            self.switch_source(desired);
        }
    }

    fn switch_source(&mut self, source: ActiveSource) {
        // The old detector must be gone before its video is
        self.frames.teardown();
        if let Some(camera) = self.camera.take() {
            tracing::debug!(stream = %camera.id(), "local camera released");
            camera.stop();
        }
        self.video.attach(None);
        self.camera_error = None;
        self.face = None;
        self.hands = None;
        self.face_seen = false;
        self.gesture.reset();
        self.ring.clear();
        self.ghost.reset();

        self.source_generation += 1;
        let generation = self.source_generation;
        self.frames = FrameScheduler::new(generation, self.config.detection_interval);
        self.requests.push(HudRequest::LoadDetector { generation });
        match &source {
            ActiveSource::Camera => self.requests.push(HudRequest::AcquireCamera {
                generation,
                constraints: self.config.capture.viewer,
            }),
            ActiveSource::Remote(stream) => self.video.attach(Some(stream.clone())),
        }
        self.stats.source_rebuilds += 1;
        tracing::info!(generation, source = source.as_str(), "video source rebuilt");
        self.source = source;
    }

    fn run_tasks(&mut self, now: FrameTime) {
        for task in self.tasks.poll(now) {
            match task {
                HudTask::GhostPlayback => {
                    if self.ring.is_playable() {
                        self.ghost.step(&self.ring);
                        self.stats.ghost_samples += 1;
                    }
                }
                HudTask::Analysis => {
                    let line = self.analysis.step();
                    tracing::trace!(line, "analysis feed");
                }
            }
        }
    }

    /// Returns true if a detection ran this tick
    fn detect(&mut self, now: FrameTime) -> bool {
        match self.frames.tick(self.video.as_mut(), now) {
            TickOutcome::Detected(detection) => {
                self.stats.detections += 1;
                self.face = detection.face.map(FaceFrame::into_shared);
                self.hands = detection.hands.map(HandFrame::into_shared);
                self.face_seen |= self.face.is_some();
                true
            }
            TickOutcome::NotReady => {
                self.stats.skipped_ticks += 1;
                false
            }
            TickOutcome::NoDetector | TickOutcome::Throttled | TickOutcome::Stopped => false,
        }
    }

    fn build_snapshot(&self) -> HudSnapshot {
        let filter = self.visual.filter();
        let module = self.visual.module();
        HudSnapshot {
            at: self.now,
            mode: self.mode,
            face: self.face.clone(),
            hands: self.hands.clone(),
            filter,
            module,
            style: FilterStyle::for_filter(filter),
            directive: RenderDirective::build(module, self.face.as_deref()),
            ghost: ghost_for(filter, self.ghost.current()),
            highlight: self.visual.highlight_active(self.now),
            fps: self.fps.fps(),
            analysis: self.analysis.lines(),
            detection: self.frames.status().clone(),
            idle: !self.face_seen,
            bridge: self.bridge.status(),
            peer_id: self.bridge.local_id().cloned(),
            camera_error: self.camera_error.clone(),
            audio: self.mapper.current(),
        }
    }

    /// Release every device, model and session. Further ticks do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.tasks.cancel_all();
        self.frames.teardown();
        if let Some(camera) = self.camera.take() {
            camera.stop();
        }
        self.video.attach(None);
        if let Err(e) = self.bridge.close(false) {
            tracing::debug!(reason = %e, "bridge close reported an error");
        }
        if let Some(engine) = self.audio.as_mut() {
            engine.dispose();
        }
        self.inbox.close();
        tracing::info!(
            ticks = self.stats.ticks,
            detections = self.stats.detections,
            "hud runtime shut down"
        );
    }
}

impl Drop for HudRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for HudRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HudRuntime")
            .field("now", &self.now)
            .field("mode", &self.mode)
            .field("source", &self.source.as_str())
            .field("generation", &self.source_generation)
            .field("filter", &self.visual.filter())
            .field("module", &self.visual.module())
            .field("detection", self.frames.status())
            .field("bridge", &self.bridge.status())
            .finish()
    }
}
