//! End-to-end harness
//!
//! Drives a `HudRuntime` on a manual clock and fulfils its camera and
//! model requests inline, so whole scenarios run without an executor:
//! - Local tracking from scripted detections
//! - Remote mode over the loopback network
//! - Sender sessions calling into a viewer

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use aether_core::{AetherResult, CallId, CaptureError, FrameTime};
use aether_runtime::{
    HudCommand, HudConfig, HudInbox, HudRequest, HudRuntime, HudSnapshot, StreamVideo,
};
use aether_transport::{GoLiveError, JoinLink, LivePolicy, SenderSession, SenderState};

use crate::{FakeCamera, LoopbackNetwork, LoopbackTransport, ScriptedDetector, ScriptedLoader};

/// Origin used for join links in scenarios
pub const TEST_ORIGIN: &str = "https://hud.test";

// ============================================================================
// HUD HARNESS
// ============================================================================

/// A HUD runtime with every capability replaced by a double
pub struct HudHarness {
    runtime: HudRuntime,
    inbox: HudInbox,
    camera: FakeCamera,
    loader: ScriptedLoader,
    network: LoopbackNetwork,
    now: FrameTime,
    step: Duration,
    /// Requests served so far, in order
    served: Vec<HudRequest>,
}

impl HudHarness {
    /// Harness on a fresh network with default configuration
    pub fn new(seed: u64) -> AetherResult<Self> {
        Self::with_config(HudConfig::default(), LoopbackNetwork::new(), seed)
    }

    pub fn with_config(
        config: HudConfig,
        network: LoopbackNetwork,
        seed: u64,
    ) -> AetherResult<Self> {
        let step = config.tick_interval;
        let runtime = HudRuntime::with_rng(
            config,
            Box::new(network.transport()),
            Box::new(StreamVideo::new()),
            StdRng::seed_from_u64(seed),
        )?;
        let inbox = runtime.inbox();
        Ok(HudHarness {
            runtime,
            inbox,
            camera: FakeCamera::new(),
            loader: ScriptedLoader::new(ScriptedDetector::new()),
            network,
            now: FrameTime::ZERO,
            step,
            served: Vec::new(),
        })
    }

    pub fn runtime(&self) -> &HudRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut HudRuntime {
        &mut self.runtime
    }

    pub fn camera(&self) -> &FakeCamera {
        &self.camera
    }

    pub fn loader(&self) -> &ScriptedLoader {
        &self.loader
    }

    /// Detector shared by every model load
    pub fn detector(&self) -> &ScriptedDetector {
        self.loader.detector()
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    pub fn now(&self) -> FrameTime {
        self.now
    }

    pub fn served(&self) -> &[HudRequest] {
        &self.served
    }

    pub fn snapshot(&self) -> HudSnapshot {
        self.runtime.snapshot()
    }

    /// Post a user command; it applies on the next tick
    pub fn send(&self, command: HudCommand) -> bool {
        self.inbox.send(command)
    }

    /// Fulfil every pending request immediately
    pub fn serve(&mut self) -> usize {
        let requests = self.runtime.take_requests();
        let count = requests.len();
        for request in requests {
            self.served.push(request);
            let command = match request {
                HudRequest::LoadDetector { generation } => HudCommand::DetectorLoaded {
                    generation,
                    result: self.loader.load_now(),
                },
                HudRequest::AcquireCamera {
                    generation,
                    constraints,
                } => HudCommand::CameraAcquired {
                    generation,
                    result: self.camera.open(constraints),
                },
            };
            self.inbox.send(command);
        }
        count
    }

    /// Take the pending requests without answering them
    pub fn withhold(&mut self) -> Vec<HudRequest> {
        self.runtime.take_requests()
    }

    /// Serve pending requests, advance one tick interval and tick
    pub fn step(&mut self) -> HudSnapshot {
        self.serve();
        self.now = self.now + self.step;
        self.runtime.tick(self.now);
        self.runtime.snapshot()
    }

    pub fn run(&mut self, ticks: usize) -> HudSnapshot {
        for _ in 0..ticks {
            self.step();
        }
        self.runtime.snapshot()
    }

    /// Step until at least `duration` of frame time has passed
    pub fn run_for(&mut self, duration: Duration) -> HudSnapshot {
        let until = self.now + duration;
        while self.now < until {
            self.step();
        }
        self.runtime.snapshot()
    }

    /// Step until `done` holds, up to `max_ticks`
    pub fn run_until(
        &mut self,
        max_ticks: usize,
        mut done: impl FnMut(&HudSnapshot) -> bool,
    ) -> Option<HudSnapshot> {
        for _ in 0..max_ticks {
            let snapshot = self.step();
            if done(&snapshot) {
                return Some(snapshot);
            }
        }
        None
    }

    /// Make every future camera acquisition fail
    pub fn fail_camera(&self, error: CaptureError) {
        self.camera.fail_with(Some(error));
    }

    /// Make every future model load fail
    pub fn fail_model(&self, reason: &str) {
        self.loader.fail_with(Some(reason));
    }
}

// ============================================================================
// SENDER PEER
// ============================================================================

/// A sender session on the loopback network with its own camera
pub struct SenderPeer {
    session: SenderSession<LoopbackTransport>,
    camera: FakeCamera,
}

impl SenderPeer {
    pub fn new(network: &LoopbackNetwork, policy: LivePolicy, seed: u64) -> Self {
        Self::with_camera(network, policy, seed, FakeCamera::new())
    }

    pub fn with_camera(
        network: &LoopbackNetwork,
        policy: LivePolicy,
        seed: u64,
        camera: FakeCamera,
    ) -> Self {
        let session = SenderSession::with_rng(
            network.transport(),
            Default::default(),
            policy,
            StdRng::seed_from_u64(seed),
        );
        SenderPeer { session, camera }
    }

    pub fn session(&self) -> &SenderSession<LoopbackTransport> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SenderSession<LoopbackTransport> {
        &mut self.session
    }

    pub fn camera(&self) -> &FakeCamera {
        &self.camera
    }

    pub fn state(&self) -> &SenderState {
        self.session.state()
    }

    /// Acquire the camera and register, then poll once so `Open` lands
    pub async fn initialize(&mut self, now: FrameTime) -> AetherResult<()> {
        self.session.initialize(&mut self.camera).await?;
        self.session.poll(now);
        Ok(())
    }

    /// Call the viewer behind `link`, as opened from a join link
    pub fn join(&mut self, link: &str, now: FrameTime) -> Result<CallId, GoLiveError> {
        let target = JoinLink::parse(link)?.into_id();
        self.session.go_live(Some(&target), now)
    }

    pub fn poll(&mut self, now: FrameTime) -> bool {
        self.session.poll(now)
    }
}
