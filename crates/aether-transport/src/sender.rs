//! Sender session - the phone side of the bridge
//!
//! ```text
//! Initializing ──camera + open──> Ready(id) ──go_live──> Connecting ──> Live
//!      │                            ^                        │           │
//!      ├─ camera fails ─> Error     └─────── call closed ────┴───────────┘
//!      └─ network fails ─> Error          disconnected ─> Offline
//! ```
//!
//! Calls are not always acknowledged by the transport within a bounded
//! time. `LivePolicy` chooses between presuming success after a grace
//! period and waiting for an explicit acknowledgment.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use aether_core::{
    AetherError, AetherResult, CallId, CaptureConstraints, CaptureDevice, FrameTime, MediaStream,
    PeerId, StreamView,
};

use crate::{
    registration_error, DataMessage, EventQueue, IceConfig, PeerTransport, SessionLog,
    TransportEvent,
};

/// Default optimistic grace period
pub const DEFAULT_LIVE_GRACE: Duration = Duration::from_millis(500);

/// When a placed call counts as live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePolicy {
    /// Live after `grace` unless the call failed first
    Optimistic { grace: Duration },
    /// Live only once the transport acknowledges the call
    Acknowledged,
}

impl Default for LivePolicy {
    fn default() -> Self {
        LivePolicy::Optimistic {
            grace: DEFAULT_LIVE_GRACE,
        }
    }
}

/// Which capability failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderFault {
    Camera,
    Network,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SenderState {
    Initializing,
    Ready(PeerId),
    Connecting {
        local: PeerId,
        target: PeerId,
        call: CallId,
        since: FrameTime,
    },
    Live {
        local: PeerId,
        target: PeerId,
        call: CallId,
    },
    Error {
        fault: SenderFault,
        reason: String,
    },
    /// Lost the rendezvous service. `initialize` may be called again.
    Offline,
}

impl SenderState {
    /// Status line shown on the sender screen
    pub fn display(&self) -> &'static str {
        match self {
            SenderState::Initializing => "Init...",
            SenderState::Ready(_) => "READY",
            SenderState::Connecting { .. } => "CONNECTING...",
            SenderState::Live { .. } => "LIVE",
            SenderState::Error {
                fault: SenderFault::Camera,
                ..
            } => "CAM ERROR",
            SenderState::Error {
                fault: SenderFault::Network,
                ..
            } => "NET ERROR",
            SenderState::Offline => "OFFLINE",
        }
    }

    fn call(&self) -> Option<CallId> {
        match self {
            SenderState::Connecting { call, .. } | SenderState::Live { call, .. } => Some(*call),
            _ => None,
        }
    }

    fn local(&self) -> Option<&PeerId> {
        match self {
            SenderState::Ready(local)
            | SenderState::Connecting { local, .. }
            | SenderState::Live { local, .. } => Some(local),
            _ => None,
        }
    }
}

/// Why `go_live` was refused
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GoLiveError {
    #[error("No target peer")]
    NoTarget,

    #[error("Not ready")]
    NotReady,

    #[error("Stream Inactive!")]
    StreamInactive,

    #[error(transparent)]
    Transport(#[from] AetherError),
}

pub struct SenderSession<T: PeerTransport> {
    transport: T,
    ice: IceConfig,
    constraints: CaptureConstraints,
    policy: LivePolicy,
    queue: EventQueue,
    rng: StdRng,
    state: SenderState,
    registered: bool,
    camera: Option<MediaStream>,
    log: SessionLog,
}

impl<T: PeerTransport> SenderSession<T> {
    pub fn new(transport: T, ice: IceConfig, policy: LivePolicy) -> Self {
        Self::with_rng(transport, ice, policy, StdRng::from_entropy())
    }

    pub fn with_rng(transport: T, ice: IceConfig, policy: LivePolicy, rng: StdRng) -> Self {
        SenderSession {
            transport,
            ice,
            constraints: CaptureConstraints::sender(),
            policy,
            queue: EventQueue::new(),
            rng,
            state: SenderState::Initializing,
            registered: false,
            camera: None,
            log: SessionLog::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn state(&self) -> &SenderState {
        &self.state
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn policy(&self) -> LivePolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.state.local()
    }

    /// Local camera preview
    pub fn local_stream(&self) -> Option<StreamView> {
        self.camera.as_ref().map(MediaStream::share)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, SenderState::Live { .. })
    }

    /// Acquire the camera (unless still active), then register for
    /// rendezvous. Ignored while a session is up.
    pub async fn initialize<C: CaptureDevice>(&mut self, camera: &mut C) -> AetherResult<()> {
        if matches!(
            self.state,
            SenderState::Ready(_) | SenderState::Connecting { .. } | SenderState::Live { .. }
        ) {
            return Ok(());
        }
        self.teardown_transport();
        self.set_state(SenderState::Initializing);
        self.log.push("Starting Init...");

        let camera_active = self.camera.as_ref().is_some_and(MediaStream::is_active);
        if !camera_active {
            self.log.push(format!(
                "Req Camera ({}x{})...",
                self.constraints.width, self.constraints.height
            ));
            match camera.acquire(self.constraints).await {
                Ok(stream) => {
                    self.log.push(format!("Cam Acquired: {}", stream.id()));
                    self.camera = Some(stream);
                }
                Err(e) => {
                    self.log.push(format!("Cam FAIL: {}", e));
                    self.set_state(SenderState::Error {
                        fault: SenderFault::Camera,
                        reason: e.to_string(),
                    });
                    return Err(e.into());
                }
            }
        }

        self.log.push("Init transport...");
        let id = PeerId::generate_with(&mut self.rng);
        let events = self.queue.next_generation();
        match self.transport.register(&id, &self.ice, events) {
            Ok(()) => {
                self.registered = true;
                Ok(())
            }
            Err(e) => {
                let e = registration_error(e);
                self.log.push(format!("Peer Err: {}", e));
                self.set_state(SenderState::Error {
                    fault: SenderFault::Network,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Call `target` with the camera stream
    pub fn go_live(
        &mut self,
        target: Option<&PeerId>,
        now: FrameTime,
    ) -> Result<CallId, GoLiveError> {
        let Some(target) = target else {
            self.log.push("No target id");
            return Err(GoLiveError::NoTarget);
        };
        let Some(local) = self.ready_id() else {
            self.log.push(format!("Not ready ({})", self.state.display()));
            return Err(GoLiveError::NotReady);
        };
        let stream = match &self.camera {
            Some(stream) if stream.is_active() => stream.share(),
            _ => {
                self.log.push("Stream Inactive!");
                return Err(GoLiveError::StreamInactive);
            }
        };

        self.log.push(format!("Calling {}...", target));
        match self.transport.call(target, stream) {
            Ok(call) => {
                self.set_state(SenderState::Connecting {
                    local,
                    target: target.clone(),
                    call,
                    since: now,
                });
                Ok(call)
            }
            Err(e) => {
                self.log.push(format!("Call Err: {}", e));
                self.fail_network(e.to_string());
                Err(GoLiveError::Transport(e))
            }
        }
    }

    fn ready_id(&self) -> Option<PeerId> {
        match &self.state {
            SenderState::Ready(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Drain transport completions and apply the live policy.
    /// Returns true if the state changed.
    pub fn poll(&mut self, now: FrameTime) -> bool {
        let before = self.state.clone();
        let generation = self.queue.generation();
        for event in self.queue.drain() {
            if self.queue.generation() != generation {
                continue;
            }
            self.handle(event);
        }

        let grace_elapsed = match (&self.state, self.policy) {
            (SenderState::Connecting { since, .. }, LivePolicy::Optimistic { grace }) => {
                now >= *since + grace
            }
            _ => false,
        };
        if grace_elapsed {
            self.promote();
        }
        self.state != before
    }

    fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open(id) => {
                if self.state == SenderState::Initializing {
                    self.log.push(format!("Peer Ready: {}", id));
                    self.set_state(SenderState::Ready(id));
                }
            }
            TransportEvent::Error(message) => {
                self.log.push(format!("Peer Err: {}", message));
                if !matches!(self.state, SenderState::Error { .. } | SenderState::Offline) {
                    self.fail_network(message);
                }
            }
            TransportEvent::Disconnected => {
                self.log.push("Peer Disconnected");
                self.teardown_transport();
                self.set_state(SenderState::Offline);
            }
            TransportEvent::CallAccepted(call) | TransportEvent::Stream { call, .. } => {
                if self.state.call() == Some(call) {
                    self.promote();
                }
            }
            TransportEvent::CallClosed(call) => {
                if self.state.call() == Some(call) {
                    self.log.push("Call Closed");
                    self.back_to_ready();
                }
            }
            TransportEvent::CallError { call, message } => {
                self.log.push(format!("Call Err: {}", message));
                // Without a grace period a failed call would never resolve
                let waiting_for_ack = matches!(self.state, SenderState::Connecting { .. })
                    && self.policy == LivePolicy::Acknowledged;
                if waiting_for_ack && self.state.call() == Some(call) {
                    self.fail_network(message);
                }
            }
            TransportEvent::IncomingCall { call, .. } => self.transport.close_call(call),
            TransportEvent::Data { .. } => {}
        }
    }

    fn promote(&mut self) {
        if let SenderState::Connecting {
            local,
            target,
            call,
            ..
        } = &self.state
        {
            let live = SenderState::Live {
                local: local.clone(),
                target: target.clone(),
                call: *call,
            };
            self.log.push("Signal Live");
            self.set_state(live);
        }
    }

    fn back_to_ready(&mut self) {
        if let Some(local) = self.state.local().cloned() {
            self.set_state(SenderState::Ready(local));
        }
    }

    /// End the current call, keeping the session
    pub fn hang_up(&mut self) -> bool {
        let Some(call) = self.state.call() else {
            return false;
        };
        self.transport.close_call(call);
        self.log.push("Call Closed");
        self.back_to_ready();
        true
    }

    /// Send a still frame over the data channel while live
    pub fn send_debug_frame(&mut self, image: &str) -> AetherResult<()> {
        let SenderState::Live { target, .. } = &self.state else {
            return Err(AetherError::SessionClosed);
        };
        let target = target.clone();
        let payload = DataMessage::frame(image).encode()?;
        self.transport.send(&target, payload)
    }

    /// Leave rendezvous and release the camera
    pub fn shutdown(&mut self) {
        self.teardown_transport();
        if let Some(stream) = self.camera.take() {
            stream.stop();
        }
        self.set_state(SenderState::Offline);
    }

    fn fail_network(&mut self, message: String) {
        let reason = if message.trim().is_empty() {
            crate::DEFAULT_ERROR_REASON.to_string()
        } else {
            message
        };
        self.teardown_transport();
        self.set_state(SenderState::Error {
            fault: SenderFault::Network,
            reason,
        });
    }

    fn teardown_transport(&mut self) {
        if self.registered {
            self.transport.destroy();
            self.registered = false;
        }
        self.queue.retire();
    }

    fn set_state(&mut self, next: SenderState) {
        if self.state == next {
            return;
        }
        tracing::debug!(from = self.state.display(), to = next.display(), "sender transition");
        self.state = next;
    }
}

impl<T: PeerTransport> Drop for SenderSession<T> {
    fn drop(&mut self) {
        self.teardown_transport();
    }
}
