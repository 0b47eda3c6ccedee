//! Viewer bridge - receives a remote camera for the HUD
//!
//! ```text
//! Initializing ──open──> Waiting(id) ──call + video──> Connected(stream)
//!      │                     │                            │
//!      └──────── error ──────┴────────── error ───────────┴──> Error(reason)
//! ```
//!
//! `Error` is left only through `reinitialize`. Closing a connected session
//! (either side) starts a fresh attempt under a new id. The bridge is the
//! only owner of the remote stream; the HUD gets a read-only view.

use rand::rngs::StdRng;
use rand::SeedableRng;

use aether_core::{AetherResult, CallId, ErrorKind, MediaStream, PeerId, StreamView};

use crate::{
    forward_debug_frame, registration_error, DebugPreviewSink, EventQueue, IceConfig, JoinLink,
    PeerTransport, TransportEvent,
};

/// Reason shown when a transport error carries no message
pub const DEFAULT_ERROR_REASON: &str = "Connection failed";

/// Viewer lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    Initializing,
    Waiting(PeerId),
    Connected {
        local: PeerId,
        call: CallId,
        stream: StreamView,
    },
    Error {
        kind: ErrorKind,
        reason: String,
    },
}

impl ViewerState {
    pub fn status(&self) -> BridgeStatus {
        match self {
            ViewerState::Initializing => BridgeStatus::Initializing,
            ViewerState::Waiting(_) => BridgeStatus::Waiting,
            ViewerState::Connected { .. } => BridgeStatus::Connected,
            ViewerState::Error { .. } => BridgeStatus::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ViewerState::Error { .. })
    }
}

/// Coarse bridge status for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeStatus {
    Initializing,
    Waiting,
    Connected,
    Error,
}

impl BridgeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeStatus::Initializing => "initializing",
            BridgeStatus::Waiting => "waiting",
            BridgeStatus::Connected => "connected",
            BridgeStatus::Error => "error",
        }
    }
}

pub struct ViewerBridge<T: PeerTransport> {
    transport: T,
    ice: IceConfig,
    queue: EventQueue,
    rng: StdRng,
    state: ViewerState,
    /// Id registration was requested under
    pending_id: Option<PeerId>,
    registered: bool,
    /// Answering call and the empty stream it was answered with
    pending_call: Option<CallId>,
    placeholder: Option<MediaStream>,
    remote: Option<MediaStream>,
    preview: Option<Box<dyn DebugPreviewSink>>,
    transitions: u64,
}

impl<T: PeerTransport> ViewerBridge<T> {
    pub fn new(transport: T, ice: IceConfig) -> Self {
        Self::with_rng(transport, ice, StdRng::from_entropy())
    }

    /// Deterministic ids
    pub fn with_rng(transport: T, ice: IceConfig, rng: StdRng) -> Self {
        ViewerBridge {
            transport,
            ice,
            queue: EventQueue::new(),
            rng,
            state: ViewerState::Initializing,
            pending_id: None,
            registered: false,
            pending_call: None,
            placeholder: None,
            remote: None,
            preview: None,
            transitions: 0,
        }
    }

    pub fn set_preview_sink(&mut self, sink: Box<dyn DebugPreviewSink>) {
        self.preview = Some(sink);
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn status(&self) -> BridgeStatus {
        self.state.status()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registration in flight or completed
    pub fn is_started(&self) -> bool {
        self.registered
    }

    /// Shareable id, once registered
    pub fn local_id(&self) -> Option<&PeerId> {
        match &self.state {
            ViewerState::Waiting(id) => Some(id),
            ViewerState::Connected { local, .. } => Some(local),
            _ => None,
        }
    }

    /// Join link for the sender, available while waiting
    pub fn join_link(&self, origin: &str) -> Option<JoinLink> {
        match &self.state {
            ViewerState::Waiting(id) => Some(JoinLink::new(origin, id.clone())),
            _ => None,
        }
    }

    /// Remote video, while connected
    pub fn remote_stream(&self) -> Option<StreamView> {
        match &self.state {
            ViewerState::Connected { stream, .. } => Some(stream.clone()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ViewerState::Connected { .. })
    }

    /// Session generation; bumps on every start and teardown
    pub fn generation(&self) -> u64 {
        self.queue.generation()
    }

    /// Number of state changes so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Generate an id and request rendezvous. No-op once started.
    pub fn start(&mut self) -> AetherResult<()> {
        if self.registered || self.state != ViewerState::Initializing {
            return Ok(());
        }
        let id = PeerId::generate_with(&mut self.rng);
        let events = self.queue.next_generation();
        tracing::info!(peer_id = %id, generation = events.generation(), "viewer registering");

        match self.transport.register(&id, &self.ice, events) {
            Ok(()) => {
                self.registered = true;
                self.pending_id = Some(id);
                Ok(())
            }
            Err(e) => {
                let e = registration_error(e);
                self.fail(ErrorKind::Registration, e.to_string());
                Err(e)
            }
        }
    }

    /// Drain transport completions. Returns true if the state changed.
    pub fn poll(&mut self) -> bool {
        let before = self.transitions;
        let generation = self.queue.generation();
        for event in self.queue.drain() {
            // A restart or failure mid-drain makes the rest stale
            if self.queue.generation() != generation || self.state.is_error() {
                tracing::debug!(event = event.name(), "event dropped after session change");
                continue;
            }
            self.handle(event);
        }
        self.transitions != before
    }

    fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open(id) => self.on_open(id),
            TransportEvent::IncomingCall { call, from } => self.on_incoming_call(call, from),
            TransportEvent::Stream { call, stream } => self.on_stream(call, stream),
            TransportEvent::CallAccepted(_) => {}
            TransportEvent::CallClosed(call) => self.on_call_closed(call),
            TransportEvent::CallError { call, message } => {
                if self.owns_call(call) {
                    self.fail(ErrorKind::Transport, reason_or_default(message));
                }
            }
            TransportEvent::Data { payload, .. } => {
                if matches!(
                    self.state,
                    ViewerState::Waiting(_) | ViewerState::Connected { .. }
                ) {
                    forward_debug_frame(&payload, self.preview.as_deref_mut());
                }
            }
            TransportEvent::Error(message) => {
                let kind = match self.state {
                    ViewerState::Initializing => ErrorKind::Registration,
                    _ => ErrorKind::Transport,
                };
                self.fail(kind, reason_or_default(message));
            }
            TransportEvent::Disconnected => match self.state {
                ViewerState::Connected { .. } => {
                    tracing::warn!("rendezvous lost, media link kept");
                }
                _ => self.fail(ErrorKind::Transport, "Disconnected from rendezvous".into()),
            },
        }
    }

    fn on_open(&mut self, id: PeerId) {
        if self.state != ViewerState::Initializing {
            return;
        }
        if self.pending_id.as_ref() != Some(&id) {
            tracing::debug!(peer_id = %id, "registered under a different id than requested");
        }
        self.pending_id = None;
        self.set_state(ViewerState::Waiting(id));
    }

    fn on_incoming_call(&mut self, call: CallId, from: Option<PeerId>) {
        match self.state {
            ViewerState::Waiting(_) => {
                // Viewer sends nothing back
                let local = self
                    .placeholder
                    .get_or_insert_with(MediaStream::placeholder)
                    .share();
                if let Some(previous) = self.pending_call.replace(call) {
                    self.transport.close_call(previous);
                }
                tracing::info!(?call, from = ?from, "answering call");
                if let Err(e) = self.transport.answer(call, local) {
                    self.fail(ErrorKind::Transport, e.to_string());
                }
            }
            ViewerState::Connected { .. } => {
                tracing::warn!(?call, from = ?from, "second call rejected");
                self.transport.close_call(call);
            }
            _ => self.transport.close_call(call),
        }
    }

    fn on_stream(&mut self, call: CallId, stream: MediaStream) {
        let local = match &self.state {
            ViewerState::Waiting(id) if self.pending_call == Some(call) => id.clone(),
            _ => {
                tracing::debug!(?call, "stream for unknown call ignored");
                return;
            }
        };
        if !stream.has_video() {
            tracing::debug!(?call, stream = %stream.id(), "stream without video ignored");
            return;
        }
        let view = stream.share();
        tracing::info!(?call, stream = %stream.id(), "remote stream connected");
        self.pending_call = None;
        self.remote = Some(stream);
        self.set_state(ViewerState::Connected {
            local,
            call,
            stream: view,
        });
    }

    fn on_call_closed(&mut self, call: CallId) {
        match self.state {
            ViewerState::Connected { call: active, .. } if active == call => {
                tracing::info!(?call, "remote closed the call");
                if let Err(e) = self.close(true) {
                    tracing::debug!(reason = %e, "restart after hang-up failed");
                }
            }
            ViewerState::Waiting(_) if self.pending_call == Some(call) => {
                self.pending_call = None;
            }
            _ => {}
        }
    }

    fn owns_call(&self, call: CallId) -> bool {
        match self.state {
            ViewerState::Connected { call: active, .. } => active == call,
            _ => self.pending_call == Some(call),
        }
    }

    /// Tear the session down. With `restart`, a new session under a new id
    /// begins immediately. In `Error` only the teardown happens; use
    /// `reinitialize` to leave it.
    pub fn close(&mut self, restart: bool) -> AetherResult<()> {
        self.teardown();
        if self.state.is_error() {
            return Ok(());
        }
        self.set_state(ViewerState::Initializing);
        if restart {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Manual restart, the only way out of `Error`
    pub fn reinitialize(&mut self) -> AetherResult<()> {
        self.teardown();
        tracing::info!("viewer reinitializing");
        self.set_state(ViewerState::Initializing);
        self.start()
    }

    fn fail(&mut self, kind: ErrorKind, reason: String) {
        tracing::warn!(?kind, %reason, "viewer bridge failed");
        self.teardown();
        self.set_state(ViewerState::Error { kind, reason });
    }

    fn teardown(&mut self) {
        if self.registered {
            self.transport.destroy();
            self.registered = false;
        }
        self.queue.retire();
        self.pending_id = None;
        self.pending_call = None;
        self.placeholder = None;
        if let Some(stream) = self.remote.take() {
            tracing::debug!(stream = %stream.id(), "remote stream stopped");
            stream.stop();
        }
    }

    fn set_state(&mut self, next: ViewerState) {
        if self.state == next {
            return;
        }
        tracing::debug!(
            from = self.state.status().as_str(),
            to = next.status().as_str(),
            "viewer transition"
        );
        self.state = next;
        self.transitions += 1;
    }
}

impl<T: PeerTransport> Drop for ViewerBridge<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn reason_or_default(message: String) -> String {
    if message.trim().is_empty() {
        DEFAULT_ERROR_REASON.to_string()
    } else {
        message
    }
}
