//! Peer transport capability and its event channel
//!
//! Transport operations only begin work. Their completions (registration,
//! incoming calls, remote streams, errors) are posted as `TransportEvent`s
//! into a single-consumer queue that the owning state machine drains once
//! per tick. Each session gets a fresh generation; events posted by an
//! older session are discarded on drain.

use tokio::sync::mpsc;

use aether_core::{AetherError, AetherResult, CallId, MediaStream, PeerId, StreamView};

use crate::IceConfig;

/// Asynchronous completion posted by a transport
#[derive(Debug)]
pub enum TransportEvent {
    /// Registered with the rendezvous service under this id
    Open(PeerId),
    /// Remote peer offers a call
    IncomingCall { call: CallId, from: Option<PeerId> },
    /// Remote media arrived on a call
    Stream { call: CallId, stream: MediaStream },
    /// Remote side acknowledged an outbound call
    CallAccepted(CallId),
    CallClosed(CallId),
    CallError { call: CallId, message: String },
    /// Data channel payload
    Data { from: Option<PeerId>, payload: String },
    /// Peer-level failure
    Error(String),
    /// Lost the rendezvous service. Established media may continue.
    Disconnected,
}

impl TransportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Open(_) => "open",
            TransportEvent::IncomingCall { .. } => "incoming_call",
            TransportEvent::Stream { .. } => "stream",
            TransportEvent::CallAccepted(_) => "call_accepted",
            TransportEvent::CallClosed(_) => "call_closed",
            TransportEvent::CallError { .. } => "call_error",
            TransportEvent::Data { .. } => "data",
            TransportEvent::Error(_) => "error",
            TransportEvent::Disconnected => "disconnected",
        }
    }
}

/// Event tagged with the session generation that produced it
#[derive(Debug)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Posting side handed to a transport for one session
#[derive(Debug, Clone)]
pub struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    /// Post an event. Returns false once the owner is gone.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Single-consumer event queue owned by a bridge
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    generation: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        EventQueue { tx, rx, generation: 0 }
    }

    /// Start a new session generation and return its sender
    pub fn next_generation(&mut self) -> EventSender {
        self.generation += 1;
        EventSender {
            generation: self.generation,
            tx: self.tx.clone(),
        }
    }

    /// End the current generation without starting a session. Anything the
    /// old session still posts is discarded.
    pub fn retire(&mut self) {
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Take every pending event of the current generation
    pub fn drain(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(SessionEvent { generation, event }) = self.rx.try_recv() {
            if generation != self.generation {
                tracing::debug!(
                    generation,
                    current = self.generation,
                    event = event.name(),
                    "stale transport event discarded"
                );
                continue;
            }
            events.push(event);
        }
        events
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify a failed `register` call as a registration error
pub(crate) fn registration_error(e: AetherError) -> AetherError {
    match e {
        AetherError::Registration(_) => e,
        other => AetherError::Registration(other.to_string()),
    }
}

/// Rendezvous, calls and data channel, provided by the platform.
///
/// Methods start work and return immediately. Anything that completes
/// later is reported through the `EventSender` given to `register`.
pub trait PeerTransport: Send {
    /// Register with the rendezvous service under `id`.
    /// Completes with `Open` or `Error`.
    fn register(&mut self, id: &PeerId, ice: &IceConfig, events: EventSender) -> AetherResult<()>;

    /// Answer an incoming call with `local` media
    fn answer(&mut self, call: CallId, local: StreamView) -> AetherResult<()>;

    /// Call `target`, sending `local` media
    fn call(&mut self, target: &PeerId, local: StreamView) -> AetherResult<CallId>;

    /// Best-effort data channel message
    fn send(&mut self, target: &PeerId, payload: String) -> AetherResult<()>;

    fn close_call(&mut self, call: CallId);

    /// Leave the rendezvous service and close every call
    fn destroy(&mut self);
}

impl<T: PeerTransport + ?Sized> PeerTransport for Box<T> {
    fn register(&mut self, id: &PeerId, ice: &IceConfig, events: EventSender) -> AetherResult<()> {
        (**self).register(id, ice, events)
    }

    fn answer(&mut self, call: CallId, local: StreamView) -> AetherResult<()> {
        (**self).answer(call, local)
    }

    fn call(&mut self, target: &PeerId, local: StreamView) -> AetherResult<CallId> {
        (**self).call(target, local)
    }

    fn send(&mut self, target: &PeerId, payload: String) -> AetherResult<()> {
        (**self).send(target, payload)
    }

    fn close_call(&mut self, call: CallId) {
        (**self).close_call(call)
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}
