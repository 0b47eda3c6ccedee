//! In-memory rendezvous network
//!
//! Stands in for the signalling server and the media path between peers.
//! Every `LoopbackTransport` handed out by one `LoopbackNetwork` can reach
//! the others by id. Events are posted synchronously into the receiving
//! peer's queue and show up on its next poll.
//!
//! Fault injection:
//! - Registration refused (posted error) or rendezvous unreachable (sync error)
//! - Calls that fail instead of ringing
//! - Peer-level errors and disconnects
//! - Calls dropped by the network

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use aether_core::{
    AetherError, AetherResult, CallId, MediaStream, PeerId, StreamView, TrackKind,
};
use aether_transport::{EventSender, IceConfig, PeerTransport, TransportEvent};

/// Network behavior
#[derive(Debug, Clone, Default)]
pub struct LoopbackConfig {
    /// Post `CallAccepted` to the caller when the callee answers
    pub acknowledge_calls: bool,
    /// Refuse every registration with this reason (posted as `Error`)
    pub refuse_registration: Option<String>,
    /// `register` itself fails, as if the service cannot be reached
    pub unreachable: bool,
    /// Every call fails with this reason (posted as `CallError`)
    pub fail_calls: Option<String>,
}

#[derive(Debug)]
struct PeerSlot {
    events: EventSender,
}

#[derive(Debug)]
struct CallRecord {
    caller: PeerId,
    callee: PeerId,
    /// Caller's media, mirrored to the callee on answer
    offer: StreamView,
    answered: bool,
}

impl CallRecord {
    fn other(&self, id: &PeerId) -> &PeerId {
        if &self.caller == id {
            &self.callee
        } else {
            &self.caller
        }
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    config: LoopbackConfig,
    peers: HashMap<PeerId, PeerSlot>,
    calls: HashMap<CallId, CallRecord>,
    next_call: u64,
    delivered: u64,
    data_messages: u64,
}

impl NetworkState {
    fn post(&mut self, to: &PeerId, event: TransportEvent) -> bool {
        let Some(peer) = self.peers.get(to) else {
            tracing::trace!(peer_id = %to, event = event.name(), "no such peer, event dropped");
            return false;
        };
        let name = event.name();
        if peer.events.send(event) {
            self.delivered += 1;
            tracing::trace!(peer_id = %to, event = name, "event delivered");
            true
        } else {
            false
        }
    }

    fn close_call(&mut self, call: CallId, notify: &[PeerId]) {
        if self.calls.remove(&call).is_none() {
            return;
        }
        for peer in notify {
            self.post(peer, TransportEvent::CallClosed(call));
        }
    }
}

/// Shared rendezvous registry
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoopbackConfig) -> Self {
        let network = Self::new();
        network.state.lock().config = config;
        network
    }

    pub fn configure(&self, f: impl FnOnce(&mut LoopbackConfig)) {
        f(&mut self.state.lock().config);
    }

    /// New transport endpoint on this network
    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport {
            network: self.clone(),
            id: None,
        }
    }

    pub fn is_registered(&self, id: &PeerId) -> bool {
        self.state.lock().peers.contains_key(id)
    }

    pub fn peer_count(&self) -> usize {
        self.state.lock().peers.len()
    }

    /// Calls not yet closed
    pub fn open_calls(&self) -> Vec<CallId> {
        let mut calls: Vec<CallId> = self.state.lock().calls.keys().copied().collect();
        calls.sort_by_key(|c| c.0);
        calls
    }

    pub fn is_answered(&self, call: CallId) -> bool {
        self.state
            .lock()
            .calls
            .get(&call)
            .is_some_and(|record| record.answered)
    }

    /// Events delivered so far
    pub fn delivered(&self) -> u64 {
        self.state.lock().delivered
    }

    pub fn data_messages(&self) -> u64 {
        self.state.lock().data_messages
    }

    /// Peer-level error at `id`
    pub fn inject_error(&self, id: &PeerId, message: &str) -> bool {
        self.state
            .lock()
            .post(id, TransportEvent::Error(message.to_string()))
    }

    /// `id` loses the rendezvous service. Its calls stay up.
    pub fn disconnect(&self, id: &PeerId) -> bool {
        let mut state = self.state.lock();
        let delivered = state.post(id, TransportEvent::Disconnected);
        state.peers.remove(id);
        delivered
    }

    /// The network drops `call`; both ends see it close
    pub fn drop_call(&self, call: CallId) {
        let mut state = self.state.lock();
        let Some(record) = state.calls.get(&call) else {
            return;
        };
        let ends = [record.caller.clone(), record.callee.clone()];
        state.close_call(call, &ends);
    }

    /// Call-level failure reported to both ends
    pub fn fail_call(&self, call: CallId, message: &str) {
        let mut state = self.state.lock();
        let Some(record) = state.calls.get(&call) else {
            return;
        };
        let ends = [record.caller.clone(), record.callee.clone()];
        for end in &ends {
            state.post(
                end,
                TransportEvent::CallError {
                    call,
                    message: message.to_string(),
                },
            );
        }
    }
}

/// One peer's endpoint on a `LoopbackNetwork`
#[derive(Debug)]
pub struct LoopbackTransport {
    network: LoopbackNetwork,
    id: Option<PeerId>,
}

impl LoopbackTransport {
    /// Id registered by this endpoint
    pub fn id(&self) -> Option<&PeerId> {
        self.id.as_ref()
    }

    fn local(&self) -> AetherResult<&PeerId> {
        self.id
            .as_ref()
            .ok_or_else(|| AetherError::Transport("not registered".into()))
    }
}

impl PeerTransport for LoopbackTransport {
    fn register(&mut self, id: &PeerId, _ice: &IceConfig, events: EventSender) -> AetherResult<()> {
        let mut state = self.network.state.lock();
        if state.config.unreachable {
            return Err(AetherError::Registration("rendezvous service unreachable".into()));
        }
        if let Some(previous) = self.id.take() {
            state.peers.remove(&previous);
        }

        let refusal = match &state.config.refuse_registration {
            Some(reason) => Some(reason.clone()),
            None if state.peers.contains_key(id) => Some(format!("ID \"{}\" is taken", id)),
            None => None,
        };
        if let Some(reason) = refusal {
            // Reported asynchronously, like a real signalling server
            events.send(TransportEvent::Error(reason));
            return Ok(());
        }

        state.peers.insert(id.clone(), PeerSlot { events });
        self.id = Some(id.clone());
        state.post(id, TransportEvent::Open(id.clone()));
        tracing::debug!(peer_id = %id, "loopback peer registered");
        Ok(())
    }

    fn answer(&mut self, call: CallId, local: StreamView) -> AetherResult<()> {
        let me = self.local()?.clone();
        let mut state = self.network.state.lock();
        let (caller, tracks) = match state.calls.get_mut(&call) {
            Some(record) if record.callee == me => {
                record.answered = true;
                (record.caller.clone(), record.offer.video_tracks())
            }
            _ => return Err(AetherError::Transport(format!("no call {:?} to answer", call))),
        };

        // Caller's media arrives at the callee as a fresh remote stream
        let remote = MediaStream::new(vec![TrackKind::Video; tracks]);
        state.post(&me, TransportEvent::Stream { call, stream: remote });

        // Our answer only produces a stream event if it carries media
        if local.video_tracks() > 0 {
            let back = MediaStream::new(vec![TrackKind::Video; local.video_tracks()]);
            state.post(&caller, TransportEvent::Stream { call, stream: back });
        }
        if state.config.acknowledge_calls {
            state.post(&caller, TransportEvent::CallAccepted(call));
        }
        Ok(())
    }

    fn call(&mut self, target: &PeerId, local: StreamView) -> AetherResult<CallId> {
        let me = self.local()?.clone();
        let mut state = self.network.state.lock();
        state.next_call += 1;
        let call = CallId::new(state.next_call);

        if let Some(reason) = state.config.fail_calls.clone() {
            state.post(&me, TransportEvent::CallError { call, message: reason });
            return Ok(call);
        }
        if !state.peers.contains_key(target) {
            let message = format!("Could not connect to peer {}", target);
            state.post(&me, TransportEvent::Error(message));
            return Ok(call);
        }

        state.calls.insert(
            call,
            CallRecord {
                caller: me.clone(),
                callee: target.clone(),
                offer: local,
                answered: false,
            },
        );
        state.post(target, TransportEvent::IncomingCall { call, from: Some(me) });
        Ok(call)
    }

    fn send(&mut self, target: &PeerId, payload: String) -> AetherResult<()> {
        let me = self.local()?.clone();
        let mut state = self.network.state.lock();
        if !state.peers.contains_key(target) {
            return Err(AetherError::Transport(format!("peer {} not reachable", target)));
        }
        state.data_messages += 1;
        state.post(target, TransportEvent::Data { from: Some(me), payload });
        Ok(())
    }

    fn close_call(&mut self, call: CallId) {
        let Some(me) = self.id.clone() else {
            return;
        };
        let mut state = self.network.state.lock();
        let other = match state.calls.get(&call) {
            Some(record) => record.other(&me).clone(),
            None => return,
        };
        state.close_call(call, &[other]);
    }

    fn destroy(&mut self) {
        let Some(me) = self.id.take() else {
            return;
        };
        let mut state = self.network.state.lock();
        state.peers.remove(&me);
        let mine: Vec<(CallId, PeerId)> = state
            .calls
            .iter()
            .filter(|(_, record)| record.caller == me || record.callee == me)
            .map(|(call, record)| (*call, record.other(&me).clone()))
            .collect();
        for (call, other) in mine {
            state.close_call(call, &[other]);
        }
        tracing::debug!(peer_id = %me, "loopback peer destroyed");
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.destroy();
    }
}
