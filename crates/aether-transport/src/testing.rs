//! Hand-driven transport for unit tests

use aether_core::{AetherError, AetherResult, CallId, PeerId, StreamView};

use crate::{EventSender, IceConfig, PeerTransport, TransportEvent};

#[derive(Default)]
pub struct ManualTransport {
    pub registered: Vec<PeerId>,
    pub events: Option<EventSender>,
    pub answered: Vec<(CallId, StreamView)>,
    pub calls: Vec<(PeerId, StreamView)>,
    pub sent: Vec<(PeerId, String)>,
    pub closed: Vec<CallId>,
    pub destroyed: usize,
    pub fail_register: Option<String>,
    pub fail_call: Option<String>,
    next_call: u64,
}

impl ManualTransport {
    /// Post an event as the current session
    pub fn post(&self, event: TransportEvent) {
        let sender = self.events.as_ref().expect("transport not registered");
        assert!(sender.send(event));
    }

    pub fn open(&self) {
        let id = self.registered.last().cloned().expect("no registration");
        self.post(TransportEvent::Open(id));
    }
}

impl PeerTransport for ManualTransport {
    fn register(&mut self, id: &PeerId, _ice: &IceConfig, events: EventSender) -> AetherResult<()> {
        if let Some(reason) = &self.fail_register {
            return Err(AetherError::Registration(reason.clone()));
        }
        self.registered.push(id.clone());
        self.events = Some(events);
        Ok(())
    }

    fn answer(&mut self, call: CallId, local: StreamView) -> AetherResult<()> {
        self.answered.push((call, local));
        Ok(())
    }

    fn call(&mut self, target: &PeerId, local: StreamView) -> AetherResult<CallId> {
        if let Some(reason) = &self.fail_call {
            return Err(AetherError::Transport(reason.clone()));
        }
        self.next_call += 1;
        self.calls.push((target.clone(), local));
        Ok(CallId::new(self.next_call))
    }

    fn send(&mut self, target: &PeerId, payload: String) -> AetherResult<()> {
        self.sent.push((target.clone(), payload));
        Ok(())
    }

    fn close_call(&mut self, call: CallId) {
        self.closed.push(call);
    }

    fn destroy(&mut self) {
        self.destroyed += 1;
    }
}
