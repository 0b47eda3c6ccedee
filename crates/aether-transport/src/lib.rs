//! AETHER Transport - Peer bridge between the HUD and a mobile camera
//!
//! This crate provides:
//! - The peer transport capability (rendezvous, calls, data channel)
//! - ICE server configuration (public STUN only, no TURN relay)
//! - Join links and the debug data channel codec
//! - The viewer bridge and sender session state machines
//!
//! Signaling and ICE negotiation live behind `PeerTransport`. The state
//! machines here only track session lifecycle, classify errors and hand the
//! received media stream off to the HUD.

pub mod event;
pub mod ice;
pub mod link;
pub mod message;
pub mod sender;
pub mod session;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use event::*;
pub use ice::*;
pub use link::*;
pub use message::*;
pub use sender::*;
pub use session::*;
pub use viewer::*;
