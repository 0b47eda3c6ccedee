//! AETHER Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the HUD:
//! - Identifiers (PeerId, CallId, StreamId)
//! - Time primitives (FrameTime)
//! - Tracking data (Landmark, FaceFrame, HandFrame, blendshape scores)
//! - Visual control state (FilterState, ModuleState)
//! - Media stream handles with bridge-only ownership
//! - Capture capability (camera acquisition)
//! - Error taxonomy

pub mod capture;
pub mod error;
pub mod id;
pub mod landmark;
pub mod media;
pub mod mode;
pub mod time;

pub use capture::*;
pub use error::*;
pub use id::*;
pub use landmark::*;
pub use media::*;
pub use mode::*;
pub use time::*;
