//! AETHER HUD Test Harness - simulation and end-to-end validation
//!
//! This crate provides:
//! - In-memory signaling network with fault injection
//! - Deterministic camera, detector, oscillator and preview doubles
//! - Seeded synthetic face and hand tracking data
//! - A synchronous HUD harness that serves runtime requests inline

pub mod doubles;
pub mod integration;
pub mod loopback;
pub mod synthetic;

pub use doubles::*;
pub use integration::*;
pub use loopback::*;
pub use synthetic::*;
