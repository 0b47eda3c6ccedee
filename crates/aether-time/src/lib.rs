//! AETHER Time - explicit timing primitives for the HUD tick loop
//!
//! Every recurring side effect in the HUD (ghost playback, FPS counting,
//! the analysis feed, highlight pulses) is an explicit scheduled task with
//! a cancellation handle, collected and cancelled at teardown.
//!
//! - FrameClock: monotonic frame timeline, clamped against stalls
//! - TaskScheduler: one-shot and periodic tasks with handles
//! - Pulse: self-clearing flag with cancel-and-restart semantics
//! - FpsMeter: rendered frames per one-second window

pub mod clock;
pub mod fps;
pub mod pulse;
pub mod scheduler;

pub use clock::*;
pub use fps::*;
pub use pulse::*;
pub use scheduler::*;
