//! AETHER HUD Runtime - frame scheduling and orchestration
//!
//! This crate ties the components together:
//! - Configuration with human-readable durations
//! - Tracing setup
//! - Detection capability and frame scheduler
//! - `HudRuntime`, the fixed-order per-frame tick
//! - Tokio driver that ticks the runtime and serves its async requests

pub mod analysis;
pub mod config;
pub mod detection;
pub mod driver;
pub mod hud;
pub mod observability;
pub mod scheduler;

pub use analysis::*;
pub use config::*;
pub use detection::*;
pub use driver::*;
pub use hud::*;
pub use observability::*;
pub use scheduler::*;
