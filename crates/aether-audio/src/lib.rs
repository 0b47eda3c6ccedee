//! AETHER Audio - Spatial audio from tracked position
//!
//! A single oscillator follows the primary tracked point:
//! - horizontal position drives frequency (left is high, right is low)
//! - presence of any face or hand drives gain
//!
//! Both values approach their targets exponentially so the output never
//! jumps. The `AudioEngine` owns the output sink and its lifetime.

pub mod engine;
pub mod mapper;

pub use engine::*;
pub use mapper::*;
