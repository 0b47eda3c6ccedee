//! AETHER Visual State
//!
//! Turns noisy, variable-rate landmark frames into discrete HUD state.
//!
//! # Pipeline
//!
//! ```text
//! FaceFrame ──┬─> GhostRing ──> GhostPlayback (50ms timer) ──> ghost frame
//!             └─> EmotionRuleEngine ──┐
//! HandFrame ────> GestureEdgeDetector ┴─> VisualStateMachine ──> RenderDirective
//! ```
//!
//! The state machine holds exactly one filter and one module at all times.
//! Rendering reads it through the exhaustive directives in `render`.

pub mod emotion;
pub mod ghost;
pub mod gesture;
pub mod render;
pub mod state;

pub use emotion::*;
pub use ghost::*;
pub use gesture::*;
pub use render::*;
pub use state::*;
