//! Capture capability - the camera, provided by the platform

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, MediaStream};

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Requested capture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: FacingMode,
    pub audio: bool,
}

impl CaptureConstraints {
    /// HUD camera
    pub const fn viewer() -> Self {
        CaptureConstraints {
            width: 1280,
            height: 720,
            facing: FacingMode::User,
            audio: false,
        }
    }

    /// Mobile sender camera
    pub const fn sender() -> Self {
        CaptureConstraints {
            width: 640,
            height: 480,
            facing: FacingMode::User,
            audio: false,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::viewer()
    }
}

/// Camera acquisition. The returned stream is owned by the caller, which
/// must stop it on teardown.
pub trait CaptureDevice: Send {
    fn acquire(
        &mut self,
        constraints: CaptureConstraints,
    ) -> impl Future<Output = Result<MediaStream, CaptureError>> + Send;
}
