//! Error types for the HUD
//!
//! Device and network failures are classified where they originate and then
//! surfaced as an `Error` state on the owning state machine. They never
//! propagate into the scheduling loop.

use thiserror::Error;

/// Capture device failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera device found")]
    NoDevice,

    #[error("Camera unavailable: {0}")]
    Unavailable(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Capture,
    Registration,
    Transport,
    DetectionInit,
    Protocol,
    Config,
}

/// Core HUD errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AetherError {
    // Device errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    // Peer errors
    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session closed")]
    SessionClosed,

    // Tracking errors
    #[error("Detection unavailable: {0}")]
    DetectionInit(String),

    // Protocol errors
    #[error("Invalid peer id: {0:?}")]
    InvalidPeerId(String),

    #[error("Invalid join link: {0}")]
    InvalidJoinLink(String),

    #[error("Malformed data message: {0}")]
    MalformedMessage(String),

    // Config errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AetherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AetherError::Capture(_) => ErrorKind::Capture,
            AetherError::Registration(_) => ErrorKind::Registration,
            AetherError::Transport(_) | AetherError::SessionClosed => ErrorKind::Transport,
            AetherError::DetectionInit(_) => ErrorKind::DetectionInit,
            AetherError::InvalidPeerId(_)
            | AetherError::InvalidJoinLink(_)
            | AetherError::MalformedMessage(_) => ErrorKind::Protocol,
            AetherError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Terminal errors park their role in `Error` until a manual restart.
    /// Detection failures only disable tracking.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Capture | ErrorKind::Registration | ErrorKind::Transport
        )
    }
}

/// Result type for HUD operations
pub type AetherResult<T> = Result<T, AetherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = AetherError::from(CaptureError::PermissionDenied);
        assert_eq!(err.kind(), ErrorKind::Capture);
        assert!(err.is_terminal());

        let err = AetherError::DetectionInit("model fetch failed".into());
        assert_eq!(err.kind(), ErrorKind::DetectionInit);
        assert!(!err.is_terminal());

        let err = AetherError::MalformedMessage("eof".into());
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_error_display() {
        let err = AetherError::Transport("Could not connect to peer abcde".into());
        assert_eq!(
            err.to_string(),
            "Transport error: Could not connect to peer abcde"
        );
    }
}
