//! Debug data channel messages
//!
//! Best-effort and unacknowledged. The only kind in use is a still frame
//! encoded as a data URI, shown in a small preview on the viewer.

use serde::{Deserialize, Serialize};

use aether_core::{AetherError, AetherResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataMessage {
    Frame {
        #[serde(default)]
        image: String,
    },
    /// Any other `type`. Ignored.
    #[serde(other)]
    Unknown,
}

impl DataMessage {
    pub fn frame(image: impl Into<String>) -> Self {
        DataMessage::Frame {
            image: image.into(),
        }
    }

    pub fn decode(payload: &str) -> AetherResult<Self> {
        serde_json::from_str(payload).map_err(|e| AetherError::MalformedMessage(e.to_string()))
    }

    pub fn encode(&self) -> AetherResult<String> {
        serde_json::to_string(self).map_err(|e| AetherError::MalformedMessage(e.to_string()))
    }

    /// Image worth previewing: a non-empty data URI
    pub fn preview_image(&self) -> Option<&str> {
        match self {
            DataMessage::Frame { image } if image.starts_with("data:") => Some(image),
            _ => None,
        }
    }
}

/// Receives debug frames. Failures are the sink's own business.
pub trait DebugPreviewSink: Send {
    fn show(&mut self, image: &str);
}

/// Decode a raw payload and hand any preview image to `sink`.
/// Returns true if an image was delivered.
pub fn forward_debug_frame<S>(payload: &str, sink: Option<&mut S>) -> bool
where
    S: DebugPreviewSink + ?Sized,
{
    let message = match DataMessage::decode(payload) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "data message dropped");
            return false;
        }
    };
    match (message.preview_image(), sink) {
        (Some(image), Some(sink)) => {
            sink.show(image);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Preview(Vec<String>);

    impl DebugPreviewSink for Preview {
        fn show(&mut self, image: &str) {
            self.0.push(image.to_string());
        }
    }

    #[test]
    fn test_wire_format() {
        let json = DataMessage::frame("data:image/jpeg;base64,AAAA").encode().unwrap();
        assert_eq!(json, r#"{"type":"frame","image":"data:image/jpeg;base64,AAAA"}"#);
    }

    #[test]
    fn test_unknown_type_ignored() {
        let msg = DataMessage::decode(r#"{"type":"telemetry","fps":30}"#).unwrap();
        assert_eq!(msg, DataMessage::Unknown);
        assert!(msg.preview_image().is_none());
    }

    #[test]
    fn test_forwarding_rules() {
        let mut preview = Preview::default();
        assert!(forward_debug_frame(
            r#"{"type":"frame","image":"data:image/png;base64,iVBO"}"#,
            Some(&mut preview)
        ));
        assert!(!forward_debug_frame(r#"{"type":"frame","image":""}"#, Some(&mut preview)));
        assert!(!forward_debug_frame(r#"{"type":"frame"}"#, Some(&mut preview)));
        assert!(!forward_debug_frame(
            r#"{"type":"frame","image":"https://x/y.png"}"#,
            Some(&mut preview)
        ));
        assert!(!forward_debug_frame("not json", Some(&mut preview)));
        assert_eq!(preview.0.len(), 1);
    }

    #[test]
    fn test_missing_sink_drops_silently() {
        assert!(!forward_debug_frame(
            r#"{"type":"frame","image":"data:image/png;base64,iVBO"}"#,
            None::<&mut Preview>
        ));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            DataMessage::decode("{"),
            Err(AetherError::MalformedMessage(_))
        ));
    }
}
