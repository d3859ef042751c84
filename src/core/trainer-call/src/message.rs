//! Payloads exchanged with the voice SDK and the start endpoint.

use serde::{Deserialize, Serialize};

/// Assistant configuration returned by the start endpoint.
///
/// Opaque to this crate; handed to the SDK as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssistantConfig(pub serde_json::Value);

/// Who is speaking in a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The trainee.
    User,
    /// The AI roleplay partner.
    Assistant,
    /// Anything else the SDK reports.
    #[serde(other)]
    Other,
}

/// Whether a transcript is still being refined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// Interim hypothesis.
    Partial,
    /// Settled text.
    Final,
}

/// A message delivered through the SDK's `message` callback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SdkMessage {
    /// Speech-to-text output.
    Transcript {
        /// Speaker.
        role: Speaker,
        /// Partial or final.
        #[serde(rename = "transcriptType")]
        transcript_type: TranscriptKind,
        /// Recognised text.
        transcript: String,
    },
    /// Any other message type; ignored.
    #[serde(other)]
    Other,
}

/// The transcript line shown on the call page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    /// Speaker.
    pub role: Speaker,
    /// Text.
    pub text: String,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_final_transcript() {
        let raw = r#"{"type":"transcript","role":"assistant","transcriptType":"final","transcript":"Hello, how can I help?"}"#;
        let message: SdkMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            message,
            SdkMessage::Transcript {
                role: Speaker::Assistant,
                transcript_type: TranscriptKind::Final,
                transcript: "Hello, how can I help?".to_string(),
            }
        );
    }

    #[test]
    fn test_other_message_types() {
        let raw = r#"{"type":"speech-update","status":"started","role":"assistant"}"#;
        let message: SdkMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message, SdkMessage::Other);
    }
}
