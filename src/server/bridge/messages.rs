//! Wire messages for both sides of the bridge
//!
//! Both providers multiplex JSON control frames over their WebSocket. The
//! discriminators (`event` on the telephony side, `type` on the agent side)
//! are modeled as tagged enums so message handling is exhaustive; frames with
//! discriminators we do not know fall into the catch-all variant and are
//! ignored, keeping the bridge forward compatible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============== Telephony media stream (inbound) ==============

/// A frame received from the telephony media stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyMessage {
    Start {
        start: StartPayload,
    },
    Media {
        media: MediaPayload,
    },
    Stop {
        #[serde(default)]
        stop: Option<StopPayload>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct StartPayload {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Call context passed through by the dialer: client name, invoice
    /// number, amount, due date.
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64 μ-law 8kHz mono audio.
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct StopPayload {
    #[serde(rename = "callSid")]
    pub call_sid: Option<String>,
}

// ============== Telephony media stream (outbound) ==============

/// Audio frame played back to the phone caller.
#[derive(Debug, Serialize)]
pub struct TelephonyMediaFrame<'a> {
    pub event: &'static str,
    #[serde(rename = "streamSid")]
    pub stream_sid: &'a str,
    pub media: TelephonyMediaPayload,
}

#[derive(Debug, Serialize)]
pub struct TelephonyMediaPayload {
    pub payload: String,
}

impl<'a> TelephonyMediaFrame<'a> {
    pub fn new(stream_sid: &'a str, payload: String) -> Self {
        Self {
            event: "media",
            stream_sid,
            media: TelephonyMediaPayload { payload },
        }
    }
}

// ============== Agent socket (inbound) ==============

/// A frame received from the voice agent.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Audio {
        audio_event: AudioEvent,
    },
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    AgentResponse {
        agent_response_event: AgentResponseEvent,
    },
    ClientToolCall {
        client_tool_call: ToolCall,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct AudioEvent {
    /// Base64 audio chunk in the agent's output format.
    pub audio_base_64: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiationMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Format the agent will emit audio in, e.g. "ulaw_8000" or "pcm_16000".
    #[serde(default)]
    pub agent_output_audio_format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentResponseEvent {
    pub agent_response: String,
}

/// A structured tool invocation emitted by the agent mid-conversation.
#[derive(Debug, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

// ============== Agent socket (outbound) ==============

/// Caller audio forwarded to the agent.
#[derive(Debug, Serialize)]
pub struct UserAudioChunk {
    pub user_audio_chunk: String,
}

/// The single reply owed for every recognized tool call.
#[derive(Debug, Serialize)]
pub struct ClientToolResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tool_call_id: String,
    pub result: String,
    pub is_error: bool,
}

impl ClientToolResult {
    pub fn new(tool_call_id: String, result: String, is_error: bool) -> Self {
        Self {
            kind: "client_tool_result",
            tool_call_id,
            result,
            is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_frame() {
        let json = r#"{
            "event": "start",
            "start": {
                "streamSid": "MZ1234",
                "customParameters": {
                    "client_name": "Acme GmbH",
                    "invoice_number": "INV-2041",
                    "amount": "450.00",
                    "due_date": "2025-11-30"
                }
            }
        }"#;
        match serde_json::from_str::<TelephonyMessage>(json).unwrap() {
            TelephonyMessage::Start { start } => {
                assert_eq!(start.stream_sid, "MZ1234");
                assert_eq!(
                    start.custom_parameters.get("invoice_number").unwrap(),
                    "INV-2041"
                );
            }
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_media_and_stop_frames() {
        let media = r#"{"event":"media","media":{"payload":"//8A"}}"#;
        assert!(matches!(
            serde_json::from_str::<TelephonyMessage>(media).unwrap(),
            TelephonyMessage::Media { .. }
        ));

        // `stop` carries a payload we mostly ignore; it must still parse.
        let stop = r#"{"event":"stop","stop":{"callSid":"CA99","accountSid":"AC1"}}"#;
        assert!(matches!(
            serde_json::from_str::<TelephonyMessage>(stop).unwrap(),
            TelephonyMessage::Stop { .. }
        ));
    }

    #[test]
    fn test_unknown_telephony_event_is_tolerated() {
        let json = r#"{"event":"mark","mark":{"name":"checkpoint"}}"#;
        assert!(matches!(
            serde_json::from_str::<TelephonyMessage>(json).unwrap(),
            TelephonyMessage::Unknown
        ));
    }

    #[test]
    fn test_parse_agent_frames() {
        let audio = r#"{"type":"audio","audio_event":{"audio_base_64":"AAAA","event_id":7}}"#;
        assert!(matches!(
            serde_json::from_str::<AgentMessage>(audio).unwrap(),
            AgentMessage::Audio { .. }
        ));

        let metadata = r#"{
            "type": "conversation_initiation_metadata",
            "conversation_initiation_metadata_event": {
                "conversation_id": "conv_1",
                "agent_output_audio_format": "ulaw_8000"
            }
        }"#;
        match serde_json::from_str::<AgentMessage>(metadata).unwrap() {
            AgentMessage::ConversationInitiationMetadata {
                conversation_initiation_metadata_event: event,
            } => assert_eq!(event.agent_output_audio_format.as_deref(), Some("ulaw_8000")),
            other => panic!("expected metadata, got {:?}", other),
        }

        let tool_call = r#"{
            "type": "client_tool_call",
            "client_tool_call": {
                "tool_name": "collect_payment",
                "tool_call_id": "tc_42",
                "parameters": {"invoice_number": "INV-2041"}
            }
        }"#;
        match serde_json::from_str::<AgentMessage>(tool_call).unwrap() {
            AgentMessage::ClientToolCall { client_tool_call } => {
                assert_eq!(client_tool_call.tool_name, "collect_payment");
                assert_eq!(client_tool_call.tool_call_id, "tc_42");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_agent_type_is_tolerated() {
        let json = r#"{"type":"interruption","interruption_event":{"event_id":3}}"#;
        assert!(matches!(
            serde_json::from_str::<AgentMessage>(json).unwrap(),
            AgentMessage::Unknown
        ));
    }

    #[test]
    fn test_outbound_media_frame_shape() {
        let frame = TelephonyMediaFrame::new("MZ1234", "base64audio".to_string());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "media",
                "streamSid": "MZ1234",
                "media": {"payload": "base64audio"}
            })
        );
    }

    #[test]
    fn test_tool_result_frame_shape() {
        let result = ClientToolResult::new("tc_42".to_string(), "Payment ok".to_string(), false);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "client_tool_result",
                "tool_call_id": "tc_42",
                "result": "Payment ok",
                "is_error": false
            })
        );
    }

    #[test]
    fn test_user_audio_chunk_shape() {
        let chunk = UserAudioChunk {
            user_audio_chunk: "AAAA".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&chunk).unwrap(),
            r#"{"user_audio_chunk":"AAAA"}"#
        );
    }
}
