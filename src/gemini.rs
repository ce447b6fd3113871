//! Gemini Live API wire types
//!
//! Client and server messages exchanged over the BidiGenerateContent
//! websocket, plus the conversion of server messages into [`InboundEvent`]s.

use crate::events::{InboundEvent, ToolCall, ToolCallBatch, ToolResult};
use base64::engine::general_purpose;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{debug, warn};

pub const LIVE_ENDPOINT: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

pub const AUDIO_INPUT_MIME: &str = "audio/pcm;rate=16000";
pub const IMAGE_INPUT_MIME: &str = "image/jpeg";

/// Generation configuration for setup.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

/// Inline media payload, base64 encoded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

/// Session setup message.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BidiGenerateContentSetup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<Value>,
}

/// A chunk of realtime input (audio or video)
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

impl From<&ToolResult> for ToolResponse {
    fn from(result: &ToolResult) -> Self {
        Self {
            function_responses: vec![FunctionResponse {
                id: result.id.clone(),
                name: result.name.clone(),
                response: serde_json::json!({ "result": result.result }),
            }],
        }
    }
}

/// Message sent from client to server.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(BidiGenerateContentSetup),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallMessage {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// Server -> client message. Exactly one field is normally present.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCallMessage>,
    #[serde(default)]
    pub go_away: Option<Value>,
}

impl ServerMessage {
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Flattens the message into events in processing order: tool calls,
    /// audio, interruption, input transcript, output transcript.
    pub fn into_events(self) -> Vec<InboundEvent> {
        let mut events = Vec::new();

        if let Some(tool_call) = self.tool_call {
            let batch: ToolCallBatch = tool_call
                .function_calls
                .into_iter()
                .map(|fc| ToolCall {
                    id: fc.id,
                    name: fc.name,
                    args: fc.args,
                })
                .collect();
            if !batch.is_empty() {
                events.push(InboundEvent::ToolCallBatch(batch));
            }
        }

        if let Some(go_away) = self.go_away {
            warn!("Server will disconnect soon: {}", go_away);
        }

        let Some(content) = self.server_content else {
            return events;
        };

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                let Some(blob) = part.inline_data else {
                    if let Some(text) = part.text {
                        debug!("Ignoring model text part: {}", text);
                    }
                    continue;
                };
                match general_purpose::STANDARD.decode(blob.data.as_bytes()) {
                    Ok(pcm) => events.push(InboundEvent::AudioOutputChunk(pcm)),
                    Err(e) => warn!("Dropping undecodable inline data: {}", e),
                }
            }
        }

        if content.interrupted {
            events.push(InboundEvent::Interrupted);
        }

        if let Some(t) = content.input_transcription {
            events.push(InboundEvent::InputTranscript(t.text));
        }

        if let Some(t) = content.output_transcription {
            events.push(InboundEvent::OutputTranscript {
                text: t.text,
                turn_complete: content.turn_complete,
            });
        }

        events
    }
}

/// Error type for Gemini API operations
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Setup not complete")]
    SetupNotComplete,

    #[error("Timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, GeminiError>;
