use serde_json::Value;
use smallvec::SmallVec;

/// One capture buffer, encoded as PCM16LE mono at 16 kHz.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub pcm: Vec<u8>,
}

/// A downsampled camera frame encoded as JPEG.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A structured instruction issued by the remote agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// The answer to exactly one [`ToolCall`], correlated by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub result: Value,
}

pub type ToolCallBatch = SmallVec<[ToolCall; 4]>;

/// Everything the transport can deliver to the session, in receipt order.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    ToolCallBatch(ToolCallBatch),
    /// Raw PCM16LE mono at 24 kHz.
    AudioOutputChunk(Vec<u8>),
    Interrupted,
    InputTranscript(String),
    OutputTranscript { text: String, turn_complete: bool },
    SessionClosed,
    SessionError(String),
}
