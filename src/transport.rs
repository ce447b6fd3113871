//! The seam between the orchestrator and the remote agent.

use crate::events::{AudioChunk, InboundEvent, ToolResult, VideoFrame};
use crate::gemini::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything the remote side needs to start a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    pub function_declarations: Vec<Value>,
    pub enable_maps: bool,
    pub thinking_budget: Option<u32>,
}

/// An open realtime channel.
///
/// Sends never block on the remote agent's processing, only on the socket.
/// `close` is idempotent and no events are delivered after it returns.
#[async_trait]
pub trait Session: Send + Sync {
    async fn send_audio(&self, chunk: &AudioChunk) -> Result<()>;

    async fn send_image(&self, frame: &VideoFrame) -> Result<()>;

    async fn send_tool_result(&self, result: &ToolResult) -> Result<()>;

    async fn close(&self);
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session. A successful return is the "open" notification; every
    /// later message, close and error arrives on `events` in delivery order.
    async fn open(
        &self,
        setup: &SessionSetup,
        events: mpsc::UnboundedSender<InboundEvent>,
    ) -> Result<Arc<dyn Session>>;
}
