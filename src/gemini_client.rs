//! Gemini Live websocket transport
//!
//! Opens the BidiGenerateContent socket, performs the setup handshake and
//! splits the connection: the write half is shared behind a mutex for the
//! session's senders, the read half is owned by a task that turns server
//! messages into [`InboundEvent`]s.

use crate::events::{AudioChunk, InboundEvent, ToolResult, VideoFrame};
use crate::gemini::{
    BidiGenerateContentSetup, Blob, ClientMessage, Content, GeminiError, GenerationConfig,
    RealtimeInput, Result, ServerMessage, SpeechConfig, ThinkingConfig, AUDIO_INPUT_MIME,
    IMAGE_INPUT_MIME, LIVE_ENDPOINT,
};
use crate::transport::{Session, SessionSetup, Transport};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

type WsConnection =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Type alias for the WebSocket split sink, wrapped in Arc<Mutex<>>
type WsSink = Arc<Mutex<futures_util::stream::SplitSink<WsConnection, Message>>>;

/// Type alias for the WebSocket split stream
type WsStream = futures_util::stream::SplitStream<WsConnection>;

/// [`Transport`] backed by the Gemini Live API.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    endpoint: String,
}

impl Default for GeminiTransport {
    fn default() -> Self {
        Self::new(LIVE_ENDPOINT)
    }
}

impl GeminiTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

/// Builds the setup frame for `setup`.
pub fn setup_message(setup: &SessionSetup) -> BidiGenerateContentSetup {
    let model = if setup.model.starts_with("models/") {
        setup.model.clone()
    } else {
        format!("models/{}", setup.model)
    };

    let mut tools = vec![json!({ "functionDeclarations": setup.function_declarations })];
    if setup.enable_maps {
        tools.push(json!({ "googleMaps": {} }));
    }

    BidiGenerateContentSetup {
        model,
        generation_config: Some(GenerationConfig {
            response_modalities: vec!["AUDIO".to_string()],
            speech_config: Some(SpeechConfig::prebuilt(setup.voice.clone())),
            thinking_config: setup
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        }),
        system_instruction: Some(Content::text(setup.system_instruction.clone())),
        tools,
        input_audio_transcription: Some(json!({})),
        output_audio_transcription: Some(json!({})),
    }
}

fn encode(msg: &ClientMessage) -> Result<Message> {
    let json = serde_json::to_string(msg)?;
    Ok(Message::text(json))
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn open(
        &self,
        setup: &SessionSetup,
        events: mpsc::UnboundedSender<InboundEvent>,
    ) -> Result<Arc<dyn Session>> {
        info!("Connecting to Gemini API at {}", self.endpoint);
        let url = format!("{}?key={}", self.endpoint, setup.api_key);

        let (ws_stream, resp) = connect_async(url).await?;
        debug!("WebSocket connection response: {:?}", resp.status());

        // Split the WebSocket into separate sink (write) and stream (read) halves
        let (mut sink, mut stream) = ws_stream.split();

        let wire = setup_message(setup);
        info!("Sending setup message with model: {}", wire.model);
        sink.send(encode(&ClientMessage::Setup(wire))?).await?;

        tokio::time::timeout(SETUP_TIMEOUT, wait_for_setup_complete(&mut stream))
            .await
            .map_err(|_| {
                error!("Timeout waiting for setup complete message");
                GeminiError::Timeout
            })??;
        info!("Gemini session setup complete");

        let reader = tokio::spawn(read_loop(stream, events));

        Ok(Arc::new(GeminiSession {
            sink: Arc::new(Mutex::new(sink)),
            closed: AtomicBool::new(false),
            reader: std::sync::Mutex::new(Some(reader)),
        }))
    }
}

/// Extracts the JSON text of a frame. Gemini sends JSON in binary frames too.
fn frame_text(message: &Message) -> Option<&str> {
    match message {
        Message::Text(text) => Some(text.as_str()),
        Message::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

async fn wait_for_setup_complete(stream: &mut WsStream) -> Result<()> {
    while let Some(message) = stream.next().await {
        let message = message?;
        if let Message::Close(frame) = &message {
            warn!("WebSocket closed during setup: {:?}", frame);
            return Err(GeminiError::ConnectionClosed);
        }
        let Some(text) = frame_text(&message) else {
            continue;
        };
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(msg) if msg.is_setup_complete() => return Ok(()),
            Ok(_) => debug!("Ignoring message received before setup completed"),
            Err(e) => {
                error!("Failed to parse server message: {:?}", e);
                return Err(GeminiError::SetupNotComplete);
            }
        }
    }
    Err(GeminiError::ConnectionClosed)
}

async fn read_loop(mut stream: WsStream, events: mpsc::UnboundedSender<InboundEvent>) {
    info!("Inbound message task started");

    let terminal = loop {
        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                error!("WebSocket error: {:?}", e);
                break InboundEvent::SessionError(e.to_string());
            }
            None => break InboundEvent::SessionClosed,
        };

        if let Message::Close(frame) = &message {
            info!("WebSocket closed: {:?}", frame);
            break InboundEvent::SessionClosed;
        }

        let Some(text) = frame_text(&message) else {
            continue;
        };
        let parsed = match serde_json::from_str::<ServerMessage>(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse server message: {:?}", e);
                debug!("Raw message: {}", text);
                continue;
            }
        };

        for event in parsed.into_events() {
            if events.send(event).is_err() {
                debug!("Event receiver dropped, stopping inbound task");
                return;
            }
        }
    };

    let _ = events.send(terminal);
    info!("Inbound message task terminated");
}

/// An open Gemini Live session.
pub struct GeminiSession {
    sink: WsSink,
    closed: AtomicBool,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl GeminiSession {
    async fn send(&self, msg: &ClientMessage) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GeminiError::ConnectionClosed);
        }
        let frame = encode(msg)?;
        let mut writer = self.sink.lock().await;
        writer.send(frame).await?;
        Ok(())
    }
}

#[async_trait]
impl Session for GeminiSession {
    async fn send_audio(&self, chunk: &AudioChunk) -> Result<()> {
        self.send(&ClientMessage::RealtimeInput(RealtimeInput {
            audio: Some(Blob::encode(AUDIO_INPUT_MIME, &chunk.pcm)),
            video: None,
        }))
        .await
    }

    async fn send_image(&self, frame: &VideoFrame) -> Result<()> {
        debug!(
            "Sending frame: {}x{} ({} bytes)",
            frame.width,
            frame.height,
            frame.jpeg.len()
        );
        self.send(&ClientMessage::RealtimeInput(RealtimeInput {
            audio: None,
            video: Some(Blob::encode(IMAGE_INPUT_MIME, &frame.jpeg)),
        }))
        .await
    }

    async fn send_tool_result(&self, result: &ToolResult) -> Result<()> {
        debug!("Sending tool response for {} ({})", result.name, result.id);
        self.send(&ClientMessage::ToolResponse(result.into())).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let reader = match self.reader.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(reader) = reader {
            reader.abort();
        }
        let mut writer = self.sink.lock().await;
        if let Err(e) = writer.close().await {
            debug!("Error while closing websocket: {}", e);
        }
        info!("Gemini session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(enable_maps: bool) -> SessionSetup {
        SessionSetup {
            api_key: "key".to_string(),
            model: "gemini-live-test".to_string(),
            voice: "Kore".to_string(),
            system_instruction: "Be brief.".to_string(),
            function_declarations: vec![json!({"name": "setReminder"})],
            enable_maps,
            thinking_budget: Some(1024),
        }
    }

    #[test]
    fn test_setup_message_prefixes_model_and_lists_tools() {
        let wire = setup_message(&setup(true));
        assert_eq!(wire.model, "models/gemini-live-test");
        assert_eq!(wire.tools.len(), 2);
        assert_eq!(wire.tools[0]["functionDeclarations"][0]["name"], "setReminder");
        assert!(wire.tools[1].get("googleMaps").is_some());
        assert!(wire.input_audio_transcription.is_some());
        assert!(wire.output_audio_transcription.is_some());
    }

    #[test]
    fn test_setup_message_without_maps() {
        let wire = setup_message(&setup(false));
        assert_eq!(wire.tools.len(), 1);
        let config = wire.generation_config.unwrap();
        assert_eq!(config.response_modalities, vec!["AUDIO".to_string()]);
        assert_eq!(config.thinking_config.unwrap().thinking_budget, 1024);
    }

    #[test]
    fn test_frame_text_accepts_binary_json() {
        let msg = Message::Binary(br#"{"setupComplete":{}}"#.to_vec().into());
        assert_eq!(frame_text(&msg), Some(r#"{"setupComplete":{}}"#));
        assert_eq!(frame_text(&Message::Ping(Vec::new().into())), None);
    }

    // To run this test, set the GEMINI_API_KEY environment variable
    #[tokio::test]
    async fn test_api_connection() {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) => key,
            Err(_) => {
                println!("GEMINI_API_KEY environment variable not set, skipping test");
                return;
            }
        };

        let mut setup = setup(false);
        setup.api_key = api_key;
        setup.model = crate::config::DEFAULT_MODEL.to_string();
        setup.function_declarations = crate::tools::catalog::function_declarations();

        let (tx, _rx) = mpsc::unbounded_channel();
        let session = GeminiTransport::default().open(&setup, tx).await;
        assert!(session.is_ok(), "Failed to open Gemini session: {:?}", session.err());
        session.unwrap().close().await;
    }
}
