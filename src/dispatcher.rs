//! Consumes transport events for one session, in receipt order.

use crate::connection::ConnectionStateMachine;
use crate::events::{InboundEvent, ToolResult};
use crate::playback::scheduler::PlaybackScheduler;
use crate::tools::ToolRouter;
use crate::transport::Session;
use crate::ui::{LogKind, LogSender, UiPublisher};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    generation: u64,
    state: Arc<ConnectionStateMachine>,
    ui: UiPublisher,
    scheduler: PlaybackScheduler,
    router: Arc<ToolRouter>,
    results: mpsc::UnboundedSender<ToolResult>,
}

impl Dispatcher {
    pub fn new(
        generation: u64,
        state: Arc<ConnectionStateMachine>,
        ui: UiPublisher,
        scheduler: PlaybackScheduler,
        router: Arc<ToolRouter>,
        results: mpsc::UnboundedSender<ToolResult>,
    ) -> Self {
        Self {
            generation,
            state,
            ui,
            scheduler,
            router,
            results,
        }
    }

    /// Applies one event. Breaks once the session has ended.
    ///
    /// Within a message, tool results are queued before audio is scheduled,
    /// and audio is scheduled before an interruption flushes it.
    pub fn handle(&mut self, event: InboundEvent) -> ControlFlow<()> {
        match event {
            InboundEvent::ToolCallBatch(calls) => {
                for call in &calls {
                    let result = self.router.dispatch(call);
                    if self.results.send(result).is_err() {
                        warn!("Tool result for {} dropped, sender gone", call.id);
                    }
                }
            }
            InboundEvent::AudioOutputChunk(pcm) => self.scheduler.handle_chunk(&pcm),
            InboundEvent::Interrupted => {
                debug!("Model interrupted");
                self.scheduler.interrupt();
            }
            InboundEvent::InputTranscript(text) => {
                self.ui.log(LogSender::User, text, LogKind::Text);
            }
            InboundEvent::OutputTranscript { text, turn_complete } => {
                if turn_complete {
                    self.ui.log(LogSender::Agent, text, LogKind::Text);
                }
            }
            InboundEvent::SessionClosed => {
                if self.state.transport_closed(self.generation) {
                    self.ui.log(LogSender::System, "Connection closed", LogKind::Text);
                }
                return ControlFlow::Break(());
            }
            InboundEvent::SessionError(reason) => {
                warn!("Session error: {}", reason);
                if self.state.transport_error(self.generation) {
                    self.ui
                        .log(LogSender::System, "Connection error occurred", LogKind::Alert);
                }
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Drains `events` until the session ends or `token` is cancelled.
    ///
    /// A remote close or error cancels `token`, which stops the capture
    /// pipelines of this session.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<InboundEvent>, token: CancellationToken) {
        info!("Dispatcher started for session {}", self.generation);
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if self.handle(event).is_break() {
                token.cancel();
                break;
            }
        }
        self.scheduler.stop_all();
        info!("Dispatcher stopped for session {}", self.generation);
    }

    pub fn spawn(self, events: mpsc::UnboundedReceiver<InboundEvent>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(events, token))
    }
}

/// Forwards tool results to the session in the order they were produced.
pub fn spawn_result_sender(
    mut results: mpsc::UnboundedReceiver<ToolResult>,
    session: Arc<dyn Session>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = results.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
            };
            if let Err(e) = session.send_tool_result(&result).await {
                warn!("Failed to send tool result {}: {}", result.id, e);
            }
        }
        debug!("Tool result sender stopped");
    })
}
