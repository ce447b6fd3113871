//! Owns the connection lifecycle and the per-session pipelines.
//!
//! `connect` acquires the devices, opens the transport and starts every
//! session task under one [`CancellationToken`]. `teardown` cancels that
//! token, waits for the tasks and releases devices, playback and socket
//! together.

use crate::config::SessionConfig;
use crate::connection::{ConnectionState, ConnectionStateMachine};
use crate::dispatcher::{spawn_result_sender, Dispatcher};
use crate::error::{Error, Result};
use crate::events::InboundEvent;
use crate::media::audio::AudioCapture;
use crate::media::video::VideoSampler;
use crate::media::{MediaDevices, MediaToggles, MediaTrackHandle, MediaTracks};
use crate::outbox::{spawn_writer, Outbox};
use crate::playback::cue::{CuePlayer, SpatialCues};
use crate::playback::scheduler::PlaybackScheduler;
use crate::playback::{AudioSink, OUTPUT_SAMPLE_RATE};
use crate::store::{InMemoryStore, MedicationList, MemoryStore};
use crate::tools::{ToolContext, ToolRouter};
use crate::transport::{Session, Transport};
use crate::ui::{LogKind, LogSender, UiEvent, UiPublisher};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything that lives exactly as long as one session.
struct SessionContext {
    generation: u64,
    token: CancellationToken,
    session: Arc<dyn Session>,
    tracks: Arc<MediaTrackHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionContext {
    async fn shutdown(self) {
        debug!("Shutting down session {}", self.generation);
        self.token.cancel();
        self.tracks.stop();
        self.session.close().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        info!("Session {} released", self.generation);
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    devices: Arc<dyn MediaDevices>,
    sink: Arc<dyn AudioSink>,
    cues: Arc<dyn CuePlayer>,
    ui: UiPublisher,
    state: Arc<ConnectionStateMachine>,
    medications: MedicationList,
    memory: Arc<dyn MemoryStore>,
    toggles: MediaToggles,
    active: Mutex<Option<SessionContext>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let Some(ctx) = self.active.get_mut().take() else {
            return;
        };
        ctx.token.cancel();
        ctx.tracks.stop();
        self.state.reset();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let session = ctx.session.clone();
            handle.spawn(async move { session.close().await });
        }
    }
}

pub struct OrchestratorBuilder {
    transport: Arc<dyn Transport>,
    devices: Arc<dyn MediaDevices>,
    sink: Arc<dyn AudioSink>,
    cues: Option<Arc<dyn CuePlayer>>,
    cue_sample_rate: u32,
    ui: UiPublisher,
    medications: MedicationList,
    memory: Option<Arc<dyn MemoryStore>>,
    toggles: MediaToggles,
}

impl OrchestratorBuilder {
    pub fn new(transport: Arc<dyn Transport>, devices: Arc<dyn MediaDevices>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            transport,
            devices,
            sink,
            cues: None,
            cue_sample_rate: OUTPUT_SAMPLE_RATE,
            ui: UiPublisher::new(),
            medications: MedicationList::default(),
            memory: None,
            toggles: MediaToggles::new(true, true),
        }
    }

    pub fn ui(mut self, ui: UiPublisher) -> Self {
        self.ui = ui;
        self
    }

    pub fn medications(mut self, medications: MedicationList) -> Self {
        self.medications = medications;
        self
    }

    pub fn memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn toggles(mut self, toggles: MediaToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Sample rate the warning tone is rendered at.
    pub fn cue_sample_rate(mut self, sample_rate: u32) -> Self {
        self.cue_sample_rate = sample_rate;
        self
    }

    /// Replaces the default cue player that plays on the output sink.
    pub fn cues(mut self, cues: Arc<dyn CuePlayer>) -> Self {
        self.cues = Some(cues);
        self
    }

    pub fn build(self) -> Orchestrator {
        let cues = match self.cues {
            Some(cues) => cues,
            None => Arc::new(SpatialCues::new(self.sink.clone(), self.cue_sample_rate)),
        };
        let memory = match self.memory {
            Some(memory) => memory,
            None => Arc::new(InMemoryStore::default()),
        };
        Orchestrator {
            inner: Arc::new(Inner {
                transport: self.transport,
                devices: self.devices,
                sink: self.sink,
                cues,
                state: Arc::new(ConnectionStateMachine::new(self.ui.clone())),
                ui: self.ui,
                medications: self.medications,
                memory,
                toggles: self.toggles,
                active: Mutex::new(None),
            }),
        }
    }
}

/// Cheap, cloneable handle on the companion session.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn state(&self) -> ConnectionState {
        self.inner.state.current()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.inner.ui.subscribe()
    }

    pub fn ui(&self) -> &UiPublisher {
        &self.inner.ui
    }

    pub fn medications(&self) -> &MedicationList {
        &self.inner.medications
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.toggles.set_audio_enabled(!muted);
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.inner.toggles.set_video_enabled(enabled);
    }

    pub async fn has_active_session(&self) -> bool {
        match self.inner.active.lock().await.as_ref() {
            Some(ctx) => !ctx.token.is_cancelled(),
            None => false,
        }
    }

    /// Starts a session.
    ///
    /// Returns `Ok` without doing anything while a connect is pending or a
    /// session is up. Device and transport failures move the state to
    /// `Error` and are returned.
    pub async fn connect(&self, config: &SessionConfig) -> Result<()> {
        let inner = &self.inner;
        if !config.has_credential() {
            warn!("connect called without an API key");
            return Err(Error::MissingCredential);
        }
        let Some(generation) = inner.state.begin_connect() else {
            debug!("connect ignored, state is {}", inner.state.current());
            return Ok(());
        };

        let stale = inner.active.lock().await.take();
        if let Some(stale) = stale {
            stale.shutdown().await;
        }

        inner
            .ui
            .log(LogSender::System, "Initializing SafeCompanion...", LogKind::Text);

        let tracks = match inner.devices.acquire(&config.constraints()).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Device access failed: {}", e);
                if inner.state.failed(generation) {
                    inner.ui.log(
                        LogSender::System,
                        format!("Could not access camera or microphone: {}", e),
                        LogKind::Alert,
                    );
                }
                return Err(e.into());
            }
        };
        let handle = Arc::new(MediaTrackHandle::new(inner.toggles.clone(), tracks.video.clone()));

        let setup = config.setup(&inner.medications.snapshot(), &inner.memory.all());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = match inner.transport.open(&setup, events_tx).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to open session: {}", e);
                handle.stop();
                if inner.state.failed(generation) {
                    inner
                        .ui
                        .log(LogSender::System, "Connection error occurred", LogKind::Alert);
                }
                return Err(e.into());
            }
        };

        let mut active = inner.active.lock().await;
        if !inner.state.opened(generation) {
            info!("Session {} opened after teardown, closing it", generation);
            drop(active);
            handle.stop();
            session.close().await;
            return Ok(());
        }

        inner.ui.log(
            LogSender::System,
            "Connected. Monitoring Environment...",
            LogKind::Text,
        );
        *active = Some(self.start_session(generation, session, tracks, handle, events_rx));
        Ok(())
    }

    /// Stops the active session, if any. Safe to call from any state and
    /// more than once.
    pub async fn teardown(&self) {
        let ctx = {
            let mut active = self.inner.active.lock().await;
            self.inner.state.reset();
            active.take()
        };
        if let Some(ctx) = ctx {
            ctx.shutdown().await;
        }
    }

    fn start_session(
        &self,
        generation: u64,
        session: Arc<dyn Session>,
        tracks: MediaTracks,
        handle: Arc<MediaTrackHandle>,
        events: mpsc::UnboundedReceiver<InboundEvent>,
    ) -> SessionContext {
        let inner = &self.inner;
        let token = CancellationToken::new();
        let mut tasks = Vec::with_capacity(7);

        let (audio_outbox, audio_rx) = Outbox::channel();
        let (video_outbox, video_rx) = Outbox::channel();
        tasks.push(spawn_writer(audio_rx, session.clone(), token.clone()));
        tasks.push(spawn_writer(video_rx, session.clone(), token.clone()));

        tasks.push(
            AudioCapture::new(tracks.audio, inner.toggles.clone(), audio_outbox, inner.ui.clone())
                .spawn(token.clone()),
        );
        tasks.push(VideoSampler::new(tracks.video, inner.toggles.clone(), video_outbox).spawn(token.clone()));

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        tasks.push(spawn_result_sender(results_rx, session.clone(), token.clone()));

        let router = Arc::new(ToolRouter::new(ToolContext {
            ui: inner.ui.clone(),
            medications: inner.medications.clone(),
            memory: inner.memory.clone(),
            cues: inner.cues.clone(),
        }));
        let dispatcher = Dispatcher::new(
            generation,
            inner.state.clone(),
            inner.ui.clone(),
            PlaybackScheduler::new(inner.sink.clone()),
            router,
            results_tx,
        );
        tasks.push(dispatcher.spawn(events, token.clone()));

        // Remote close or error cancels the token from inside the dispatcher.
        let releaser = {
            let token = token.clone();
            let handle = handle.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                handle.stop();
            })
        };
        tasks.push(releaser);

        info!("Session {} started", generation);
        SessionContext {
            generation,
            token,
            session,
            tracks: handle,
            tasks,
        }
    }
}
