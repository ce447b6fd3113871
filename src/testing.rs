//! In-process fakes for the device, transport and playback seams.

use crate::events::{AudioChunk, InboundEvent, ToolResult, VideoFrame};
use crate::gemini::{self, GeminiError};
use crate::media::{AudioSource, DeviceError, MediaConstraints, MediaDevices, MediaTracks, VideoSource};
use crate::playback::cue::CuePlayer;
use crate::playback::{AudioSink, PlaybackSource, SourceId, SpatialChannel};
use crate::store::{InMemoryStore, MedicationList};
use crate::tools::ToolContext;
use crate::transport::{Session, SessionSetup, Transport};
use crate::ui::{UiEvent, UiPublisher};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};

pub fn drain_ui(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn tool_context() -> (ToolContext, Arc<RecordingCues>) {
    let cues = Arc::new(RecordingCues::default());
    let ctx = ToolContext {
        ui: UiPublisher::new(),
        medications: MedicationList::default(),
        memory: Arc::new(InMemoryStore::default()),
        cues: cues.clone(),
    };
    (ctx, cues)
}

#[derive(Default)]
pub struct FakeSession {
    audio: AtomicUsize,
    images: AtomicUsize,
    tool_results: Mutex<Vec<ToolResult>>,
    closes: AtomicUsize,
}

impl FakeSession {
    pub fn audio_sent(&self) -> usize {
        self.audio.load(Ordering::SeqCst)
    }

    pub fn images_sent(&self) -> usize {
        self.images.load(Ordering::SeqCst)
    }

    pub fn tool_results(&self) -> Vec<ToolResult> {
        self.tool_results.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> gemini::Result<()> {
        if self.close_count() > 0 {
            return Err(GeminiError::ConnectionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn send_audio(&self, _chunk: &AudioChunk) -> gemini::Result<()> {
        self.check_open()?;
        self.audio.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_image(&self, _frame: &VideoFrame) -> gemini::Result<()> {
        self.check_open()?;
        self.images.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_tool_result(&self, result: &ToolResult) -> gemini::Result<()> {
        self.check_open()?;
        self.tool_results.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A session whose media sends never complete.
#[derive(Default)]
pub struct StalledSession {
    attempts: AtomicUsize,
}

impl StalledSession {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for StalledSession {
    async fn send_audio(&self, _chunk: &AudioChunk) -> gemini::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn send_image(&self, _frame: &VideoFrame) -> gemini::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn send_tool_result(&self, _result: &ToolResult) -> gemini::Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

/// Hands out [`FakeSession`]s and keeps the event sender of the latest one
/// so tests can play the remote side.
#[derive(Default)]
pub struct FakeTransport {
    fail: bool,
    gate: Option<Arc<Notify>>,
    opens: AtomicUsize,
    setups: Mutex<Vec<SessionSetup>>,
    events: Mutex<Option<mpsc::UnboundedSender<InboundEvent>>>,
    sessions: Mutex<Vec<Arc<FakeSession>>>,
}

impl FakeTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Opens block until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn setups(&self) -> Vec<SessionSetup> {
        self.setups.lock().unwrap().clone()
    }

    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn emit(&self, event: InboundEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(
        &self,
        setup: &SessionSetup,
        events: mpsc::UnboundedSender<InboundEvent>,
    ) -> gemini::Result<Arc<dyn Session>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.setups.lock().unwrap().push(setup.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(GeminiError::SetupNotComplete);
        }
        *self.events.lock().unwrap() = Some(events);
        let session = Arc::new(FakeSession::default());
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}

/// Microphone producing a steady sine tone.
pub struct ToneSource {
    amplitude: f32,
    delay: Duration,
    phase: f32,
}

impl ToneSource {
    pub fn new(amplitude: f32, delay: Duration) -> Self {
        Self {
            amplitude,
            delay,
            phase: 0.0,
        }
    }
}

impl AudioSource for ToneSource {
    fn read(&mut self, buf: &mut [f32]) -> Result<(), DeviceError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let step = 2.0 * std::f32::consts::PI * 440.0 / 16_000.0;
        for s in buf.iter_mut() {
            *s = self.amplitude * self.phase.sin();
            self.phase = (self.phase + step) % (2.0 * std::f32::consts::PI);
        }
        Ok(())
    }
}

/// Camera that always shows the same grey frame.
pub struct StillCamera {
    frame: RgbImage,
    stops: AtomicUsize,
}

impl StillCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbImage::from_pixel(width, height, Rgb([128, 128, 128])),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl VideoSource for StillCamera {
    fn current_frame(&self) -> Option<RgbImage> {
        Some(self.frame.clone())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeDevices {
    deny: AtomicBool,
    acquisitions: AtomicUsize,
    camera: Arc<StillCamera>,
}

impl Default for FakeDevices {
    fn default() -> Self {
        Self {
            deny: AtomicBool::new(false),
            acquisitions: AtomicUsize::new(0),
            camera: Arc::new(StillCamera::new(64, 48)),
        }
    }
}

impl FakeDevices {
    pub fn denying() -> Self {
        let devices = Self::default();
        devices.deny.store(true, Ordering::SeqCst);
        devices
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn camera(&self) -> Arc<StillCamera> {
        self.camera.clone()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn acquire(&self, _constraints: &MediaConstraints) -> Result<MediaTracks, DeviceError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied("user dismissed the prompt".to_string()));
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(MediaTracks {
            audio: Box::new(ToneSource::new(0.3, Duration::from_millis(5))),
            video: self.camera.clone(),
        })
    }
}

#[derive(Default)]
struct SinkState {
    time: f64,
    next_id: SourceId,
    started: Vec<PlaybackSource>,
    stopped: Vec<SourceId>,
    stop_alls: usize,
}

/// Audio sink whose clock only moves when the test says so.
#[derive(Default)]
pub struct ManualClockSink {
    state: Mutex<SinkState>,
}

impl ManualClockSink {
    pub fn set_time(&self, time: f64) {
        self.state.lock().unwrap().time = time;
    }

    pub fn started(&self) -> Vec<PlaybackSource> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<SourceId> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn stop_all_count(&self) -> usize {
        self.state.lock().unwrap().stop_alls
    }
}

impl AudioSink for ManualClockSink {
    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn start(&self, source: PlaybackSource) -> SourceId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.started.push(source);
        state.next_id
    }

    fn stop(&self, id: SourceId) {
        self.state.lock().unwrap().stopped.push(id);
    }

    fn stop_all(&self) {
        self.state.lock().unwrap().stop_alls += 1;
    }
}

#[derive(Default)]
pub struct RecordingCues {
    played: Mutex<Vec<SpatialChannel>>,
}

impl RecordingCues {
    pub fn played(&self) -> Vec<SpatialChannel> {
        self.played.lock().unwrap().clone()
    }
}

impl CuePlayer for RecordingCues {
    fn play_cue(&self, channel: SpatialChannel) {
        self.played.lock().unwrap().push(channel);
    }
}
