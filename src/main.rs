//! CareLive - realtime multimodal companion
//!
//! Connects the microphone and camera to the Gemini Live API and prints the
//! session's log, banners and alerts to the terminal until Ctrl-C.

#![forbid(unsafe_code)]

use anyhow::Context;
use carelive::gemini_client::GeminiTransport;
use carelive::media::{MediaToggles, SystemDevices};
use carelive::playback::mixer::Mixer;
use carelive::playback::AudioSink;
use carelive::store::{JsonFileStore, MedicationList};
use carelive::ui::{LogKind, LogSender};
use carelive::{AppConfig, OrchestratorBuilder, UiEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "carelive.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load_or_default(&config_path)?.with_env_overrides();
    info!("Loaded configuration from {}", config_path.display());

    let memory = JsonFileStore::open(&config.memory.path)
        .with_context(|| format!("opening memory store {}", config.memory.path.display()))?;
    info!("Memory store at {}", memory.path().display());

    let shutdown = CancellationToken::new();
    #[cfg(feature = "playback")]
    let (mixer, _output) = carelive::playback::cpal_output::CpalOutput::open()?;
    #[cfg(not(feature = "playback"))]
    let mixer = {
        let mixer = Arc::new(Mixer::new(carelive::playback::OUTPUT_SAMPLE_RATE));
        carelive::playback::mixer::spawn_realtime_driver(mixer.clone(), shutdown.clone());
        mixer
    };

    let toggles = MediaToggles::new(!config.media.muted, config.media.video_enabled);
    let orchestrator = OrchestratorBuilder::new(
        Arc::new(GeminiTransport::default()),
        Arc::new(SystemDevices::new("carelive")),
        mixer.clone() as Arc<dyn AudioSink>,
    )
    .cue_sample_rate(mixer.sample_rate())
    .medications(MedicationList::new(config.medications.clone()))
    .memory(Arc::new(memory))
    .toggles(toggles)
    .build();

    let printer = tokio::spawn(print_ui(orchestrator.subscribe(), shutdown.clone()));

    if let Err(e) = orchestrator.connect(&config.session_config()).await {
        error!("Failed to start session: {}", e);
    }

    let mut state = orchestrator.watch_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        _ = state.wait_for(|s| *s != carelive::ConnectionState::Connected && *s != carelive::ConnectionState::Connecting) => {
            info!("Session ended ({})", orchestrator.state());
        }
    }

    orchestrator.teardown().await;
    shutdown.cancel();
    let _ = printer.await;
    Ok(())
}

async fn print_ui(mut events: tokio::sync::broadcast::Receiver<UiEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(UiEvent::Log(entry)) => {
                let who = match entry.sender {
                    LogSender::User => "you",
                    LogSender::Agent => "companion",
                    LogSender::System => "system",
                };
                match entry.kind {
                    LogKind::Alert => warn!("[{}] {}", who, entry.message),
                    LogKind::Text | LogKind::Action => info!("[{}] {}", who, entry.message),
                }
            }
            Ok(UiEvent::Action(banner)) => info!(">> {}", banner),
            Ok(UiEvent::BlockingAlert(text)) => error!("ALERT: {}", text),
            Ok(UiEvent::FamilyNotification { title, body }) => warn!("{}: {}", title, body),
            Ok(UiEvent::ConnectionStateChanged(state)) => info!("Connection: {}", state),
            Ok(UiEvent::ObstaclesDetected(obstacles)) => {
                for o in obstacles {
                    info!("Obstacle: {} ({:?}, {:?})", o.object, o.priority, o.direction);
                }
            }
            Ok(UiEvent::VocalMetricsUpdate(m)) => {
                if m.tremor_detected {
                    warn!("Vocal tremor detected (energy {:.3}, variance {:.5})", m.energy, m.stability);
                }
            }
            Ok(other) => info!("{:?}", other),
            Err(RecvError::Lagged(n)) => warn!("UI printer lagged, {} events skipped", n),
            Err(RecvError::Closed) => break,
        }
    }
}
