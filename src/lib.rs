//! CareLive - realtime multimodal companion session
//!
//! Streams microphone audio and camera frames to the Gemini Live API,
//! plays the spoken replies back with spatial cues, and executes the
//! structured tool calls the model issues (emergencies, medication checks,
//! obstacle warnings, long-term memory).

#![forbid(unsafe_code)]

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gemini;
pub mod gemini_client;
pub mod instruction;
pub mod media;
pub mod model;
pub mod orchestrator;
pub mod outbox;
pub mod pcm;
pub mod playback;
pub mod store;
pub mod tools;
pub mod transport;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, SessionConfig};
pub use connection::ConnectionState;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use ui::{LogEntry, UiEvent, UiPublisher};
