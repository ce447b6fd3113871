use crate::gemini::GeminiError;
use crate::media::DeviceError;

/// Errors surfaced by the session orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("transport error: {0}")]
    Transport(#[from] GeminiError),

    #[error("media device access failed: {0}")]
    DeviceAccess(#[from] DeviceError),
}

pub type Result<T> = std::result::Result<T, Error>;
