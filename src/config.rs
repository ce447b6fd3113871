use crate::instruction;
use crate::media::MediaConstraints;
use crate::model::{Medication, Memory, UserMode};
use crate::tools::catalog;
use crate::transport::SessionSetup;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_VOICE: &str = "Kore";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionSection,
    pub media: MediaSection,
    pub memory: MemorySection,
    pub medications: Vec<Medication>,
}

/// Remote agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSection {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub mode: UserMode,
    pub enable_maps: bool,
    pub thinking_budget: Option<u32>,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaSection {
    pub muted: bool,
    pub video_enabled: bool,
    pub audio_device: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// Long-term memory persistence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemorySection {
    pub path: PathBuf,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            mode: UserMode::Elderly,
            enable_maps: true,
            thinking_budget: Some(1024),
        }
    }
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            muted: false,
            video_enabled: true,
            audio_device: None,
            width: 640,
            height: 480,
        }
    }
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("carelive-memories.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                let missing = e
                    .downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false);
                if missing {
                    Ok(Self::default())
                } else {
                    Err(e.context(format!("failed to load config from {}", path.display())))
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - GEMINI_API_KEY → session.api_key
    /// - CARELIVE_MODEL → session.model
    /// - CARELIVE_MODE → session.mode (`elderly` or `visually_impaired`)
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = set("GEMINI_API_KEY") {
            self.session.api_key = key;
        }
        if let Some(model) = set("CARELIVE_MODEL") {
            self.session.model = model;
        }
        if let Some(mode) = set("CARELIVE_MODE") {
            match mode.parse() {
                Ok(mode) => self.session.mode = mode,
                Err(e) => tracing::warn!("Ignoring CARELIVE_MODE: {}", e),
            }
        }
        self
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            api_key: self.session.api_key.clone(),
            model: self.session.model.clone(),
            voice: self.session.voice.clone(),
            mode: self.session.mode,
            enable_maps: self.session.enable_maps,
            thinking_budget: self.session.thinking_budget,
            audio_device: self.media.audio_device.clone(),
            width: self.media.width,
            height: self.media.height,
        }
    }
}

/// Runtime parameters for one `connect`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub mode: UserMode,
    pub enable_maps: bool,
    pub thinking_budget: Option<u32>,
    pub audio_device: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        AppConfig::default().session_config()
    }
}

impl SessionConfig {
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio_device: self.audio_device.clone(),
            ideal_width: self.width,
            ideal_height: self.height,
            ..MediaConstraints::default()
        }
    }

    /// The setup handshake for a session that knows `medications` and `memories`.
    pub fn setup(&self, medications: &[Medication], memories: &[Memory]) -> SessionSetup {
        SessionSetup {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            voice: self.voice.clone(),
            system_instruction: instruction::compose(
                instruction::SYSTEM_INSTRUCTION,
                self.mode,
                medications,
                memories,
            ),
            function_declarations: catalog::function_declarations(),
            enable_maps: self.enable_maps,
            thinking_budget: self.thinking_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
            [session]
            voice = "Puck"

            [[medications]]
            name = "Metformin"
            dosage = "500mg"
            frequency = "Twice daily"
            time_of_day = "Morning"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.session.voice, "Puck");
        assert_eq!(config.session.model, DEFAULT_MODEL);
        assert!(config.media.video_enabled);
        assert_eq!(config.medications.len(), 1);
        assert_eq!(config.medications[0].name, "Metformin");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session\nmodel = ").unwrap();
        assert!(AppConfig::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "secret"),
            ("CARELIVE_MODEL", ""),
            ("CARELIVE_MODE", "visually_impaired"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.session.api_key, "secret");
        assert_eq!(config.session.model, DEFAULT_MODEL);
        assert_eq!(config.session.mode, UserMode::VisuallyImpaired);
    }

    #[test]
    fn test_setup_carries_catalog_and_context() {
        let mut session = SessionConfig::default();
        session.api_key = "k".to_string();
        assert!(session.has_credential());
        let setup = session.setup(&[], &[]);
        assert_eq!(setup.function_declarations.len(), catalog::TOOL_NAMES.len());
        assert!(setup.system_instruction.contains("CURRENT MODE: ELDERLY COMPANION"));
        assert!(setup.system_instruction.contains("No meds on file."));
    }
}
