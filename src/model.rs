//! Domain records shared between the tool handlers, the stores and the UI channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Medium,
    Low,
}

impl Priority {
    /// Medium or higher priorities warrant an audible cue.
    pub fn is_urgent(self) -> bool {
        matches!(self, Priority::Critical | Priority::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    pub object: String,
    pub priority: Priority,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    ThumbsUp,
    ThumbsDown,
    OpenPalm,
}

impl Gesture {
    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::ThumbsUp => "thumbs_up",
            Gesture::ThumbsDown => "thumbs_down",
            Gesture::OpenPalm => "open_palm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub emotion: String,
    pub confidence: Option<f64>,
    pub adaptation: String,
    pub timestamp: DateTime<Utc>,
}

/// Acoustic features computed from the microphone stream.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VocalMetrics {
    /// Mean RMS over the analysis window.
    pub energy: f32,
    /// Variance of the per-chunk RMS values.
    pub stability: f32,
    pub tremor_detected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MedicationStatus {
    Taken,
    #[default]
    Pending,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub time_of_day: String,
    #[serde(default)]
    pub status: MedicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub category: String,
    pub fact: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserMode {
    #[default]
    Elderly,
    VisuallyImpaired,
}

impl UserMode {
    pub fn label(self) -> &'static str {
        match self {
            UserMode::Elderly => "ELDERLY COMPANION",
            UserMode::VisuallyImpaired => "VISUAL ASSISTANT (Blind User)",
        }
    }
}

impl std::str::FromStr for UserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elderly" => Ok(UserMode::Elderly),
            "visually_impaired" => Ok(UserMode::VisuallyImpaired),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}
