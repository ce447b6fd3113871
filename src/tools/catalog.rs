//! Function declarations advertised to the model at session setup.

use serde_json::{json, Value};

pub const TRIGGER_EMERGENCY: &str = "triggerEmergency";
pub const MANAGE_DEVICE: &str = "manageDevice";
pub const SET_REMINDER: &str = "setReminder";
pub const GENERATE_VISUAL_AID: &str = "generateVisualAid";
pub const REPORT_FALL: &str = "reportFall";
pub const VERIFY_MEDICATION: &str = "verifyMedication";
pub const LOG_HEALTH_METRIC: &str = "logHealthMetric";
pub const SET_ENVIRONMENT_MODE: &str = "setEnvironmentMode";
pub const ANALYZE_DISTRESS: &str = "analyzeDistress";
pub const REPORT_OBSTACLES: &str = "reportObstacles";
pub const REPORT_GESTURE: &str = "reportGesture";
pub const UPDATE_LANGUAGE: &str = "updateLanguage";
pub const REPORT_EMOTIONAL_STATE: &str = "reportEmotionalState";
pub const SAVE_MEMORY: &str = "saveMemory";
pub const RECALL_MEMORY: &str = "recallMemory";
pub const REPORT_DRUG_INTERACTION: &str = "reportDrugInteraction";
pub const NOTIFY_FAMILY: &str = "notifyFamily";
pub const LOG_PAIN: &str = "logPain";
pub const RECOMMEND_EXERCISE: &str = "recommendExercise";

pub const TOOL_NAMES: [&str; 19] = [
    TRIGGER_EMERGENCY,
    MANAGE_DEVICE,
    SET_REMINDER,
    GENERATE_VISUAL_AID,
    REPORT_FALL,
    VERIFY_MEDICATION,
    LOG_HEALTH_METRIC,
    SET_ENVIRONMENT_MODE,
    ANALYZE_DISTRESS,
    REPORT_OBSTACLES,
    REPORT_GESTURE,
    UPDATE_LANGUAGE,
    REPORT_EMOTIONAL_STATE,
    SAVE_MEMORY,
    RECALL_MEMORY,
    REPORT_DRUG_INTERACTION,
    NOTIFY_FAMILY,
    LOG_PAIN,
    RECOMMEND_EXERCISE,
];

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn described(kind: &str, description: &str) -> Value {
    json!({ "type": kind, "description": description })
}

fn one_of(values: &[&str]) -> Value {
    json!({ "type": "STRING", "enum": values })
}

fn declaration(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        }
    })
}

/// All nineteen declarations, in catalog order.
pub fn function_declarations() -> Vec<Value> {
    vec![
        declaration(
            TRIGGER_EMERGENCY,
            "Alerts family and medical services. Use after verifying a fall or on a direct request for help.",
            json!({
                "reason": string(),
                "severity": one_of(&["low", "medium", "high", "critical"]),
            }),
            &["reason", "severity"],
        ),
        declaration(
            MANAGE_DEVICE,
            "Turns a specific smart home device on or off, or sets its value.",
            json!({
                "deviceType": one_of(&["thermostat", "light", "door_lock"]),
                "action": one_of(&["turn_on", "turn_off", "set_temperature", "lock", "unlock"]),
                "value": string(),
            }),
            &["deviceType", "action"],
        ),
        declaration(
            SET_REMINDER,
            "Sets a reminder for the user.",
            json!({ "task": string(), "time": string() }),
            &["task", "time"],
        ),
        declaration(
            GENERATE_VISUAL_AID,
            "Draws an image that explains a concept. Always state why the image helps.",
            json!({
                "description": described("STRING", "Prompt for the image to draw."),
                "reasoning": described("STRING", "Why this image will help the user understand."),
            }),
            &["description", "reasoning"],
        ),
        declaration(
            REPORT_FALL,
            "CRITICAL: reports a fall seen on video. Calls family immediately.",
            json!({
                "confidence": described("NUMBER", "Detection confidence from 0 to 1."),
                "visualDescription": described("STRING", "What was observed, e.g. \"User slumped from chair\"."),
            }),
            &["confidence", "visualDescription"],
        ),
        declaration(
            VERIFY_MEDICATION,
            "Records a visual check that a medication was taken. Confirm the bottle or pill on video.",
            json!({
                "medicationName": string(),
                "visualConfirmation": described("BOOLEAN", "True if taking the medication was seen on video."),
                "notes": described("STRING", "Details of the check, e.g. \"Label matches Lisinopril\"."),
            }),
            &["medicationName", "visualConfirmation"],
        ),
        declaration(
            LOG_HEALTH_METRIC,
            "Logs a health observation from audio or video (posture, speech, gait).",
            json!({
                "metric": one_of(&["posture", "speech_clarity", "energy_level", "mobility", "vocal_biomarker"]),
                "status": one_of(&["normal", "concern", "critical"]),
                "observation": described("STRING", "Detailed observation."),
            }),
            &["metric", "status", "observation"],
        ),
        declaration(
            SET_ENVIRONMENT_MODE,
            "Adjusts several smart devices at once to suit what the user is doing.",
            json!({
                "mode": one_of(&["reading", "watching_tv", "sleeping", "active", "dining"]),
                "reason": described("STRING", "What in the video suggested this mode."),
            }),
            &["mode", "reason"],
        ),
        declaration(
            ANALYZE_DISTRESS,
            "Logs signs of emotional distress, loneliness or confusion.",
            json!({
                "detectedPattern": described("STRING", "The pattern noticed, e.g. \"frequent use of I\"."),
                "distressLevel": one_of(&["low", "medium", "high"]),
            }),
            &["detectedPattern", "distressLevel"],
        ),
        declaration(
            REPORT_OBSTACLES,
            "Reports every obstacle currently visible so the user can be warned.",
            json!({
                "obstacles": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "object": described("STRING", "What the obstacle is, e.g. 'Chair' or 'Stairs'."),
                            "priority": one_of(&["critical", "medium", "low"]),
                            "direction": {
                                "type": "STRING",
                                "enum": ["left", "center", "right"],
                                "description": "Direction relative to the user, drives the spatial audio cue.",
                            },
                        },
                        "required": ["object", "priority", "direction"],
                    }
                }
            }),
            &["obstacles"],
        ),
        declaration(
            REPORT_GESTURE,
            "Reports a recognised hand gesture.",
            json!({
                "gesture": one_of(&["thumbs_up", "thumbs_down", "open_palm"]),
                "meaning": described("STRING", "The interpreted meaning."),
            }),
            &["gesture"],
        ),
        declaration(
            UPDATE_LANGUAGE,
            "Switches the interface language when the user speaks a different one.",
            json!({
                "language": described("STRING", "The detected language, e.g. Spanish."),
            }),
            &["language"],
        ),
        declaration(
            REPORT_EMOTIONAL_STATE,
            "Updates the emotional state dashboard when a mood is detected.",
            json!({
                "userEmotion": described("STRING", "Detected emotion, e.g. Joy or Anxiety."),
                "confidence": described("NUMBER", "Confidence from 0 to 1."),
                "adaptationStrategy": described("STRING", "How the reply style is adapting, e.g. \"slower, warmer tone\"."),
            }),
            &["userEmotion", "adaptationStrategy"],
        ),
        declaration(
            SAVE_MEMORY,
            "Stores an important fact about the user in long-term memory.",
            json!({
                "category": one_of(&["family", "health", "preference", "history"]),
                "fact": described("STRING", "The fact to remember."),
            }),
            &["category", "fact"],
        ),
        declaration(
            RECALL_MEMORY,
            "Searches long-term memory for a topic.",
            json!({ "query": described("STRING", "Topic to search for.") }),
            &["query"],
        ),
        declaration(
            REPORT_DRUG_INTERACTION,
            "Warns the user about a potential interaction between medications.",
            json!({
                "medications": { "type": "ARRAY", "items": string() },
                "severity": one_of(&["low", "moderate", "severe"]),
                "interactionDetail": described("STRING", "Explanation of the interaction."),
            }),
            &["medications", "severity", "interactionDetail"],
        ),
        declaration(
            NOTIFY_FAMILY,
            "Sends an alert to family members, e.g. for missed medication or a fall.",
            json!({
                "alertType": one_of(&["medication_missed", "compliance_risk", "fall", "pain_alert", "general"]),
                "message": described("STRING", "Message to family."),
                "priority": one_of(&["low", "medium", "high"]),
            }),
            &["alertType", "message", "priority"],
        ),
        declaration(
            LOG_PAIN,
            "Logs a pain report.",
            json!({
                "location": string(),
                "severity": described("NUMBER", "1 to 10."),
                "description": described("STRING", "How the user describes it, e.g. \"sharp, throbbing\"."),
                "duration": described("STRING", "How long it has lasted."),
            }),
            &["location", "severity", "description"],
        ),
        declaration(
            RECOMMEND_EXERCISE,
            "Suggests an exercise or therapy for pain relief.",
            json!({
                "painLocation": string(),
                "recommendation": described("STRING", "The exercise or therapy, e.g. \"Heat pad\"."),
                "reason": string(),
            }),
            &["painLocation", "recommendation"],
        ),
    ]
}
