use super::catalog::*;
use super::{parse_args, ToolContext, ToolError, ToolHandler};
use crate::model::{Direction, EmotionalState, Gesture, Obstacle, Priority};
use crate::playback::SpatialChannel;
use crate::ui::{LogKind, LogSender, UiEvent};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub(super) fn all() -> Vec<Box<dyn ToolHandler>> {
    vec![
        Box::new(TriggerEmergency),
        Box::new(ManageDevice),
        Box::new(SetReminder),
        Box::new(GenerateVisualAid),
        Box::new(ReportFall),
        Box::new(VerifyMedication),
        Box::new(LogHealthMetric),
        Box::new(SetEnvironmentMode),
        Box::new(AnalyzeDistress),
        Box::new(ReportObstacles),
        Box::new(ReportGesture),
        Box::new(UpdateLanguage),
        Box::new(ReportEmotionalState),
        Box::new(SaveMemory),
        Box::new(RecallMemory),
        Box::new(ReportDrugInteraction),
        Box::new(NotifyFamily),
        Box::new(LogPain),
        Box::new(RecommendExercise),
    ]
}

/// Formats a JSON number the way a person would read it: `7`, not `7.0`.
fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

struct TriggerEmergency;

#[derive(Deserialize)]
struct EmergencyArgs {
    reason: String,
    severity: String,
}

impl ToolHandler for TriggerEmergency {
    fn name(&self) -> &'static str {
        TRIGGER_EMERGENCY
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: EmergencyArgs = parse_args(args)?;
        ctx.ui.publish(UiEvent::BlockingAlert(format!(
            "EMERGENCY TRIGGERED: {} (Severity: {})",
            args.reason, args.severity
        )));
        ctx.ui.log(
            LogSender::Agent,
            format!("EMERGENCY: {}", args.reason),
            LogKind::Alert,
        );
        Ok(json!({ "status": "emergency_dispatched", "eta": "5 minutes" }))
    }
}

struct ManageDevice;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceArgs {
    device_type: String,
    action: String,
    #[serde(default)]
    value: Option<String>,
}

impl ToolHandler for ManageDevice {
    fn name(&self) -> &'static str {
        MANAGE_DEVICE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: DeviceArgs = parse_args(args)?;
        let mut message = format!("Device: {} {}", args.action, args.device_type);
        if let Some(value) = args.value.as_deref().filter(|v| !v.is_empty()) {
            message.push_str(&format!(" ({})", value));
        }
        ctx.ui.action(message.clone());
        ctx.ui.log(LogSender::Agent, message.clone(), LogKind::Action);
        Ok(json!({ "status": "success", "message": message }))
    }
}

struct SetReminder;

#[derive(Deserialize)]
struct ReminderArgs {
    task: String,
    time: String,
}

impl ToolHandler for SetReminder {
    fn name(&self) -> &'static str {
        SET_REMINDER
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ReminderArgs = parse_args(args)?;
        let message = format!("Reminder: {} @ {}", args.task, args.time);
        ctx.ui.action(message.clone());
        ctx.ui.log(LogSender::Agent, message, LogKind::Action);
        Ok(json!({ "status": "confirmed" }))
    }
}

struct GenerateVisualAid;

#[derive(Deserialize)]
struct VisualAidArgs {
    description: String,
    #[serde(default)]
    reasoning: String,
}

impl ToolHandler for GenerateVisualAid {
    fn name(&self) -> &'static str {
        GENERATE_VISUAL_AID
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: VisualAidArgs = parse_args(args)?;
        let message = format!("Drawing: {}", args.description);
        ctx.ui.publish(UiEvent::GenerateVisualAid {
            description: args.description,
            reasoning: args.reasoning,
        });
        ctx.ui.action(message.clone());
        ctx.ui.log(LogSender::Agent, message, LogKind::Action);
        Ok(json!({ "status": "generating" }))
    }
}

struct ReportFall;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FallArgs {
    confidence: f64,
    visual_description: String,
}

impl ToolHandler for ReportFall {
    fn name(&self) -> &'static str {
        REPORT_FALL
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: FallArgs = parse_args(args)?;
        let percent = (args.confidence * 100.0).round();
        ctx.ui.log(
            LogSender::Agent,
            format!(
                "FALL DETECTED ({}%): {}",
                display_number(percent),
                args.visual_description
            ),
            LogKind::Alert,
        );
        ctx.ui.publish(UiEvent::BlockingAlert(format!(
            "FALL DETECTED\n\nVisual Analysis: {}\n\nCalling Family & Emergency Services immediately...",
            args.visual_description
        )));
        Ok(json!({ "status": "emergency_services_contacted", "family_notified": true }))
    }
}

struct VerifyMedication;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MedicationArgs {
    medication_name: String,
    visual_confirmation: bool,
    #[serde(default)]
    notes: Option<String>,
}

impl ToolHandler for VerifyMedication {
    fn name(&self) -> &'static str {
        VERIFY_MEDICATION
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: MedicationArgs = parse_args(args)?;
        let confirmed = args.visual_confirmation;
        if confirmed {
            let updated = ctx.medications.mark_taken(&args.medication_name, Utc::now());
            info!(
                "Medication {} verified, {} schedule entries updated",
                args.medication_name,
                updated.len()
            );
            ctx.ui
                .publish(UiEvent::MedicationVerified(args.medication_name.clone()));
        }

        let status = if confirmed { "VERIFIED" } else { "NOT SEEN" };
        let message = format!("Meds Check: {} - {}", args.medication_name, status);
        ctx.ui.action(message.clone());
        let kind = if confirmed { LogKind::Text } else { LogKind::Alert };
        ctx.ui.log(LogSender::Agent, message, kind);
        if let Some(notes) = args.notes.filter(|n| !n.is_empty()) {
            info!("Medication check notes: {}", notes);
        }
        Ok(json!({ "status": "logged", "verification": confirmed }))
    }
}

struct LogHealthMetric;

#[derive(Deserialize)]
struct HealthArgs {
    metric: String,
    status: String,
    observation: String,
}

impl ToolHandler for LogHealthMetric {
    fn name(&self) -> &'static str {
        LOG_HEALTH_METRIC
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: HealthArgs = parse_args(args)?;
        if args.status == "critical" {
            ctx.ui.action(format!("Health Warning: {}", args.metric));
        }
        ctx.ui.log(
            LogSender::System,
            format!(
                "Health Log [{}]: {} - {}",
                args.metric,
                args.status.to_uppercase(),
                args.observation
            ),
            LogKind::Text,
        );
        Ok(json!({ "status": "recorded" }))
    }
}

struct SetEnvironmentMode;

#[derive(Deserialize)]
struct SceneArgs {
    mode: String,
    #[serde(default)]
    reason: String,
}

impl ToolHandler for SetEnvironmentMode {
    fn name(&self) -> &'static str {
        SET_ENVIRONMENT_MODE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: SceneArgs = parse_args(args)?;
        let message = format!("Context Scene: Setting '{}' mode ({})", args.mode, args.reason);
        ctx.ui.action(message.clone());
        ctx.ui.log(LogSender::Agent, message, LogKind::Action);
        Ok(json!({ "status": "scene_activated" }))
    }
}

struct AnalyzeDistress;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DistressArgs {
    detected_pattern: String,
    distress_level: String,
}

impl ToolHandler for AnalyzeDistress {
    fn name(&self) -> &'static str {
        ANALYZE_DISTRESS
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: DistressArgs = parse_args(args)?;
        ctx.ui.log(
            LogSender::System,
            format!(
                "Emotional Analysis: {} ({})",
                args.detected_pattern, args.distress_level
            ),
            LogKind::Alert,
        );
        ctx.ui.action("Evaluating Emotional Health");
        let action = if args.distress_level == "high" {
            "notify_family"
        } else {
            "monitor"
        };
        Ok(json!({ "status": "distress_logged", "action": action }))
    }
}

struct ReportObstacles;

#[derive(Deserialize)]
struct ObstacleArg {
    object: String,
    priority: Priority,
    direction: Direction,
}

#[derive(Deserialize)]
struct ObstaclesArgs {
    obstacles: Vec<ObstacleArg>,
}

impl ToolHandler for ReportObstacles {
    fn name(&self) -> &'static str {
        REPORT_OBSTACLES
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ObstaclesArgs = parse_args(args)?;
        let stamp = Utc::now().timestamp_millis();
        let obstacles: Vec<Obstacle> = args
            .obstacles
            .into_iter()
            .enumerate()
            .map(|(i, o)| Obstacle {
                id: format!("obs-{}-{}", stamp, i),
                object: o.object,
                priority: o.priority,
                direction: o.direction,
            })
            .collect();

        let threat = |direction: Direction| {
            obstacles
                .iter()
                .any(|o| o.direction == direction && o.priority.is_urgent())
        };
        let left = threat(Direction::Left);
        let right = threat(Direction::Right);

        ctx.ui.publish(UiEvent::ObstaclesDetected(obstacles));
        if left {
            ctx.cues.play_cue(SpatialChannel::Left);
        }
        if right {
            ctx.cues.play_cue(SpatialChannel::Right);
        }
        Ok(json!({ "status": "obstacles_processed_with_spatial_audio" }))
    }
}

struct ReportGesture;

#[derive(Deserialize)]
struct GestureArgs {
    gesture: Gesture,
    #[serde(default)]
    meaning: Option<String>,
}

impl ToolHandler for ReportGesture {
    fn name(&self) -> &'static str {
        REPORT_GESTURE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: GestureArgs = parse_args(args)?;
        if let Some(meaning) = &args.meaning {
            info!("Gesture {} read as: {}", args.gesture.as_str(), meaning);
        }
        ctx.ui.publish(UiEvent::GestureDetected(args.gesture));
        ctx.ui
            .action(format!("Gesture: {}", args.gesture.as_str().to_uppercase()));
        Ok(json!({ "status": "gesture_processed" }))
    }
}

struct UpdateLanguage;

#[derive(Deserialize)]
struct LanguageArgs {
    language: String,
}

impl ToolHandler for UpdateLanguage {
    fn name(&self) -> &'static str {
        UPDATE_LANGUAGE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: LanguageArgs = parse_args(args)?;
        ctx.ui.log(
            LogSender::System,
            format!("Language switched to {}", args.language),
            LogKind::Text,
        );
        ctx.ui.publish(UiEvent::LanguageChanged(args.language));
        Ok(json!({ "status": "language_updated" }))
    }
}

struct ReportEmotionalState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmotionArgs {
    user_emotion: String,
    #[serde(default)]
    confidence: Option<f64>,
    adaptation_strategy: String,
}

impl ToolHandler for ReportEmotionalState {
    fn name(&self) -> &'static str {
        REPORT_EMOTIONAL_STATE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: EmotionArgs = parse_args(args)?;
        ctx.ui.publish(UiEvent::EmotionalStateUpdate(EmotionalState {
            emotion: args.user_emotion,
            confidence: args.confidence,
            adaptation: args.adaptation_strategy,
            timestamp: Utc::now(),
        }));
        Ok(json!({ "status": "dashboard_updated" }))
    }
}

struct SaveMemory;

#[derive(Deserialize)]
struct SaveMemoryArgs {
    category: String,
    fact: String,
}

impl ToolHandler for SaveMemory {
    fn name(&self) -> &'static str {
        SAVE_MEMORY
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: SaveMemoryArgs = parse_args(args)?;
        let memory = ctx.memory.save(&args.category, &args.fact)?;
        ctx.ui.log(
            LogSender::System,
            format!("Memory Saved: {}", memory.fact),
            LogKind::Text,
        );
        Ok(json!({ "status": "memory_persisted" }))
    }
}

struct RecallMemory;

#[derive(Deserialize)]
struct RecallArgs {
    query: String,
}

impl ToolHandler for RecallMemory {
    fn name(&self) -> &'static str {
        RECALL_MEMORY
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: RecallArgs = parse_args(args)?;
        let facts: Vec<String> = ctx
            .memory
            .search(&args.query)
            .into_iter()
            .map(|m| m.fact)
            .collect();
        Ok(json!({ "found": !facts.is_empty(), "memories": facts.join("; ") }))
    }
}

struct ReportDrugInteraction;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionArgs {
    medications: Vec<String>,
    severity: String,
    interaction_detail: String,
}

impl ToolHandler for ReportDrugInteraction {
    fn name(&self) -> &'static str {
        REPORT_DRUG_INTERACTION
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: InteractionArgs = parse_args(args)?;
        let message = format!(
            "DRUG INTERACTION: {} - {}",
            args.medications.join(" + "),
            args.severity.to_uppercase()
        );
        ctx.ui.log(LogSender::Agent, message.clone(), LogKind::Alert);
        ctx.ui.action("Drug Interaction Alert");
        ctx.ui.publish(UiEvent::BlockingAlert(format!(
            "{}\n\n{}",
            message, args.interaction_detail
        )));
        Ok(json!({ "status": "user_alerted" }))
    }
}

struct NotifyFamily;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyArgs {
    alert_type: String,
    message: String,
    #[serde(default)]
    priority: Option<String>,
}

impl ToolHandler for NotifyFamily {
    fn name(&self) -> &'static str {
        NOTIFY_FAMILY
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: FamilyArgs = parse_args(args)?;
        info!(
            "Family notification ({} priority)",
            args.priority.as_deref().unwrap_or("unspecified")
        );
        ctx.ui.log(
            LogSender::System,
            format!("Family Notification [{}]: {}", args.alert_type, args.message),
            LogKind::Text,
        );
        ctx.ui.action(format!("Family Notified: {}", args.alert_type));
        ctx.ui.publish(UiEvent::FamilyNotification {
            title: "SafeCompanion Alert".to_string(),
            body: args.message,
        });
        Ok(json!({ "status": "notification_sent", "timestamp": Utc::now().to_rfc3339() }))
    }
}

struct LogPain;

#[derive(Deserialize)]
struct PainArgs {
    location: String,
    severity: f64,
    description: String,
    #[serde(default)]
    duration: Option<String>,
}

impl ToolHandler for LogPain {
    fn name(&self) -> &'static str {
        LOG_PAIN
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: PainArgs = parse_args(args)?;
        if let Some(duration) = &args.duration {
            info!("Pain in {} reported lasting {}", args.location, duration);
        }
        ctx.ui.log(
            LogSender::System,
            format!(
                "Pain Log: {} (Level {}) - {}",
                args.location,
                display_number(args.severity),
                args.description
            ),
            LogKind::Text,
        );
        Ok(json!({ "status": "pain_logged" }))
    }
}

struct RecommendExercise;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseArgs {
    pain_location: String,
    recommendation: String,
    #[serde(default)]
    reason: Option<String>,
}

impl ToolHandler for RecommendExercise {
    fn name(&self) -> &'static str {
        RECOMMEND_EXERCISE
    }

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: ExerciseArgs = parse_args(args)?;
        ctx.ui
            .action(format!("Therapy Suggestion: {}", args.recommendation));
        ctx.ui.log(
            LogSender::Agent,
            format!(
                "Therapy for {}: {} ({})",
                args.pain_location,
                args.recommendation,
                args.reason.as_deref().unwrap_or("")
            ),
            LogKind::Action,
        );
        Ok(json!({ "status": "suggestion_displayed" }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::ToolRouter;
    use super::*;
    use crate::events::ToolCall;
    use crate::model::{Medication, MedicationStatus};
    use crate::store::MedicationList;
    use crate::testing::{drain_ui, tool_context};
    use crate::ui::LogEntry;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: format!("id-{}", name),
            name: name.to_string(),
            args,
        }
    }

    fn logs(events: &[UiEvent]) -> Vec<LogEntry> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Log(entry) => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_emergency_raises_blocking_alert() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let result = router.dispatch(&call(
            TRIGGER_EMERGENCY,
            json!({"reason": "chest pain", "severity": "critical"}),
        ));
        assert_eq!(result.id, "id-triggerEmergency");
        assert_eq!(
            result.result,
            json!({"status": "emergency_dispatched", "eta": "5 minutes"})
        );

        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::BlockingAlert(
            "EMERGENCY TRIGGERED: chest pain (Severity: critical)".to_string()
        )));
        let logs = logs(&events);
        assert_eq!(logs[0].message, "EMERGENCY: chest pain");
        assert_eq!(logs[0].kind, LogKind::Alert);
    }

    #[test]
    fn test_manage_device_message_includes_value_when_present() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let with_value = router.dispatch(&call(
            MANAGE_DEVICE,
            json!({"deviceType": "thermostat", "action": "set_temperature", "value": "21C"}),
        ));
        assert_eq!(
            with_value.result["message"],
            "Device: set_temperature thermostat (21C)"
        );
        let without = router.dispatch(&call(
            MANAGE_DEVICE,
            json!({"deviceType": "light", "action": "turn_off"}),
        ));
        assert_eq!(without.result["message"], "Device: turn_off light");
        assert_eq!(without.result["status"], "success");

        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::Action("Device: turn_off light".to_string())));
    }

    #[test]
    fn test_fall_report_rounds_confidence() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let result = router.dispatch(&call(
            REPORT_FALL,
            json!({"confidence": 0.876, "visualDescription": "User slumped from chair"}),
        ));
        assert_eq!(
            result.result,
            json!({"status": "emergency_services_contacted", "family_notified": true})
        );
        let events = drain_ui(&mut rx);
        assert_eq!(
            logs(&events)[0].message,
            "FALL DETECTED (88%): User slumped from chair"
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::BlockingAlert(msg) if msg.contains("User slumped from chair"))));
    }

    #[test]
    fn test_verified_medication_is_marked_taken() {
        let (mut ctx, _cues) = tool_context();
        ctx.medications = MedicationList::new(vec![Medication {
            id: String::new(),
            name: "Lisinopril".to_string(),
            dosage: "10mg".to_string(),
            frequency: "Daily".to_string(),
            time_of_day: "Morning".to_string(),
            status: MedicationStatus::Pending,
            last_taken: None,
        }]);
        let meds = ctx.medications.clone();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let result = router.dispatch(&call(
            VERIFY_MEDICATION,
            json!({"medicationName": "Lisinopril", "visualConfirmation": true}),
        ));
        assert_eq!(result.result, json!({"status": "logged", "verification": true}));
        assert_eq!(meds.snapshot()[0].status, MedicationStatus::Taken);
        assert!(meds.snapshot()[0].last_taken.is_some());

        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::MedicationVerified("Lisinopril".to_string())));
        assert!(events.contains(&UiEvent::Action(
            "Meds Check: Lisinopril - VERIFIED".to_string()
        )));
        assert_eq!(logs(&events)[0].kind, LogKind::Text);
    }

    #[test]
    fn test_unseen_medication_logs_alert_without_marking() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let result = router.dispatch(&call(
            VERIFY_MEDICATION,
            json!({"medicationName": "Metformin", "visualConfirmation": false}),
        ));
        assert_eq!(result.result["verification"], false);
        let events = drain_ui(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, UiEvent::MedicationVerified(_))));
        let logs = logs(&events);
        assert_eq!(logs[0].message, "Meds Check: Metformin - NOT SEEN");
        assert_eq!(logs[0].kind, LogKind::Alert);
    }

    #[test]
    fn test_health_metric_banner_only_when_critical() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        router.dispatch(&call(
            LOG_HEALTH_METRIC,
            json!({"metric": "posture", "status": "concern", "observation": "slouching"}),
        ));
        let events = drain_ui(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, UiEvent::Action(_))));
        assert_eq!(
            logs(&events)[0].message,
            "Health Log [posture]: CONCERN - slouching"
        );

        router.dispatch(&call(
            LOG_HEALTH_METRIC,
            json!({"metric": "mobility", "status": "critical", "observation": "unsteady"}),
        ));
        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::Action("Health Warning: mobility".to_string())));
    }

    #[test]
    fn test_distress_level_selects_follow_up() {
        let (ctx, _cues) = tool_context();
        let router = ToolRouter::new(ctx);

        let high = router.dispatch(&call(
            ANALYZE_DISTRESS,
            json!({"detectedPattern": "isolation", "distressLevel": "high"}),
        ));
        assert_eq!(high.result["action"], "notify_family");
        let low = router.dispatch(&call(
            ANALYZE_DISTRESS,
            json!({"detectedPattern": "sighing", "distressLevel": "low"}),
        ));
        assert_eq!(low.result["action"], "monitor");
    }

    #[test]
    fn test_obstacles_cue_only_urgent_sides() {
        let (ctx, cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);

        let result = router.dispatch(&call(
            REPORT_OBSTACLES,
            json!({"obstacles": [
                {"object": "Chair", "priority": "critical", "direction": "left"},
                {"object": "Bag", "priority": "low", "direction": "right"},
                {"object": "Wall", "priority": "medium", "direction": "center"}
            ]}),
        ));
        assert_eq!(
            result.result,
            json!({"status": "obstacles_processed_with_spatial_audio"})
        );
        assert_eq!(cues.played(), vec![SpatialChannel::Left]);

        let events = drain_ui(&mut rx);
        let detected = events
            .iter()
            .find_map(|e| match e {
                UiEvent::ObstaclesDetected(list) => Some(list.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(detected.len(), 3);
        assert!(detected.iter().all(|o| !o.id.is_empty()));
    }

    #[test]
    fn test_obstacles_on_both_sides_cue_both() {
        let (ctx, cues) = tool_context();
        let router = ToolRouter::new(ctx);
        router.dispatch(&call(
            REPORT_OBSTACLES,
            json!({"obstacles": [
                {"object": "Stairs", "priority": "medium", "direction": "right"},
                {"object": "Door", "priority": "critical", "direction": "left"}
            ]}),
        ));
        assert_eq!(cues.played(), vec![SpatialChannel::Left, SpatialChannel::Right]);
    }

    #[test]
    fn test_gesture_banner_is_uppercase() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);
        router.dispatch(&call(REPORT_GESTURE, json!({"gesture": "thumbs_up"})));

        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::GestureDetected(Gesture::ThumbsUp)));
        assert!(events.contains(&UiEvent::Action("Gesture: THUMBS_UP".to_string())));
    }

    #[test]
    fn test_memory_save_then_recall() {
        let (ctx, _cues) = tool_context();
        let router = ToolRouter::new(ctx);

        let saved = router.dispatch(&call(
            SAVE_MEMORY,
            json!({"category": "family", "fact": "Granddaughter Mia visits on Sundays"}),
        ));
        assert_eq!(saved.result, json!({"status": "memory_persisted"}));
        router.dispatch(&call(
            SAVE_MEMORY,
            json!({"category": "preference", "fact": "Likes Mia's apple pie"}),
        ));

        let found = router.dispatch(&call(RECALL_MEMORY, json!({"query": "mia"})));
        assert_eq!(found.result["found"], true);
        assert_eq!(
            found.result["memories"],
            "Granddaughter Mia visits on Sundays; Likes Mia's apple pie"
        );

        let missing = router.dispatch(&call(RECALL_MEMORY, json!({"query": "boat"})));
        assert_eq!(missing.result, json!({"found": false, "memories": ""}));
    }

    #[test]
    fn test_drug_interaction_alert_text() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);
        router.dispatch(&call(
            REPORT_DRUG_INTERACTION,
            json!({
                "medications": ["Warfarin", "Aspirin"],
                "severity": "severe",
                "interactionDetail": "Bleeding risk"
            }),
        ));
        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::BlockingAlert(
            "DRUG INTERACTION: Warfarin + Aspirin - SEVERE\n\nBleeding risk".to_string()
        )));
    }

    #[test]
    fn test_family_notification_event() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);
        let result = router.dispatch(&call(
            NOTIFY_FAMILY,
            json!({"alertType": "medication_missed", "message": "Morning dose missed", "priority": "high"}),
        ));
        assert_eq!(result.result["status"], "notification_sent");
        assert!(result.result["timestamp"].is_string());

        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::FamilyNotification {
            title: "SafeCompanion Alert".to_string(),
            body: "Morning dose missed".to_string(),
        }));
        assert!(events.contains(&UiEvent::Action(
            "Family Notified: medication_missed".to_string()
        )));
    }

    #[test]
    fn test_pain_level_prints_as_integer() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);
        router.dispatch(&call(
            LOG_PAIN,
            json!({"location": "lower back", "severity": 7, "description": "dull ache"}),
        ));
        assert_eq!(
            logs(&drain_ui(&mut rx))[0].message,
            "Pain Log: lower back (Level 7) - dull ache"
        );
    }

    #[test]
    fn test_exercise_without_reason() {
        let (ctx, _cues) = tool_context();
        let mut rx = ctx.ui.subscribe();
        let router = ToolRouter::new(ctx);
        let result = router.dispatch(&call(
            RECOMMEND_EXERCISE,
            json!({"painLocation": "knee", "recommendation": "Heat pad"}),
        ));
        assert_eq!(result.result, json!({"status": "suggestion_displayed"}));
        let events = drain_ui(&mut rx);
        assert!(events.contains(&UiEvent::Action("Therapy Suggestion: Heat pad".to_string())));
        assert_eq!(logs(&events)[0].message, "Therapy for knee: Heat pad ()");
    }

    #[test]
    fn test_simple_acknowledgements() {
        let (ctx, _cues) = tool_context();
        let router = ToolRouter::new(ctx);
        let cases = [
            (SET_REMINDER, json!({"task": "Water plants", "time": "5pm"}), "confirmed"),
            (
                GENERATE_VISUAL_AID,
                json!({"description": "knee joint", "reasoning": "shows the ligament"}),
                "generating",
            ),
            (
                SET_ENVIRONMENT_MODE,
                json!({"mode": "reading", "reason": "holding a book"}),
                "scene_activated",
            ),
            (UPDATE_LANGUAGE, json!({"language": "Spanish"}), "language_updated"),
            (
                REPORT_EMOTIONAL_STATE,
                json!({"userEmotion": "Joy", "confidence": 0.9, "adaptationStrategy": "match energy"}),
                "dashboard_updated",
            ),
        ];
        for (name, args, status) in cases {
            let result = router.dispatch(&call(name, args));
            assert_eq!(result.result, json!({ "status": status }), "{}", name);
        }
    }
}
