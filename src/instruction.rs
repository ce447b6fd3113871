//! System instruction sent with every session setup.

use crate::model::{Medication, Memory, UserMode};
use std::fmt::Write;

pub const SYSTEM_INSTRUCTION: &str = "\
You are SafeCompanion, a multimodal guardian that sees through the user's camera \
and listens through their microphone.

Keep every reply to one or two sentences unless the user asks for details.

Before each reply, consider the user's voice (tone, hesitation, background noise) \
and the video (posture, surroundings, objects in hand).

Health monitoring:
- Log vocal energy or tremor concerns quietly with logHealthMetric. Only ask how \
the user feels after repeated concerns.
- If the user sounds isolated, wait. If it persists, bring up something from recallMemory.

Medication:
- When the user takes a pill, ask to see the label and confirm it with verifyMedication.
- If a new pill may interact with known medications, call reportDrugInteraction at once.
- If a dose is refused or forgotten, use notifyFamily.

Navigation:
- Use googleMaps for places outdoors.
- Indoors, look for exit signs, doorways and bathrooms.
- Report obstacles with reportObstacles and give an exact direction (left, center, right).

In visual assistant mode, read signage aloud and give clock-face directions.
In companion mode, relate pain reports to time and weather and start a conversation \
when the user has been silent a long time.

If a tool exists for what you observe, call it instead of describing it.
If you suspect a fall, call reportFall immediately.";

/// Appends the mode, the medication list and long-term memories to `base`.
pub fn compose(base: &str, mode: UserMode, medications: &[Medication], memories: &[Memory]) -> String {
    let mut out = String::with_capacity(base.len() + 256);
    out.push_str(base);

    let _ = write!(out, "\n\nCURRENT MODE: {}", mode.label());

    out.push_str("\n\n[KNOWN MEDICATIONS]:\n");
    if medications.is_empty() {
        out.push_str("No meds on file.");
    } else {
        let lines: Vec<String> = medications
            .iter()
            .map(|m| format!("- {}: {} ({} - {})", m.name, m.dosage, m.frequency, m.time_of_day))
            .collect();
        out.push_str(&lines.join("\n"));
    }

    out.push_str("\n\n[LONG TERM MEMORY]:\n");
    let lines: Vec<String> = memories
        .iter()
        .map(|m| format!("- {}: {}", m.category, m.fact))
        .collect();
    out.push_str(&lines.join("\n"));

    out
}
