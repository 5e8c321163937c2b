use super::{string_arg, ToolExecutor};
use serde_json::{json, Map, Value};

/// Echoes a sound event back to the model; playback is the host's concern.
pub struct PlaySoundEffectTool;

impl ToolExecutor for PlaySoundEffectTool {
    fn name(&self) -> &'static str {
        "play_sound_effect"
    }

    fn execute(&self, arguments: &Map<String, Value>) -> Value {
        json!({
            "status": "ok",
            "event_name": string_arg(arguments, "event_name"),
            "intensity": string_arg(arguments, "intensity"),
            "playback_mode": "event_only",
        })
    }
}
