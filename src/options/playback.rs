use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Playback clock settings. Rates are in phase units per second, where one
/// unit is the whole trajectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Playback", inline)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Initial signed rate; negative plays in reverse.
    #[schemars(title = "Rate", range(min = -1.0, max = 1.0), extend("step" = 0.001))]
    pub rate: f32,
    /// Upper bound on the rate magnitude.
    #[schemars(skip)]
    pub max_rate: f32,
    /// Phase moved by a single step.
    #[schemars(title = "Step", range(min = 0.0, max = 0.1), extend("step" = 0.0001))]
    pub step_increment: f32,
    /// Start paused on the first timestep.
    #[schemars(title = "Start Paused")]
    pub start_paused: bool,
    /// Frame limit for the host loop (0 = unlimited).
    #[schemars(title = "Target FPS", range(min = 0, max = 240))]
    pub target_fps: u32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            // 1e-4 per frame at 60 FPS.
            rate: 0.006,
            max_rate: 1.0,
            step_increment: 0.0001,
            start_paused: false,
            target_fps: 60,
        }
    }
}
