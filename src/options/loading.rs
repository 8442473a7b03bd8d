use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::trajectory::TrajectoryFormat;

/// How trajectory files are read and preprocessed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Loading", inline)]
#[serde(default)]
pub struct LoadOptions {
    /// On-disk format; `auto` decides from the extension and content.
    #[schemars(title = "Format")]
    pub format: TrajectoryFormat,
    /// Append the first timestep after the last so playback loops
    /// seamlessly.
    #[schemars(title = "Close Loop")]
    pub close_loop: bool,
    /// Undo periodic-boundary jumps before fitting.
    #[schemars(title = "Unwrap Periodic Boundaries")]
    pub unwrap_periodic: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: TrajectoryFormat::Auto,
            close_loop: true,
            unwrap_periodic: true,
        }
    }
}
