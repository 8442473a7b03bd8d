use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spline::SplineBoundary;

/// Spline construction and evaluation settings.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[schemars(title = "Interpolation", inline)]
#[serde(default)]
pub struct InterpolationOptions {
    /// End condition for every fitted series.
    #[schemars(title = "Boundary")]
    pub boundary: SplineBoundary,
    /// Fold evaluated positions back into the primary box. Closed loops
    /// that were unwrapped are folded regardless, so the loop seam joins.
    #[schemars(title = "Wrap Into Box")]
    pub wrap_into_box: bool,
}
