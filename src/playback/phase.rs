//! Normalized loop time.

/// Normalized playback time in `[0, 1)`.
///
/// Every constructor wraps its input with `t - floor(t)`. Rounding can make
/// that expression return exactly `1.0` for tiny negative inputs; those are
/// folded to `0.0` so the invariant holds strictly. Non-finite inputs map
/// to `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Phase(f32);

impl Phase {
    /// Start of the trajectory.
    pub const ZERO: Self = Self(0.0);

    /// Wrap `t` into `[0, 1)`.
    pub fn new(t: f32) -> Self {
        Self(Self::wrap(t))
    }

    /// Phase at which recorded timestep `step` of `timesteps` is reached.
    pub fn of_timestep(step: usize, timesteps: usize) -> Self {
        if timesteps < 2 {
            return Self::ZERO;
        }
        Self::new(step as f32 / (timesteps - 1) as f32)
    }

    /// Raw value, always in `[0, 1)`.
    pub fn value(self) -> f32 {
        self.0
    }

    /// Phase moved by `delta` (either sign), wrapped.
    #[must_use]
    pub fn offset(self, delta: f32) -> Self {
        Self::new(self.0 + delta)
    }

    /// The wrap rule shared by every constructor.
    pub fn wrap(t: f32) -> f32 {
        if !t.is_finite() {
            return 0.0;
        }
        let w = t - t.floor();
        if w >= 1.0 {
            0.0
        } else {
            w
        }
    }
}
