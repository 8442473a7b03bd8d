//! Commands a host sends to the playback clock.

/// Every operation the playback clock understands.
///
/// Hosts map key presses, GUI buttons or scripted input to these and pass
/// them to [`PlaybackClock::execute`](super::PlaybackClock::execute).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    /// Toggle between playing and paused.
    TogglePause,
    /// Stop advancing.
    Pause,
    /// Resume advancing.
    Resume,
    /// Flip the direction of travel.
    Reverse,
    /// Pause and step one increment forward.
    StepForward,
    /// Pause and step one increment backward.
    StepBackward,
    /// Jump to phase zero.
    Reset,
    /// Set the signed rate (phase units per second).
    SetRate(f32),
    /// Multiply the current speed.
    ScaleRate(f32),
    /// Jump to a phase (wrapped into `[0, 1)`).
    Seek(f32),
}
