//! Host-side helpers.

/// Frame pacing and FPS measurement for the host loop.
pub mod frame_timing;
