//! Playback clock and the normalized phase it drives.
//!
//! The clock owns a [`Phase`] in `[0, 1)` that maps onto the full timestep
//! range of the loaded trajectory. It advances (or reverses) with elapsed
//! time, supports pause/step/reset, and loops forever.

mod clock;
mod command;
mod phase;

pub use clock::{Direction, PlaybackClock, PlaybackState};
pub use command::PlaybackCommand;
pub use phase::Phase;
