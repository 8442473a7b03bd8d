//! Playback clock: phase advance, pause, direction and rate control.

use web_time::Duration;

use super::command::PlaybackCommand;
use super::phase::Phase;
use crate::options::PlaybackOptions;

/// Direction of travel through the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing phase.
    Forward,
    /// Decreasing phase.
    Reverse,
}

impl Direction {
    /// `+1.0` forward, `-1.0` reverse.
    pub fn sign(self) -> f32 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }

    /// The other direction.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Observable clock state. There is no terminal state; playback loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Advancing in the given direction.
    Playing(Direction),
    /// Holding the current phase.
    Paused,
}

/// Drives the playback phase from elapsed wall time.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    phase: Phase,
    /// Phase units per second (one unit = the whole trajectory).
    speed: f32,
    direction: Direction,
    paused: bool,
    step_increment: f32,
    max_speed: f32,
}

impl PlaybackClock {
    /// Clock configured from `options`, starting at phase zero.
    pub fn new(options: &PlaybackOptions) -> Self {
        let max_speed = options.max_rate.abs().max(f32::EPSILON);
        let mut clock = Self {
            phase: Phase::ZERO,
            speed: 0.0,
            direction: Direction::Forward,
            paused: options.start_paused,
            step_increment: options.step_increment.abs(),
            max_speed,
        };
        clock.set_rate(options.rate);
        clock
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing(self.direction)
        }
    }

    /// Whether the clock is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Signed rate in phase units per second.
    pub fn rate(&self) -> f32 {
        self.speed * self.direction.sign()
    }

    /// Fixed increment used by the step operations.
    pub fn step_increment(&self) -> f32 {
        self.step_increment
    }

    /// Advance by `dt` of wall time. A paused clock does not move.
    pub fn advance(&mut self, dt: Duration) -> Phase {
        if !self.paused {
            self.phase = self.phase.offset(self.rate() * dt.as_secs_f32());
        }
        self.phase
    }

    /// Toggle between playing and paused.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Stop advancing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume advancing.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Set the signed rate; the sign picks the direction, the magnitude is
    /// clamped to the configured maximum. A zero rate keeps the current
    /// direction.
    pub fn set_rate(&mut self, rate: f32) {
        if !rate.is_finite() {
            return;
        }
        if rate < 0.0 {
            self.direction = Direction::Reverse;
        } else if rate > 0.0 {
            self.direction = Direction::Forward;
        }
        self.speed = rate.abs().min(self.max_speed);
    }

    /// Multiply the speed by `factor` (clamped), keeping the direction.
    pub fn scale_rate(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.speed = (self.speed * factor).min(self.max_speed);
        }
    }

    /// Flip the playback direction.
    pub fn reverse(&mut self) {
        self.direction = self.direction.flipped();
    }

    /// Pause and move one increment forward.
    pub fn step_forward(&mut self) {
        self.paused = true;
        self.phase = self.phase.offset(self.step_increment);
    }

    /// Pause and move one increment backward.
    pub fn step_backward(&mut self) {
        self.paused = true;
        self.phase = self.phase.offset(-self.step_increment);
    }

    /// Jump back to the first timestep.
    pub fn reset(&mut self) {
        self.phase = Phase::ZERO;
    }

    /// Jump to `phase`.
    pub fn seek(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Change the step increment, e.g. to one recorded timestep
    /// (`1 / segments`) once a trajectory is loaded.
    pub fn set_step_increment(&mut self, increment: f32) {
        if increment.is_finite() {
            self.step_increment = increment.abs();
        }
    }

    /// Apply a command.
    pub fn execute(&mut self, command: PlaybackCommand) {
        log::debug!("playback command: {command:?}");
        match command {
            PlaybackCommand::TogglePause => self.toggle_pause(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Resume => self.resume(),
            PlaybackCommand::Reverse => self.reverse(),
            PlaybackCommand::StepForward => self.step_forward(),
            PlaybackCommand::StepBackward => self.step_backward(),
            PlaybackCommand::Reset => self.reset(),
            PlaybackCommand::SetRate(rate) => self.set_rate(rate),
            PlaybackCommand::ScaleRate(factor) => self.scale_rate(factor),
            PlaybackCommand::Seek(t) => self.seek(Phase::new(t)),
        }
    }
}
