use web_time::{Duration, Instant};

/// Host-loop frame clock: elapsed time per frame, smoothed FPS, a
/// once-per-second frame count, and optional frame limiting.
pub struct FrameTiming {
    /// Minimum frame duration based on target FPS (zero = unlimited)
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Duration of the last completed frame
    last_delta: Duration,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
    /// Start of the current one-second counting window
    window_start: Instant,
    /// Frames finished inside the current window
    window_frames: u32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };
        let now = Instant::now();

        Self {
            min_frame_duration,
            last_frame: now,
            last_delta: Duration::ZERO,
            smoothed_fps: 60.0,
            smoothing: 0.05,
            window_start: now,
            window_frames: 0,
        }
    }

    /// Whether enough time has passed since the last frame to run another.
    pub fn should_render(&self) -> bool {
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Time left before the frame limit allows the next frame.
    pub fn time_until_next_frame(&self) -> Duration {
        self.min_frame_duration
            .saturating_sub(self.last_frame.elapsed())
    }

    /// Call after each frame. Returns the time since the previous call,
    /// which is what the playback clock advances by.
    pub fn end_frame(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.last_delta = elapsed;
        self.window_frames += 1;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
        elapsed
    }

    /// Frames finished during the last full second, once per second.
    pub fn take_second_report(&mut self) -> Option<u32> {
        if self.window_start.elapsed() < Duration::from_secs(1) {
            return None;
        }
        let frames = self.window_frames;
        self.window_frames = 0;
        self.window_start = Instant::now();
        Some(frames)
    }

    /// Duration of the last completed frame.
    pub fn last_delta(&self) -> Duration {
        self.last_delta
    }

    /// Get the current FPS (smoothed)
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_always_renders() {
        let timing = FrameTiming::new(0);
        assert!(timing.should_render());
        assert_eq!(timing.time_until_next_frame(), Duration::ZERO);
    }

    #[test]
    fn limited_waits_for_frame_budget() {
        let timing = FrameTiming::new(1);
        assert!(!timing.should_render());
        assert!(timing.time_until_next_frame() > Duration::from_millis(500));
    }

    #[test]
    fn end_frame_reports_elapsed_time() {
        let mut timing = FrameTiming::new(0);
        std::thread::sleep(Duration::from_millis(5));
        let dt = timing.end_frame();
        assert!(dt >= Duration::from_millis(5));
        assert_eq!(timing.last_delta(), dt);
        assert!(timing.fps() > 0.0);
    }

    #[test]
    fn second_report_waits_a_full_second() {
        let mut timing = FrameTiming::new(0);
        let _ = timing.end_frame();
        assert_eq!(timing.take_second_report(), None);
    }
}
