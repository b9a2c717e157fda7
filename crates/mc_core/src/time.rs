use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Frame clock driving every timed operation in the session.
///
/// Time is kept as a monotonically increasing microsecond counter (`now_us`)
/// so that waits, lid motions and spin runs compare integer timestamps
/// instead of accumulating floating-point drift.
pub struct TimeState {
    /// Largest wall-clock delta a single frame may contribute.
    pub max_frame_dt: f64,
    now_us: u64,
    pub frame_count: u64,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self {
            max_frame_dt: 0.25,
            now_us: 0,
            frame_count: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    /// Current session time in microseconds.
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(dt);
    }

    /// Advance the clock by `dt` seconds without consulting the wall clock.
    pub fn advance(&mut self, dt: f64) {
        self.real_dt = dt.max(0.0);

        // A hitch (window drag, debugger pause) must not teleport a spin to its end.
        if self.real_dt > self.max_frame_dt {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                self.real_dt * 1000.0,
                self.max_frame_dt * 1000.0
            );
            self.real_dt = self.max_frame_dt;
        }

        self.now_us += (self.real_dt * 1_000_000.0).round() as u64;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a millisecond duration (as written in config files) to microseconds.
pub fn ms_to_us(ms: f64) -> u64 {
    if ms.is_finite() && ms > 0.0 {
        (ms * 1000.0).round() as u64
    } else {
        0
    }
}
