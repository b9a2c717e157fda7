//! The reel spin: a weighted winner picked up front, then a step count that
//! is guaranteed to land on it.
//!
//! The engine never decides the outcome while spinning. It only paces the
//! pre-computed steps against the eased progress curve and, when time runs
//! out, pins the visible index to the winner.

use mc_core::catalog::SpinWeights;
use mc_core::easing::target_step;
use mc_core::random::RandomSource;
use mc_core::time::ms_to_us;

use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPlan {
    pub winner_index: usize,
    pub start_index: usize,
    pub full_rotations: u32,
    pub offset: usize,
    pub total_steps: u64,
}

/// Steps from `current` to `winner` after `full_rotations` complete laps.
///
/// Returns `(offset, total_steps)` where `(current + total_steps) % len == winner`.
pub fn compute_total_steps(
    current: usize,
    winner: usize,
    len: usize,
    full_rotations: u32,
) -> (usize, u64) {
    if len == 0 {
        return (0, 0);
    }
    let offset = (winner % len + len - current % len) % len;
    let total = u64::from(full_rotations) * len as u64 + offset as u64;
    (offset, total)
}

/// Pick the winner, then the lap count.
///
/// The draw order is fixed (winner first, extra laps second) so a scripted
/// random source reproduces a spin exactly.
pub fn plan_spin(
    weights: &SpinWeights,
    current: usize,
    min_full_rotations: u32,
    max_extra_rotations: u32,
    rng: &mut dyn RandomSource,
) -> SpinPlan {
    let winner_index = weights.select(rng);
    let extra = rng.next_below(max_extra_rotations.saturating_add(1));
    let full_rotations = min_full_rotations + extra;
    let (offset, total_steps) =
        compute_total_steps(current, winner_index, weights.len(), full_rotations);
    SpinPlan {
        winner_index,
        start_index: current,
        full_rotations,
        offset,
        total_steps,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinTiming {
    pub duration_ms: f64,
    /// The reel sound is shorter than the spin and has to repeat.
    pub loop_audio: bool,
}

/// Spin length from the reel sound's duration, if one is known.
pub fn spin_timing(reel_duration_ms: Option<f64>, config: &SessionConfig) -> SpinTiming {
    let effective = reel_duration_ms
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d - config.silent_tail_ms - config.end_padding_ms)
        .filter(|d| *d > 0.0);

    match effective {
        Some(effective) => {
            let duration_ms = effective
                .min(config.spin_base_duration_ms)
                .max(config.min_spin_ms);
            SpinTiming {
                duration_ms,
                loop_audio: duration_ms > effective,
            }
        }
        None => SpinTiming {
            duration_ms: config.spin_base_duration_ms,
            loop_audio: false,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinRun {
    pub plan: SpinPlan,
    pub started_at_us: u64,
    pub duration_us: u64,
    pub steps_taken: u64,
}

impl SpinRun {
    pub fn progress(&self, now_us: u64) -> f64 {
        if self.duration_us == 0 {
            return 1.0;
        }
        (now_us.saturating_sub(self.started_at_us) as f64 / self.duration_us as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinTick {
    Idle,
    /// Still running; `advanced` steps were taken this frame.
    Running { advanced: u64 },
    Finished { winner_index: usize },
}

pub struct SpinEngine {
    reel_len: usize,
    current_index: usize,
    run: Option<SpinRun>,
}

impl SpinEngine {
    pub fn new(reel_len: usize) -> Self {
        Self {
            reel_len,
            current_index: 0,
            run: None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn reel_len(&self) -> usize {
        self.reel_len
    }

    pub fn run(&self) -> Option<&SpinRun> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Start a run, replacing any run in flight.
    pub fn start(&mut self, plan: SpinPlan, duration_ms: f64, now_us: u64) {
        if self.run.is_some() {
            log::debug!("Replacing in-flight spin run");
        }
        self.current_index = plan.start_index;
        self.run = Some(SpinRun {
            plan,
            started_at_us: now_us,
            duration_us: ms_to_us(duration_ms),
            steps_taken: 0,
        });
        log::info!(
            "Spin started: winner={} laps={} steps={} duration={:.0}ms",
            plan.winner_index,
            plan.full_rotations,
            plan.total_steps,
            duration_ms
        );
    }

    pub fn cancel(&mut self) {
        if self.run.take().is_some() {
            log::debug!("Spin run cancelled at index {}", self.current_index);
        }
    }

    pub fn tick(&mut self, now_us: u64) -> SpinTick {
        let Some(run) = self.run.as_mut() else {
            return SpinTick::Idle;
        };
        let progress = run.progress(now_us);
        if progress >= 1.0 {
            let winner_index = run.plan.winner_index;
            self.current_index = winner_index;
            self.run = None;
            return SpinTick::Finished { winner_index };
        }

        let target = target_step(progress, run.plan.total_steps);
        let mut advanced = 0;
        while run.steps_taken < target {
            run.steps_taken += 1;
            advanced += 1;
            self.current_index = (self.current_index + 1) % self.reel_len.max(1);
            log::trace!("Reel step {} -> index {}", run.steps_taken, self.current_index);
        }
        SpinTick::Running { advanced }
    }
}
