//! Easing curves shared by the lid animation and the reel.

/// Portion of the spin spent in the near-linear cruise phase.
pub const SPIN_CRUISE_PORTION: f64 = 0.70;
/// Fraction of the total steps covered during the cruise phase.
pub const SPIN_CRUISE_COVERAGE: f64 = 0.90;

/// Quadratic ease-in-out used for the pivot lid.
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Quintic ease-out: fast start, long settle.
pub fn ease_out_quint(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    1.0 - (1.0 - x).powi(5)
}

/// Slot-machine progress curve: near-linear cruise, then a hard slowdown.
pub fn spin_progress(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < SPIN_CRUISE_PORTION {
        SPIN_CRUISE_COVERAGE * (p / SPIN_CRUISE_PORTION)
    } else {
        let x = (p - SPIN_CRUISE_PORTION) / (1.0 - SPIN_CRUISE_PORTION);
        SPIN_CRUISE_COVERAGE + (1.0 - SPIN_CRUISE_COVERAGE) * ease_out_quint(x)
    }
}

/// Step index the reel should have reached at `progress`.
pub fn target_step(progress: f64, total_steps: u64) -> u64 {
    let eased = spin_progress(progress);
    let step = (eased * (total_steps + 1) as f64).floor() as u64;
    step.min(total_steps)
}
