//! Crate lid controller.
//!
//! The lid is driven either by clips from the loaded model or, when the
//! model is missing or has no clips, by a single pivot rotation. The driver
//! is chosen once at startup; everything else branches on it.
//!
//! `is_open` flips only when a motion completes in [`CrateController::tick`].
//! Starting a motion replaces any motion already in flight.

use mc_core::clip::{AnimationClip, ClipPlayback};
use mc_core::easing::ease_in_out;
use mc_core::time::ms_to_us;

#[derive(Debug, Clone, PartialEq)]
pub enum CrateDriver {
    ClipDriven {
        open: AnimationClip,
        /// Dedicated close clip; `None` plays `open` in reverse.
        close: Option<AnimationClip>,
    },
    PivotDriven {
        open_angle: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidTarget {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidRequest {
    /// The lid was already at rest in the requested position.
    AlreadyThere,
    Started,
}

#[derive(Debug, Clone, PartialEq)]
enum LidMotion {
    Clip {
        playback: ClipPlayback,
        target: LidTarget,
    },
    Pivot {
        from: f32,
        to: f32,
        started_at_us: u64,
        duration_us: u64,
        target: LidTarget,
    },
}

impl LidMotion {
    fn target(&self) -> LidTarget {
        match self {
            Self::Clip { target, .. } | Self::Pivot { target, .. } => *target,
        }
    }

    fn angle(&self, now_us: u64) -> f32 {
        match self {
            Self::Clip { playback, .. } => playback.lid_angle(now_us),
            Self::Pivot {
                from,
                to,
                started_at_us,
                duration_us,
                ..
            } => {
                let t = if *duration_us == 0 {
                    1.0
                } else {
                    now_us.saturating_sub(*started_at_us) as f64 / *duration_us as f64
                };
                from + (to - from) * ease_in_out(t) as f32
            }
        }
    }

    fn is_finished(&self, now_us: u64) -> bool {
        match self {
            Self::Clip { playback, .. } => playback.is_finished(now_us),
            Self::Pivot {
                started_at_us,
                duration_us,
                ..
            } => now_us.saturating_sub(*started_at_us) >= *duration_us,
        }
    }
}

pub struct CrateController {
    driver: CrateDriver,
    fallback: bool,
    is_open: bool,
    motion: Option<LidMotion>,
    rest_angle: f32,
    pivot_duration_ms: f64,
}

impl CrateController {
    pub fn new(driver: CrateDriver, fallback: bool, pivot_duration_ms: f64) -> Self {
        Self {
            driver,
            fallback,
            is_open: false,
            motion: None,
            rest_angle: 0.0,
            pivot_duration_ms,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// The crate in use is the procedural stand-in for a missing model.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Open the lid over `target_ms`, or the clip's natural length (pivot
    /// default) when `None`.
    pub fn open(&mut self, target_ms: Option<f64>, now_us: u64) -> LidRequest {
        match &self.motion {
            None if self.is_open => return LidRequest::AlreadyThere,
            Some(m) if m.target() == LidTarget::Open => return LidRequest::Started,
            _ => {}
        }
        let target_us = target_ms.map(ms_to_us).filter(|us| *us > 0);
        let from = self.lid_angle(now_us);
        let motion = match &self.driver {
            CrateDriver::ClipDriven { open, .. } => LidMotion::Clip {
                playback: ClipPlayback::start(open.clone(), now_us, target_us, false),
                target: LidTarget::Open,
            },
            CrateDriver::PivotDriven { open_angle } => LidMotion::Pivot {
                from,
                to: *open_angle,
                started_at_us: now_us,
                duration_us: target_us.unwrap_or_else(|| ms_to_us(self.pivot_duration_ms)),
                target: LidTarget::Open,
            },
        };
        log::debug!("Lid opening");
        self.motion = Some(motion);
        LidRequest::Started
    }

    pub fn close(&mut self, now_us: u64) -> LidRequest {
        match &self.motion {
            None if !self.is_open => return LidRequest::AlreadyThere,
            Some(m) if m.target() == LidTarget::Closed => return LidRequest::Started,
            _ => {}
        }
        let from = self.lid_angle(now_us);
        let motion = match &self.driver {
            CrateDriver::ClipDriven {
                close: Some(close), ..
            } => LidMotion::Clip {
                playback: ClipPlayback::start(close.clone(), now_us, None, false),
                target: LidTarget::Closed,
            },
            CrateDriver::ClipDriven { open, close: None } => LidMotion::Clip {
                playback: ClipPlayback::start(open.clone(), now_us, None, true),
                target: LidTarget::Closed,
            },
            CrateDriver::PivotDriven { .. } => LidMotion::Pivot {
                from,
                to: 0.0,
                started_at_us: now_us,
                duration_us: ms_to_us(self.pivot_duration_ms),
                target: LidTarget::Closed,
            },
        };
        log::debug!("Lid closing");
        self.motion = Some(motion);
        LidRequest::Started
    }

    /// Finish a motion whose time is up. Returns where the lid came to rest.
    pub fn tick(&mut self, now_us: u64) -> Option<LidTarget> {
        let finished = self.motion.as_ref().is_some_and(|m| m.is_finished(now_us));
        if !finished {
            return None;
        }
        let motion = self.motion.take()?;
        self.rest_angle = motion.angle(now_us);
        let target = motion.target();
        self.is_open = target == LidTarget::Open;
        log::debug!("Lid came to rest {:?}", target);
        Some(target)
    }

    /// Current lid rotation in radians.
    pub fn lid_angle(&self, now_us: u64) -> f32 {
        self.motion
            .as_ref()
            .map_or(self.rest_angle, |m| m.angle(now_us))
    }

    /// How far open the lid is, 0 closed to 1 fully open.
    pub fn openness(&self, now_us: u64) -> f32 {
        let full = match &self.driver {
            CrateDriver::ClipDriven { open, .. } => open.end_angle(),
            CrateDriver::PivotDriven { open_angle } => *open_angle,
        };
        if full.abs() <= f32::EPSILON {
            return if self.is_open { 1.0 } else { 0.0 };
        }
        (self.lid_angle(now_us) / full).clamp(0.0, 1.0)
    }
}
