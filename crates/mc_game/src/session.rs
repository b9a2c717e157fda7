//! The unboxing session: one owned state machine polled once per frame.
//!
//! Intents arrive through [`Session::handle`]; timed work (lid motions,
//! sound waits, the spin run, the auto-close follow-up) advances in
//! [`Session::tick`]. Each locked state owns exactly one in-flight sequence
//! in the `phase` slot, and starting a new sequence replaces the slot, so a
//! superseded sequence can never apply its completion.

use mc_core::catalog::{Catalog, RewardItem, SpinWeights};
use mc_core::input::Intent;
use mc_core::media::{TimedWait, WaitAll};
use mc_core::random::RandomSource;
use mc_core::time::ms_to_us;

use crate::audio::{Sfx, SoundBank};
use crate::config::SessionConfig;
use crate::lid::CrateController;
use crate::spin::{plan_spin, spin_timing, SpinEngine, SpinPlan, SpinTick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Ready,
    Opening,
    Spinning,
    WinnerSelected,
    WinnerPendingClaim,
    Claiming,
    Closing,
    Claimed,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Opening => "OPENING",
            Self::Spinning => "SPINNING",
            Self::WinnerSelected => "WINNER SELECTED",
            Self::WinnerPendingClaim => "WINNER PENDING CLAIM",
            Self::Claiming => "CLAIMING",
            Self::Closing => "CLOSING",
            Self::Claimed => "CLAIMED",
        }
    }

    /// States during which every intent is dropped.
    pub fn is_locked(self) -> bool {
        matches!(
            self,
            Self::Opening | Self::Spinning | Self::Claiming | Self::Closing
        )
    }

    pub fn has_winner(self) -> bool {
        matches!(self, Self::WinnerSelected | Self::WinnerPendingClaim)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub at_us: u64,
}

/// Which controls the panel should enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub open: bool,
    pub close: bool,
    pub spin: bool,
    pub claim: bool,
}

/// A delayed action armed in one state and honoured only if still in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FollowUp {
    fires_at_us: u64,
    armed_in: SessionState,
}

/// Linear ramp of the winner glow between two levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowRamp {
    from: f32,
    to: f32,
    started_at_us: u64,
    duration_us: u64,
}

impl GlowRamp {
    fn at_rest(level: f32) -> Self {
        Self {
            from: level,
            to: level,
            started_at_us: 0,
            duration_us: 0,
        }
    }

    pub fn value(&self, now_us: u64) -> f32 {
        if self.duration_us == 0 {
            return self.to;
        }
        let t = (now_us.saturating_sub(self.started_at_us) as f32 / self.duration_us as f32)
            .clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

enum Phase {
    Idle,
    /// Spin requested while the lid was open; wait for it to shut.
    SpinClosingFirst,
    SpinAwaitMedia(WaitAll<Sfx>),
    SpinOpening(TimedWait<Sfx>),
    /// A lid motion plus a sound, then settle in `then`.
    LidAndSound {
        sound: TimedWait<Sfx>,
        then: SessionState,
    },
}

pub struct Session {
    state: SessionState,
    catalog: Catalog,
    weights: SpinWeights,
    rng: Box<dyn RandomSource>,
    lid: CrateController,
    spin: SpinEngine,
    sounds: SoundBank,
    config: SessionConfig,
    phase: Phase,
    follow_up: Option<FollowUp>,
    glow: GlowRamp,
    winner: Option<usize>,
    last_plan: Option<SpinPlan>,
    transitions: Vec<Transition>,
}

impl Session {
    pub fn new(
        catalog: Catalog,
        lid: CrateController,
        sounds: SoundBank,
        config: SessionConfig,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let weights = catalog.weights();
        let spin = SpinEngine::new(catalog.len());
        log::info!(
            "Session ready: catalog '{}' with {} items, {} crate",
            catalog.catalog_id,
            catalog.len(),
            if lid.is_fallback() { "fallback" } else { "model" }
        );
        Self {
            state: SessionState::Ready,
            catalog,
            weights,
            rng,
            lid,
            spin,
            sounds,
            config,
            phase: Phase::Idle,
            follow_up: None,
            glow: GlowRamp::at_rest(0.0),
            winner: None,
            last_plan: None,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lid(&self) -> &CrateController {
        &self.lid
    }

    pub fn spin(&self) -> &SpinEngine {
        &self.spin
    }

    /// Item currently on the reel.
    pub fn displayed_item(&self) -> Option<&RewardItem> {
        self.catalog.get(self.spin.current_index())
    }

    /// The last spin's winner, while it is still unclaimed or just claimed.
    pub fn winner(&self) -> Option<&RewardItem> {
        self.winner.and_then(|i| self.catalog.get(i))
    }

    pub fn last_plan(&self) -> Option<&SpinPlan> {
        self.last_plan.as_ref()
    }

    pub fn glow(&self, now_us: u64) -> f32 {
        self.glow.value(now_us)
    }

    pub fn status_line(&self) -> String {
        let suffix = if self.lid.is_fallback() {
            " (FALLBACK CRATE)"
        } else {
            ""
        };
        format!("Status: {}{}", self.state.label(), suffix)
    }

    pub fn controls(&self) -> Controls {
        let locked = self.state.is_locked();
        let open = self.lid.is_open();
        Controls {
            open: !locked
                && !open
                && matches!(self.state, SessionState::Ready | SessionState::Claimed),
            close: !locked
                && open
                && matches!(
                    self.state,
                    SessionState::Ready | SessionState::WinnerSelected | SessionState::Claimed
                ),
            spin: !locked,
            claim: self.state.has_winner(),
        }
    }

    /// Every transition since the last drain, oldest first.
    pub fn drain_transitions(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.transitions)
    }

    /// Apply a user intent. Returns whether it was accepted.
    pub fn handle(&mut self, intent: Intent, now_us: u64) -> bool {
        if self.state.is_locked() {
            log::debug!("Ignoring '{intent}' while {}", self.state);
            return false;
        }
        let accepted = match intent {
            Intent::RequestSpin => {
                self.begin_spin(now_us);
                true
            }
            Intent::RequestOpen
                if !self.lid.is_open()
                    && matches!(self.state, SessionState::Ready | SessionState::Claimed) =>
            {
                self.begin_open(now_us);
                true
            }
            Intent::RequestClose
                if self.lid.is_open()
                    && matches!(
                        self.state,
                        SessionState::Ready | SessionState::WinnerSelected | SessionState::Claimed
                    ) =>
            {
                self.begin_close(SessionState::Ready, now_us);
                true
            }
            Intent::RequestClaim if self.state.has_winner() => {
                self.begin_claim(now_us);
                true
            }
            _ => false,
        };
        if !accepted {
            log::debug!("Ignoring '{intent}' in {}", self.state);
        }
        accepted
    }

    /// Advance every timed operation to `now_us`.
    pub fn tick(&mut self, now_us: u64) {
        self.lid.tick(now_us);
        self.advance_phase(now_us);

        if let SpinTick::Finished { winner_index } = self.spin.tick(now_us) {
            self.finish_spin(winner_index, now_us);
        }

        if let Some(follow_up) = self.follow_up {
            if now_us >= follow_up.fires_at_us {
                self.follow_up = None;
                if self.state == follow_up.armed_in {
                    log::debug!("Auto-close firing");
                    self.begin_close(SessionState::WinnerPendingClaim, now_us);
                } else {
                    log::debug!(
                        "Auto-close armed in {} dropped in {}",
                        follow_up.armed_in,
                        self.state
                    );
                }
            }
        }
    }

    fn set_state(&mut self, to: SessionState, now_us: u64) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        self.follow_up = None;
        self.transitions.push(Transition { from, to, at_us: now_us });
        log::info!("Session {from} -> {to}");
    }

    fn ramp_glow(&mut self, to: f32, now_us: u64) {
        self.glow = GlowRamp {
            from: self.glow.value(now_us),
            to,
            started_at_us: now_us,
            duration_us: ms_to_us(self.config.glow_ramp_ms),
        };
    }

    fn play(&mut self, sfx: Sfx, volume: f32, now_us: u64) -> TimedWait<Sfx> {
        TimedWait::play(sfx, &mut self.sounds, volume, self.config.sfx_timeout_ms, now_us)
    }

    fn begin_spin(&mut self, now_us: u64) {
        self.spin.cancel();
        self.sounds.stop(Sfx::Reel);
        self.winner = None;
        self.set_state(SessionState::Opening, now_us);
        self.ramp_glow(0.0, now_us);

        if self.lid.is_open() {
            self.lid.close(now_us);
            self.phase = Phase::SpinClosingFirst;
        } else {
            self.phase = self.await_spin_media(now_us);
        }
    }

    fn await_spin_media(&self, now_us: u64) -> Phase {
        let timeout = self.config.media_ready_timeout_ms;
        Phase::SpinAwaitMedia(
            WaitAll::new()
                .with(TimedWait::media_ready(Sfx::Open, now_us, timeout))
                .with(TimedWait::media_ready(Sfx::Reel, now_us, timeout)),
        )
    }

    fn begin_open(&mut self, now_us: u64) {
        self.set_state(SessionState::Opening, now_us);
        let sound = self.open_lid_with_sound(now_us);
        self.phase = Phase::LidAndSound {
            sound,
            then: SessionState::Ready,
        };
    }

    /// Open the lid in time with the open sound.
    fn open_lid_with_sound(&mut self, now_us: u64) -> TimedWait<Sfx> {
        let target_ms = self.sounds.duration_ms(Sfx::Open);
        self.lid.open(target_ms, now_us);
        self.play(Sfx::Open, self.config.volumes.open, now_us)
    }

    fn begin_close(&mut self, then: SessionState, now_us: u64) {
        self.set_state(SessionState::Closing, now_us);
        self.lid.close(now_us);
        let sound = self.play(Sfx::Close, self.config.volumes.close, now_us);
        if then == SessionState::Ready {
            self.ramp_glow(0.0, now_us);
        }
        self.phase = Phase::LidAndSound { sound, then };
    }

    fn begin_claim(&mut self, now_us: u64) {
        self.set_state(SessionState::Claiming, now_us);
        if self.lid.is_open() {
            self.lid.close(now_us);
        }
        let sound = self.play(Sfx::Claim, self.config.volumes.claim, now_us);
        self.ramp_glow(0.0, now_us);
        self.phase = Phase::LidAndSound {
            sound,
            then: SessionState::Claimed,
        };
    }

    fn start_spin_run(&mut self, now_us: u64) {
        let plan = plan_spin(
            &self.weights,
            self.spin.current_index(),
            self.config.min_full_rotations,
            self.config.max_extra_rotations,
            self.rng.as_mut(),
        );
        let timing = spin_timing(self.sounds.duration_ms(Sfx::Reel), &self.config);
        self.sounds.set_loop(Sfx::Reel, timing.loop_audio);
        self.sounds.start(Sfx::Reel, self.config.volumes.reel);

        self.spin.start(plan, timing.duration_ms, now_us);
        self.last_plan = Some(plan);
        self.set_state(SessionState::Spinning, now_us);
    }

    fn finish_spin(&mut self, winner_index: usize, now_us: u64) {
        if self.state != SessionState::Spinning {
            return;
        }
        self.sounds.stop(Sfx::Reel);
        self.winner = Some(winner_index);
        if let Some(item) = self.catalog.get(winner_index) {
            log::info!("Winner: {} ({})", item.name, item.id);
        }
        self.set_state(SessionState::WinnerSelected, now_us);
        self.ramp_glow(1.0, now_us);
        self.follow_up = Some(FollowUp {
            fires_at_us: now_us + ms_to_us(self.config.auto_close_delay_ms),
            armed_in: SessionState::WinnerSelected,
        });
    }

    fn advance_phase(&mut self, now_us: u64) {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        self.phase = match phase {
            Phase::Idle => Phase::Idle,
            Phase::SpinClosingFirst => {
                if self.lid.is_moving() {
                    Phase::SpinClosingFirst
                } else {
                    self.await_spin_media(now_us)
                }
            }
            Phase::SpinAwaitMedia(mut waits) => {
                if waits.poll(now_us, &self.sounds).is_done() {
                    Phase::SpinOpening(self.open_lid_with_sound(now_us))
                } else {
                    Phase::SpinAwaitMedia(waits)
                }
            }
            Phase::SpinOpening(mut sound) => {
                let sound_done = sound.poll(now_us, &self.sounds).is_done();
                if sound_done && !self.lid.is_moving() {
                    self.start_spin_run(now_us);
                    Phase::Idle
                } else {
                    Phase::SpinOpening(sound)
                }
            }
            Phase::LidAndSound { mut sound, then } => {
                let sound_done = sound.poll(now_us, &self.sounds).is_done();
                if sound_done && !self.lid.is_moving() {
                    self.set_state(then, now_us);
                    Phase::Idle
                } else {
                    Phase::LidAndSound { sound, then }
                }
            }
        };
    }
}
