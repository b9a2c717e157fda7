use crate::session::Session;
use mc_core::input::Intent;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A scripted run: intents issued at given times, then idle frames.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayScript {
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    /// Unit draws fed to the session's random source, in order.
    #[serde(default)]
    pub draws: Vec<f64>,
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayStep {
    #[serde(default)]
    pub intent: Option<String>,
    /// Frames to run after the intent (if any) is issued.
    #[serde(default = "default_frames")]
    pub frames: u32,
}

impl ReplayScript {
    pub fn intents(&self) -> Result<Vec<Option<Intent>>, String> {
        self.steps
            .iter()
            .map(|step| match &step.intent {
                None => Ok(None),
                Some(label) => Intent::from_label(label)
                    .map(Some)
                    .ok_or_else(|| format!("Unknown replay intent '{label}'")),
            })
            .collect()
    }

    /// Drive `session` through the script, returning the final clock.
    pub fn run(&self, session: &mut Session) -> Result<u64, String> {
        let frame_us = (self.frame_ms * 1000.0).round() as u64;
        let mut now = 0;
        for (step, intent) in self.steps.iter().zip(self.intents()?) {
            if let Some(intent) = intent {
                session.handle(intent, now);
            }
            for _ in 0..step.frames {
                now += frame_us;
                session.tick(now);
            }
        }
        Ok(now)
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplayScript, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplayScript = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplayScript) -> Result<(), String> {
    if replay.frame_ms <= 0.0 {
        return Err("Replay validation failed: frame_ms must be > 0".to_string());
    }
    if replay.steps.is_empty() {
        return Err("Replay validation failed: steps list is empty".to_string());
    }
    replay.intents()?;
    Ok(())
}

const fn default_frame_ms() -> f64 {
    1000.0 / 60.0
}

const fn default_frames() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SoundBank;
    use crate::config::SessionConfig;
    use crate::lid::{CrateController, CrateDriver};
    use crate::session::SessionState;
    use mc_core::catalog::Catalog;
    use mc_core::random::ScriptedRandom;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "mc_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn session_for(replay: &ReplayScript) -> Session {
        Session::new(
            Catalog::builtin(),
            CrateController::new(CrateDriver::PivotDriven { open_angle: -1.8 }, true, 800.0),
            SoundBank::silent(),
            SessionConfig::default(),
            Box::new(ScriptedRandom::new(replay.draws.clone())),
        )
    }

    const FULL_FLOW: &str = r#"{
      "draws": [0.95, 0.25],
      "steps": [
        { "intent": "spin", "frames": 420 },
        { "intent": "open", "frames": 10 },
        { "frames": 150 },
        { "intent": "claim", "frames": 90 }
      ]
    }"#;

    #[test]
    fn replay_file_parses() {
        let path = temp_file_path("parse");
        fs::write(&path, FULL_FLOW).expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.steps.len(), 4);
        let intents = replay.intents().expect("labels are valid");
        assert_eq!(intents[0], Some(Intent::RequestSpin));
        assert_eq!(intents[2], None);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_intent_is_rejected() {
        let path = temp_file_path("unknown");
        fs::write(&path, r#"{ "steps": [{ "intent": "dance" }] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("replay should be rejected");
        assert!(err.contains("dance"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn full_flow_reaches_claimed_on_scripted_winner() {
        let replay: ReplayScript = serde_json::from_str(FULL_FLOW).expect("valid replay");
        let mut session = session_for(&replay);
        replay.run(&mut session).expect("replay runs");

        // 0.95 of five equal weights is the last hat.
        assert_eq!(session.state(), SessionState::Claimed);
        assert_eq!(session.winner().map(|h| h.id.as_str()), Some("ZS-05"));
        let plan = session.last_plan().copied().expect("a spin ran");
        assert_eq!(plan.full_rotations, 11);
        assert_eq!(plan.total_steps, 11 * 5 + 4);
        let states: Vec<_> = session.drain_transitions().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                SessionState::Opening,
                SessionState::Spinning,
                SessionState::WinnerSelected,
                SessionState::Closing,
                SessionState::WinnerPendingClaim,
                SessionState::Claiming,
                SessionState::Claimed,
            ]
        );
    }

    #[test]
    fn replay_run_is_deterministic() {
        let replay: ReplayScript = serde_json::from_str(FULL_FLOW).expect("valid replay");
        let mut run_a = session_for(&replay);
        let mut run_b = session_for(&replay);
        let end_a = replay.run(&mut run_a).expect("replay runs");
        let end_b = replay.run(&mut run_b).expect("replay runs");

        assert_eq!(end_a, end_b);
        assert_eq!(run_a.drain_transitions(), run_b.drain_transitions());
        assert_eq!(run_a.spin().current_index(), run_b.spin().current_index());
    }
}
