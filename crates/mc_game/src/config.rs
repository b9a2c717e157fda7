//! Session tuning: lid timing, spin pacing, follow-up delays and volumes.
//!
//! Every field has a default so a partial file only overrides what it names.
//! A missing file is not an error; the session simply runs on defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pivot lid motion length when no sound duration drives it.
    pub lid_duration_ms: f64,
    /// Fully open lid angle in degrees (negative tips the lid back).
    pub lid_open_deg: f32,

    pub spin_base_duration_ms: f64,
    pub min_spin_ms: f64,
    /// Quiet stretch at the end of the reel sound that the spin should not cover.
    pub silent_tail_ms: f64,
    pub end_padding_ms: f64,
    pub min_full_rotations: u32,
    pub max_extra_rotations: u32,

    pub auto_close_delay_ms: f64,
    pub media_ready_timeout_ms: f64,
    /// Ceiling on any single sound-effect wait.
    pub sfx_timeout_ms: f64,
    pub glow_ramp_ms: f64,

    pub volumes: Volumes,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Volumes {
    pub open: f32,
    pub reel: f32,
    pub close: f32,
    pub claim: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lid_duration_ms: 800.0,
            lid_open_deg: -105.0,
            spin_base_duration_ms: 4500.0,
            min_spin_ms: 2500.0,
            silent_tail_ms: 600.0,
            end_padding_ms: 80.0,
            min_full_rotations: 10,
            max_extra_rotations: 4,
            auto_close_delay_ms: 1800.0,
            media_ready_timeout_ms: 1500.0,
            sfx_timeout_ms: 2500.0,
            glow_ramp_ms: 600.0,
            volumes: Volumes::default(),
        }
    }
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            open: 0.8,
            reel: 0.6,
            close: 0.8,
            claim: 0.9,
        }
    }
}

impl SessionConfig {
    pub fn lid_open_angle(&self) -> f32 {
        self.lid_open_deg.to_radians()
    }
}

pub fn load_session_config(path: &Path) -> Result<SessionConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read session config {}: {e}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse session config {}: {e}", path.display()))?;
    validate_session_config(&config)?;
    Ok(config)
}

/// Load the config, falling back to defaults when the file is absent or bad.
pub fn load_or_default(path: &Path) -> SessionConfig {
    if !path.exists() {
        log::info!(
            "No session config at {}, using defaults",
            path.display()
        );
        return SessionConfig::default();
    }
    match load_session_config(path) {
        Ok(config) => {
            log::info!("Loaded session config from {}", path.display());
            config
        }
        Err(e) => {
            log::error!("{e}; using default session config");
            SessionConfig::default()
        }
    }
}

fn validate_session_config(config: &SessionConfig) -> Result<(), String> {
    let durations = [
        ("lid_duration_ms", config.lid_duration_ms),
        ("spin_base_duration_ms", config.spin_base_duration_ms),
        ("min_spin_ms", config.min_spin_ms),
        ("auto_close_delay_ms", config.auto_close_delay_ms),
        ("media_ready_timeout_ms", config.media_ready_timeout_ms),
        ("sfx_timeout_ms", config.sfx_timeout_ms),
        ("glow_ramp_ms", config.glow_ramp_ms),
    ];
    for (name, value) in durations {
        if !value.is_finite() || value <= 0.0 {
            return Err(format!(
                "Session config validation failed: {name} must be > 0 (got {value})"
            ));
        }
    }
    for (name, value) in [
        ("silent_tail_ms", config.silent_tail_ms),
        ("end_padding_ms", config.end_padding_ms),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!(
                "Session config validation failed: {name} must be >= 0 (got {value})"
            ));
        }
    }
    if config.min_spin_ms > config.spin_base_duration_ms {
        return Err(format!(
            "Session config validation failed: min_spin_ms ({}) exceeds spin_base_duration_ms ({})",
            config.min_spin_ms, config.spin_base_duration_ms
        ));
    }
    if config.min_full_rotations == 0 {
        return Err(
            "Session config validation failed: min_full_rotations must be >= 1".to_string(),
        );
    }
    let v = &config.volumes;
    for (name, volume) in [
        ("open", v.open),
        ("reel", v.reel),
        ("close", v.close),
        ("claim", v.claim),
    ] {
        if !(0.0..=1.0).contains(&volume) {
            return Err(format!(
                "Session config validation failed: volume '{name}' must be within 0..1 (got {volume})"
            ));
        }
    }
    Ok(())
}
