//! Crate model manifest: geometry parts plus named lid animation clips.
//!
//! A clip is a list of lid keyframes. Timing is stored internally as integer
//! microseconds; the JSON format uses `time_ms`/`duration_ms` for
//! readability and is converted on load, and angles are authored in degrees
//! and stored in radians.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Longest clip a manifest may declare. Key times are bounded by their clip.
pub const MAX_CLIP_DURATION_MS: u64 = 600_000;

/// One lid pose at a point in clip time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidKey {
    pub time_us: u64,
    /// Rotation about the hinge, radians. Negative opens toward the viewer's back.
    pub lid_angle: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration_us: u64,
    pub keys: Vec<LidKey>,
}

impl AnimationClip {
    /// Lid angle at `time_us`, linearly interpolated and clamped to the clip.
    pub fn sample(&self, time_us: u64) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if time_us <= first.time_us {
            return first.lid_angle;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time_us <= b.time_us {
                let span = (b.time_us - a.time_us).max(1) as f32;
                let t = (time_us - a.time_us) as f32 / span;
                return a.lid_angle + (b.lid_angle - a.lid_angle) * t;
            }
        }
        self.keys.last().map_or(0.0, |k| k.lid_angle)
    }

    /// Pose at the end of the clip.
    pub fn end_angle(&self) -> f32 {
        self.sample(self.duration_us)
    }
}

/// Axis-aligned box in crate-local space.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CratePart {
    pub name: String,
    pub center: [f32; 3],
    pub size: [f32; 3],
    #[serde(default = "default_part_color")]
    pub color: [u8; 3],
    /// Parts attached to the lid rotate with it about the hinge.
    #[serde(default)]
    pub on_lid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    pub version: String,
    pub model_id: String,
    /// Hinge line position (y, z) in crate-local space; the lid rotates about x.
    pub lid_hinge: [f32; 2],
    pub parts: Vec<CratePart>,
    pub clips: Vec<AnimationClip>,
}

impl ModelFile {
    pub fn clip_names(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.name.clone()).collect()
    }
}

/// First clip whose name contains `keyword` (case-insensitive), else the first clip.
pub fn pick_clip<'a>(clips: &'a [AnimationClip], keyword: &str) -> Option<&'a AnimationClip> {
    find_clip(clips, keyword).or_else(|| clips.first())
}

/// First clip whose name contains `keyword` (case-insensitive).
pub fn find_clip<'a>(clips: &'a [AnimationClip], keyword: &str) -> Option<&'a AnimationClip> {
    let keyword = keyword.to_lowercase();
    clips
        .iter()
        .find(|clip| clip.name.to_lowercase().contains(&keyword))
}

/// A clip being played once, optionally reversed, stretched to a wall-clock duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlayback {
    pub clip: AnimationClip,
    pub started_at_us: u64,
    pub wall_duration_us: u64,
    pub reverse: bool,
}

impl ClipPlayback {
    /// Play `clip` so it lasts `target_us`, or its natural length when `None`.
    pub fn start(clip: AnimationClip, now_us: u64, target_us: Option<u64>, reverse: bool) -> Self {
        let wall_duration_us = target_us
            .filter(|t| *t > 0)
            .unwrap_or(clip.duration_us);
        Self {
            clip,
            started_at_us: now_us,
            wall_duration_us,
            reverse,
        }
    }

    /// Clip-time advance per unit of wall time.
    pub fn time_scale(&self) -> f64 {
        if self.wall_duration_us == 0 {
            1.0
        } else {
            self.clip.duration_us as f64 / self.wall_duration_us as f64
        }
    }

    /// Position in clip time; reversed playback runs back from the clip's end.
    pub fn clip_time_us(&self, now_us: u64) -> u64 {
        let elapsed = now_us.saturating_sub(self.started_at_us);
        let scaled = ((elapsed as f64) * self.time_scale()).round() as u64;
        let forward = scaled.min(self.clip.duration_us);
        if self.reverse {
            self.clip.duration_us - forward
        } else {
            forward
        }
    }

    pub fn is_finished(&self, now_us: u64) -> bool {
        now_us.saturating_sub(self.started_at_us) >= self.wall_duration_us
    }

    pub fn lid_angle(&self, now_us: u64) -> f32 {
        self.clip.sample(self.clip_time_us(now_us))
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct ModelFileJson {
    version: String,
    model_id: String,
    #[serde(default)]
    lid_hinge: Option<[f32; 2]>,
    #[serde(default)]
    parts: Vec<CratePart>,
    #[serde(default)]
    clips: Vec<AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    name: String,
    duration_ms: u64,
    keys: Vec<LidKeyJson>,
}

#[derive(Debug, Deserialize)]
struct LidKeyJson {
    time_ms: u64,
    lid_deg: f32,
}

/// Load a crate model manifest from disk.
pub fn load_model_file(path: &Path) -> Result<ModelFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read model file {}: {e}", path.display()))?;
    let json: ModelFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse model file {}: {e}", path.display()))?;
    validate_model_json(&json)?;

    let clips = json
        .clips
        .into_iter()
        .map(|clip| AnimationClip {
            name: clip.name,
            duration_us: clip.duration_ms * 1000,
            keys: clip
                .keys
                .into_iter()
                .map(|k| LidKey {
                    time_us: k.time_ms * 1000,
                    lid_angle: k.lid_deg.to_radians(),
                })
                .collect(),
        })
        .collect();

    Ok(ModelFile {
        version: json.version,
        model_id: json.model_id,
        lid_hinge: json.lid_hinge.unwrap_or([0.9, -0.6]),
        parts: json.parts,
        clips,
    })
}

fn validate_model_json(json: &ModelFileJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Model validation failed: unsupported version '{}'",
            json.version
        ));
    }
    if json.model_id.is_empty() {
        return Err("Model validation failed: model_id is empty".to_string());
    }
    if json.parts.is_empty() {
        return Err("Model validation failed: parts array is empty".to_string());
    }
    for clip in &json.clips {
        if clip.duration_ms == 0 {
            return Err(format!(
                "Model validation failed: clip '{}' has zero duration",
                clip.name
            ));
        }
        if clip.duration_ms > MAX_CLIP_DURATION_MS {
            return Err(format!(
                "Model validation failed: clip '{}' duration out of range ({} ms, max {} ms)",
                clip.name, clip.duration_ms, MAX_CLIP_DURATION_MS
            ));
        }
        if clip.keys.is_empty() {
            return Err(format!(
                "Model validation failed: clip '{}' has no keys",
                clip.name
            ));
        }
        let mut last = 0;
        for (i, key) in clip.keys.iter().enumerate() {
            if key.time_ms < last {
                return Err(format!(
                    "Model validation failed: clip '{}' key {} is out of order",
                    clip.name, i
                ));
            }
            if key.time_ms > clip.duration_ms {
                return Err(format!(
                    "Model validation failed: clip '{}' key {} is past the clip end",
                    clip.name, i
                ));
            }
            last = key.time_ms;
        }
    }
    Ok(())
}

const fn default_part_color() -> [u8; 3] {
    [0x8b, 0x5a, 0x2b]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "mc_model_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn make_clip(name: &str, duration_ms: u64, end_deg: f32) -> AnimationClip {
        AnimationClip {
            name: name.to_string(),
            duration_us: duration_ms * 1000,
            keys: vec![
                LidKey {
                    time_us: 0,
                    lid_angle: 0.0,
                },
                LidKey {
                    time_us: duration_ms * 1000,
                    lid_angle: end_deg.to_radians(),
                },
            ],
        }
    }

    #[test]
    fn sample_interpolates_between_keys() {
        let clip = make_clip("open", 1000, -100.0);
        assert_eq!(clip.sample(0), 0.0);
        let mid = clip.sample(500_000);
        assert!((mid - (-50.0f32).to_radians()).abs() < 1e-5);
        assert!((clip.sample(5_000_000) - clip.end_angle()).abs() < 1e-6);
    }

    #[test]
    fn pick_clip_prefers_keyword_then_first() {
        let clips = vec![make_clip("Idle", 500, 0.0), make_clip("Crate_OPEN", 900, -90.0)];
        assert_eq!(pick_clip(&clips, "open").map(|c| c.name.as_str()), Some("Crate_OPEN"));
        assert_eq!(pick_clip(&clips, "close").map(|c| c.name.as_str()), Some("Idle"));
        assert!(find_clip(&clips, "close").is_none());
        assert!(pick_clip(&[], "open").is_none());
    }

    #[test]
    fn playback_scales_to_target_duration() {
        let clip = make_clip("open", 1000, -90.0);
        let playback = ClipPlayback::start(clip, 10_000, Some(2_000_000), false);
        assert!((playback.time_scale() - 0.5).abs() < 1e-12);
        assert_eq!(playback.clip_time_us(10_000 + 1_000_000), 500_000);
        assert!(!playback.is_finished(10_000 + 1_999_999));
        assert!(playback.is_finished(10_000 + 2_000_000));
    }

    #[test]
    fn playback_without_target_uses_natural_duration() {
        let clip = make_clip("open", 800, -90.0);
        let playback = ClipPlayback::start(clip, 0, None, false);
        assert_eq!(playback.wall_duration_us, 800_000);
        assert!((playback.time_scale() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reversed_playback_runs_from_the_end() {
        let clip = make_clip("open", 1000, -90.0);
        let end = clip.end_angle();
        let playback = ClipPlayback::start(clip, 0, None, true);
        assert_eq!(playback.clip_time_us(0), 1_000_000);
        assert!((playback.lid_angle(0) - end).abs() < 1e-6);
        assert_eq!(playback.clip_time_us(1_000_000), 0);
        assert_eq!(playback.lid_angle(1_000_000), 0.0);
    }

    #[test]
    fn load_model_file_parses_valid_json() {
        let path = temp_file_path("valid");
        let json = r#"
        {
          "version": "0.1",
          "model_id": "crate",
          "lid_hinge": [0.95, -0.65],
          "parts": [
            { "name": "body", "center": [0, 0.45, 0], "size": [1.8, 0.9, 1.3] },
            { "name": "lid", "center": [0, 1.0, 0], "size": [1.9, 0.15, 1.35], "on_lid": true }
          ],
          "clips": [
            { "name": "Open", "duration_ms": 1200,
              "keys": [ { "time_ms": 0, "lid_deg": 0 }, { "time_ms": 1200, "lid_deg": -105 } ] }
          ]
        }
        "#;
        fs::write(&path, json).expect("write temp file");

        let model = load_model_file(&path).expect("should parse");
        assert_eq!(model.model_id, "crate");
        assert_eq!(model.parts.len(), 2);
        assert!(model.parts[1].on_lid);
        assert_eq!(model.parts[0].color, default_part_color());
        assert_eq!(model.clips[0].duration_us, 1_200_000);
        assert!((model.clips[0].end_angle() - (-105.0f32).to_radians()).abs() < 1e-5);
        assert_eq!(model.clip_names(), vec!["Open".to_string()]);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_model_file_rejects_out_of_order_keys() {
        let path = temp_file_path("out_of_order");
        let json = r#"
        {
          "version": "0.1",
          "model_id": "crate",
          "parts": [ { "name": "body", "center": [0, 0, 0], "size": [1, 1, 1] } ],
          "clips": [
            { "name": "Open", "duration_ms": 1000,
              "keys": [ { "time_ms": 500, "lid_deg": 0 }, { "time_ms": 100, "lid_deg": -90 } ] }
          ]
        }
        "#;
        fs::write(&path, json).expect("write temp file");
        let err = load_model_file(&path).expect_err("out of order keys should fail");
        assert!(err.contains("out of order"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_model_file_rejects_huge_durations() {
        let path = temp_file_path("huge_duration");
        let json = r#"
        {
          "version": "0.1",
          "model_id": "crate",
          "parts": [ { "name": "body", "center": [0, 0, 0], "size": [1, 1, 1] } ],
          "clips": [
            { "name": "Open", "duration_ms": 18446744073709551615,
              "keys": [ { "time_ms": 0, "lid_deg": 0 }, { "time_ms": 18446744073709551615, "lid_deg": -90 } ] }
          ]
        }
        "#;
        fs::write(&path, json).expect("write temp file");
        let err = load_model_file(&path).expect_err("huge duration should fail");
        assert!(err.contains("duration out of range"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_model_file_rejects_bad_version() {
        let path = temp_file_path("bad_version");
        let json = r#"{ "version": "9.9", "model_id": "crate", "parts": [] }"#;
        fs::write(&path, json).expect("write temp file");
        let err = load_model_file(&path).expect_err("bad version should fail");
        assert!(err.contains("unsupported version"));
        let _ = fs::remove_file(path);
    }
}
