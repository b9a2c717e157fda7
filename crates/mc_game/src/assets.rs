//! Crate model loading with a procedural stand-in.
//!
//! A model that loads supplies geometry and, usually, lid clips. A model
//! that fails to load is replaced by a built-in crate, the session is
//! flagged as running on the fallback, and the panel shows a banner. Either
//! way the session starts in `Ready`.

use std::path::Path;

use mc_core::clip::{find_clip, load_model_file, pick_clip, CratePart, ModelFile};

use crate::lid::CrateDriver;

/// Everything the session and painter need from the crate model.
#[derive(Debug, Clone)]
pub struct CrateAsset {
    pub parts: Vec<CratePart>,
    /// Hinge line (y, z); lid parts rotate about x through it.
    pub lid_hinge: [f32; 2],
    pub clip_names: Vec<String>,
    pub driver: CrateDriver,
    pub fallback: bool,
    pub error_banner: Option<String>,
}

pub fn missing_model_banner(path: &Path) -> String {
    format!("Missing model: {} could not be loaded.", path.display())
}

pub fn load_crate(path: &Path, open_angle: f32) -> CrateAsset {
    match load_model_file(path) {
        Ok(model) => {
            log::info!(
                "Loaded crate model '{}' from {} ({} parts, {} clips)",
                model.model_id,
                path.display(),
                model.parts.len(),
                model.clips.len()
            );
            crate_from_model(model, open_angle)
        }
        Err(e) => {
            log::warn!("{e}");
            log::warn!("Using the built-in fallback crate");
            fallback_crate(path, open_angle)
        }
    }
}

/// Build the asset from a loaded model. A model without clips keeps its
/// geometry and animates the lid with the pivot.
pub fn crate_from_model(model: ModelFile, open_angle: f32) -> CrateAsset {
    let clip_names = model.clip_names();
    let driver = match pick_clip(&model.clips, "open") {
        Some(open) => {
            let close = find_clip(&model.clips, "close")
                .filter(|close| !std::ptr::eq(*close, open))
                .cloned();
            log::debug!(
                "Lid clips: open='{}' close={}",
                open.name,
                close
                    .as_ref()
                    .map_or("reverse of open".to_string(), |c| format!("'{}'", c.name))
            );
            CrateDriver::ClipDriven {
                open: open.clone(),
                close,
            }
        }
        None => {
            log::info!("Model has no clips; animating the lid with the pivot");
            CrateDriver::PivotDriven { open_angle }
        }
    };
    CrateAsset {
        parts: model.parts,
        lid_hinge: model.lid_hinge,
        clip_names,
        driver,
        fallback: false,
        error_banner: None,
    }
}

pub fn fallback_crate(path: &Path, open_angle: f32) -> CrateAsset {
    CrateAsset {
        parts: fallback_parts(),
        lid_hinge: [1.2, -0.6],
        clip_names: Vec::new(),
        driver: CrateDriver::PivotDriven { open_angle },
        fallback: true,
        error_banner: Some(missing_model_banner(path)),
    }
}

fn part(name: &str, center: [f32; 3], size: [f32; 3], color: [u8; 3], on_lid: bool) -> CratePart {
    CratePart {
        name: name.to_string(),
        center,
        size,
        color,
        on_lid,
    }
}

/// Wooden crate with metal straps, a latch, side handles and neon trim.
pub fn fallback_parts() -> Vec<CratePart> {
    const WOOD: [u8; 3] = [0x6a, 0x44, 0x26];
    const WOOD_DARK: [u8; 3] = [0x4b, 0x31, 0x1a];
    const METAL: [u8; 3] = [0x3c, 0x3f, 0x44];
    const BRASS: [u8; 3] = [0xc9, 0xa2, 0x4d];
    const NEON_PINK: [u8; 3] = [0xff, 0x2e, 0xa6];
    const NEON_CYAN: [u8; 3] = [0x2e, 0xf2, 0xff];

    vec![
        part("body", [0.0, 0.6, 0.0], [1.8, 1.2, 1.2], WOOD, false),
        part("lid", [0.0, 1.3, 0.0], [1.86, 0.2, 1.26], WOOD_DARK, true),
        part("strap_left", [-0.55, 0.6, 0.0], [0.14, 1.22, 1.22], METAL, false),
        part("strap_right", [0.55, 0.6, 0.0], [0.14, 1.22, 1.22], METAL, false),
        part("lid_strap_left", [-0.55, 1.3, 0.0], [0.14, 0.22, 1.28], METAL, true),
        part("lid_strap_right", [0.55, 1.3, 0.0], [0.14, 0.22, 1.28], METAL, true),
        part("latch", [0.0, 1.26, 0.65], [0.2, 0.24, 0.06], BRASS, true),
        part("handle_left", [-0.93, 0.7, 0.0], [0.06, 0.12, 0.5], METAL, false),
        part("handle_right", [0.93, 0.7, 0.0], [0.06, 0.12, 0.5], METAL, false),
        part("neon_base", [0.0, 0.04, 0.61], [1.8, 0.05, 0.02], NEON_PINK, false),
        part("neon_lid", [0.0, 1.41, 0.64], [1.86, 0.04, 0.02], NEON_CYAN, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "mc_assets_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_model(name_hint: &str, clips: &str) -> std::path::PathBuf {
        let path = temp_file_path(name_hint);
        fs::write(
            &path,
            format!(
                r#"{{
                  "version": "0.1",
                  "model_id": "crate",
                  "parts": [
                    {{ "name": "body", "center": [0, 0.5, 0], "size": [1, 1, 1] }}
                  ],
                  "clips": {clips}
                }}"#
            ),
        )
        .expect("write model file");
        path
    }

    #[test]
    fn missing_model_uses_fallback_with_banner() {
        let path = temp_file_path("missing");
        let asset = load_crate(&path, -1.8);
        assert!(asset.fallback);
        assert!(asset.clip_names.is_empty());
        assert!(matches!(asset.driver, CrateDriver::PivotDriven { .. }));
        assert_eq!(
            asset.error_banner,
            Some(format!("Missing model: {} could not be loaded.", path.display()))
        );
        assert!(asset.parts.iter().any(|p| p.on_lid));
    }

    #[test]
    fn open_and_close_clips_are_picked_by_name() {
        let path = write_model(
            "clips",
            r#"[
              { "name": "Idle", "duration_ms": 100, "keys": [{ "time_ms": 0, "lid_deg": 0 }] },
              { "name": "Lid_Open", "duration_ms": 600, "keys": [{ "time_ms": 0, "lid_deg": 0 }, { "time_ms": 600, "lid_deg": -100 }] },
              { "name": "Lid_Close", "duration_ms": 400, "keys": [{ "time_ms": 0, "lid_deg": -100 }, { "time_ms": 400, "lid_deg": 0 }] }
            ]"#,
        );
        let asset = load_crate(&path, -1.8);
        assert!(!asset.fallback);
        assert_eq!(asset.error_banner, None);
        assert_eq!(asset.clip_names, vec!["Idle", "Lid_Open", "Lid_Close"]);
        match &asset.driver {
            CrateDriver::ClipDriven { open, close } => {
                assert_eq!(open.name, "Lid_Open");
                assert_eq!(close.as_ref().map(|c| c.name.as_str()), Some("Lid_Close"));
            }
            other => panic!("expected clip driver, got {other:?}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn single_clip_closes_by_reversing() {
        let path = write_model(
            "single",
            r#"[
              { "name": "Take001", "duration_ms": 500, "keys": [{ "time_ms": 0, "lid_deg": 0 }, { "time_ms": 500, "lid_deg": -90 }] }
            ]"#,
        );
        let asset = load_crate(&path, -1.8);
        match &asset.driver {
            CrateDriver::ClipDriven { open, close } => {
                assert_eq!(open.name, "Take001");
                assert!(close.is_none());
            }
            other => panic!("expected clip driver, got {other:?}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn model_without_clips_uses_pivot_without_fallback_flag() {
        let path = write_model("noclips", "[]");
        let asset = load_crate(&path, -1.8);
        assert!(!asset.fallback);
        assert_eq!(asset.error_banner, None);
        assert!(asset.clip_names.is_empty());
        assert_eq!(asset.driver, CrateDriver::PivotDriven { open_angle: -1.8 });
        let _ = fs::remove_file(path);
    }

    #[test]
    fn out_of_range_clip_duration_falls_back() {
        let path = write_model(
            "huge",
            r#"[
              { "name": "Open", "duration_ms": 18446744073709551615, "keys": [{ "time_ms": 0, "lid_deg": 0 }] }
            ]"#,
        );
        let asset = load_crate(&path, -1.8);
        assert!(asset.fallback);
        assert!(matches!(asset.driver, CrateDriver::PivotDriven { .. }));
        assert_eq!(asset.error_banner, Some(missing_model_banner(&path)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_model_falls_back() {
        let path = temp_file_path("malformed");
        fs::write(&path, "{ \"version\": \"0.1\" ").expect("write model file");
        let asset = load_crate(&path, -1.8);
        assert!(asset.fallback);
        assert!(asset.error_banner.is_some());
        let _ = fs::remove_file(path);
    }
}
