//! Per-frame projection of session state into the painted scene.
//!
//! Nothing here mutates the session. `sync` reads it into a [`SceneView`];
//! `paint_scene` turns the view plus crate geometry into projected polygons
//! for the overlay's background layer.

use glam::Vec3;
use mc_core::catalog::HatColors;
use mc_core::clip::CratePart;
use mc_devtools::{PaintShape, ScenePaint};
use mc_render::Camera3D;

use crate::session::{Session, SessionState};

const CRATE_TOP: f32 = 1.2;
const HAT_MAX_LIFT: f32 = 0.9;
const HAT_SIZE: f32 = 0.8;
const EYE_CLOSED: Vec3 = Vec3::new(0.0, 3.4, 5.6);
const EYE_OPEN: Vec3 = Vec3::new(0.0, 3.0, 4.4);
const LOOK_CRATE: Vec3 = Vec3::new(0.0, 0.6, 0.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneView {
    pub lid_angle: f32,
    pub openness: f32,
    pub hat_visible: bool,
    /// Height of the hat card above the crate top.
    pub hat_lift: f32,
    pub glow: f32,
    pub hat_colors: HatColors,
    pub camera_eye: Vec3,
    pub camera_target: Vec3,
}

pub fn sync(session: &Session, now_us: u64) -> SceneView {
    let lid = session.lid();
    let openness = lid.openness(now_us);
    let state = session.state();
    let hat_visible = openness > 0.05
        || matches!(
            state,
            SessionState::Spinning | SessionState::WinnerSelected
        );
    let hat_lift = HAT_MAX_LIFT * openness;
    let hat_center = Vec3::new(0.0, CRATE_TOP + HAT_SIZE * 0.5 + hat_lift * 0.5, 0.0);

    SceneView {
        lid_angle: lid.lid_angle(now_us),
        openness,
        hat_visible,
        hat_lift,
        glow: session.glow(now_us),
        hat_colors: session
            .displayed_item()
            .map(|item| item.colors)
            .unwrap_or_default(),
        camera_eye: EYE_CLOSED.lerp(EYE_OPEN, openness),
        camera_target: LOOK_CRATE.lerp(hat_center, openness),
    }
}

/// Face directions of an axis-aligned box with their corner indices.
const FACES: [([f32; 3], [usize; 4]); 6] = [
    ([0.0, 0.0, 1.0], [4, 5, 7, 6]),
    ([0.0, 0.0, -1.0], [1, 0, 2, 3]),
    ([1.0, 0.0, 0.0], [5, 1, 3, 7]),
    ([-1.0, 0.0, 0.0], [0, 4, 6, 2]),
    ([0.0, 1.0, 0.0], [6, 7, 3, 2]),
    ([0.0, -1.0, 0.0], [0, 1, 5, 4]),
];

fn box_corners(part: &CratePart) -> [Vec3; 8] {
    let c = Vec3::from(part.center);
    let h = Vec3::from(part.size) * 0.5;
    std::array::from_fn(|i| {
        let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
        let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
        let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
        c + Vec3::new(h.x * sx, h.y * sy, h.z * sz)
    })
}

/// Rotate `p` about the x-parallel hinge line through (y, z).
fn rotate_about_hinge(p: Vec3, hinge: [f32; 2], angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    let y = p.y - hinge[0];
    let z = p.z - hinge[1];
    Vec3::new(p.x, hinge[0] + y * c - z * s, hinge[1] + y * s + z * c)
}

fn shade(color: [u8; 3], normal: Vec3) -> [u8; 4] {
    let light = Vec3::new(-0.4, 0.8, 0.6).normalize();
    let k = 0.45 + 0.55 * normal.dot(light).max(0.0);
    [
        (color[0] as f32 * k) as u8,
        (color[1] as f32 * k) as u8,
        (color[2] as f32 * k) as u8,
        255,
    ]
}

struct Face {
    depth: f32,
    shape: PaintShape,
}

/// Project the crate and hat card through `camera`.
pub fn paint_scene(
    view: &SceneView,
    parts: &[CratePart],
    lid_hinge: [f32; 2],
    camera: &mut Camera3D,
) -> ScenePaint {
    camera.eye = view.camera_eye;
    camera.target = view.camera_target;

    let mut faces = Vec::new();
    for part in parts {
        let mut corners = box_corners(part);
        if part.on_lid {
            for corner in &mut corners {
                *corner = rotate_about_hinge(*corner, lid_hinge, view.lid_angle);
            }
        }
        for (normal, idx) in FACES {
            let mut normal = Vec3::from(normal);
            if part.on_lid {
                normal = rotate_about_hinge(normal, [0.0, 0.0], view.lid_angle);
            }
            let center = idx.iter().map(|&i| corners[i]).sum::<Vec3>() * 0.25;
            // Back faces point away from the eye.
            if normal.dot(camera.eye - center) <= 0.0 {
                continue;
            }
            let points: Option<Vec<[f32; 2]>> = idx
                .iter()
                .map(|&i| camera.project(corners[i]).map(|p| [p.x, p.y]))
                .collect();
            let Some(points) = points else {
                continue;
            };
            let fill = shade(part.color, normal);
            faces.push(Face {
                depth: center.distance(camera.eye),
                shape: PaintShape::Polygon {
                    points,
                    fill,
                    stroke: [fill[0] / 2, fill[1] / 2, fill[2] / 2, 255],
                },
            });
        }
    }

    if view.hat_visible {
        let center = Vec3::new(0.0, CRATE_TOP + HAT_SIZE * 0.5 + view.hat_lift, 0.0);
        let top = center + Vec3::Y * (HAT_SIZE * 0.5);
        let bottom = center - Vec3::Y * (HAT_SIZE * 0.5);
        if let (Some(c), Some(t), Some(b)) = (
            camera.project(center),
            camera.project(top),
            camera.project(bottom),
        ) {
            let height = (b.y - t.y).abs();
            faces.push(Face {
                // Slightly in front of the crate top so it draws over it.
                depth: center.distance(camera.eye) - 0.5,
                shape: PaintShape::Card {
                    center: [c.x, c.y],
                    size: [height * 1.2, height],
                    primary: view.hat_colors.primary,
                    accent: view.hat_colors.accent,
                    glow: view.glow,
                },
            });
        }
    }

    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    ScenePaint {
        shapes: faces.into_iter().map(|f| f.shape).collect(),
    }
}
