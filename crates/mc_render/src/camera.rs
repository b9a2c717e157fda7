use glam::{Mat4, Vec2, Vec3, Vec4};

/// Perspective look-at camera. The scene painter projects crate geometry
/// through it, so `project` returns logical pixel coordinates (y down).
pub struct Camera3D {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: (u32, u32),
}

impl Camera3D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            eye: Vec3::new(0.0, 4.0, 6.0),
            target: Vec3::new(0.0, 1.1, 0.6),
            fov_y_deg: 45.0,
            near: 0.1,
            far: 100.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn aspect(&self) -> f32 {
        let (w, h) = self.viewport;
        if h == 0 {
            1.0
        } else {
            w as f32 / h as f32
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect(),
            self.near,
            self.far,
        );
        let view = Mat4::look_at_rh(self.eye, self.target, Vec3::Y);
        proj * view
    }

    /// Project a world point to viewport pixels. `None` when behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_proj() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= self.near * 0.5 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let (w, h) = self.viewport;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * w as f32,
            (1.0 - (ndc.y * 0.5 + 0.5)) * h as f32,
        ))
    }
}
