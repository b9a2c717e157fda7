//! Control panel, scene painter and debug window, all drawn with egui.
//!
//! egui needs a three-phase render split because
//! `egui_wgpu::Renderer::render()` takes a `RenderPass<'static>` while
//! `begin_render_pass` borrows the encoder:
//!
//!   1. `prepare()` -- run UI logic, collect intents, tessellate
//!   2. `upload()`  -- upload textures and buffers (borrows encoder mutably)
//!   3. `paint()`   -- render into a pass created with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! The panel never mutates session state. Button clicks come back as
//! [`Intent`]s and the caller feeds them through the same path as keyboard
//! input, so locked-state filtering happens in one place.

use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use mc_core::input::Intent;
use mc_core::time::TimeState;
use winit::window::Window;

/// Which controls are currently usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonStates {
    pub open: bool,
    pub close: bool,
    pub spin: bool,
    pub claim: bool,
}

/// A projected shape in logical pixels, painted behind the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintShape {
    Polygon {
        points: Vec<[f32; 2]>,
        fill: [u8; 4],
        stroke: [u8; 4],
    },
    /// The reward card rising out of the crate.
    Card {
        center: [f32; 2],
        size: [f32; 2],
        primary: [u8; 3],
        accent: [u8; 3],
        /// 0..1, drives the halo around the card.
        glow: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenePaint {
    pub shapes: Vec<PaintShape>,
}

/// Everything the panel shows for one frame.
pub struct PanelModel<'a> {
    pub status_line: &'a str,
    pub winner_name: &'a str,
    pub winner_colors: Option<([u8; 3], [u8; 3])>,
    pub buttons: ButtonStates,
    pub clip_names: &'a [String],
    pub error_banner: Option<&'a str>,
    pub scene: &'a ScenePaint,
}

#[derive(Debug, Clone, Default)]
pub struct DebugStats {
    pub state_label: String,
    pub reel_index: usize,
    pub reel_len: usize,
    pub spin_steps: Option<(u64, u64)>,
    pub lid_angle_deg: f32,
    pub crate_open: bool,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PanelActions {
    pub intents: Vec<Intent>,
}

pub struct Overlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub debug_visible: bool,
}

impl Overlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            debug_visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle_debug(&mut self) {
        self.debug_visible = !self.debug_visible;
        log::info!(
            "Debug window: {}",
            if self.debug_visible { "ON" } else { "OFF" }
        );
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        model: &PanelModel<'_>,
        stats: &DebugStats,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        PanelActions,
    ) {
        let mut actions = PanelActions::default();
        let debug_visible = self.debug_visible;
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            paint_scene(ctx, model.scene);
            control_panel(ctx, model, &mut actions);
            if debug_visible {
                debug_window(ctx, time, stats);
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn control_panel(ctx: &egui::Context, model: &PanelModel<'_>, actions: &mut PanelActions) {
    egui::Window::new("AmeriKid Mystery Crate")
        .default_pos([16.0, 16.0])
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.heading("Unbox the drop");
            ui.label("Spin the crate and land on a random hat.");
            ui.separator();

            ui.horizontal(|ui| {
                let buttons = [
                    ("Open", model.buttons.open, Intent::RequestOpen),
                    ("Close", model.buttons.close, Intent::RequestClose),
                    ("Spin", model.buttons.spin, Intent::RequestSpin),
                    ("Claim", model.buttons.claim, Intent::RequestClaim),
                ];
                for (label, enabled, intent) in buttons {
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        actions.intents.push(intent);
                    }
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(Vec2::new(48.0, 36.0), egui::Sense::hover());
                match model.winner_colors {
                    Some((primary, accent)) => {
                        ui.painter().rect_filled(rect, 6.0, rgb(primary));
                        ui.painter()
                            .circle_filled(rect.center(), 8.0, rgb(accent));
                    }
                    None => {
                        ui.painter().rect_filled(rect, 6.0, Color32::from_gray(40));
                    }
                }
                ui.vertical(|ui| {
                    ui.small("Winner");
                    ui.strong(model.winner_name);
                    ui.label(model.status_line);
                });
            });
            ui.separator();

            ui.small("Animations");
            ui.label(format!("animations found: {}", model.clip_names.len()));
            for name in model.clip_names {
                let label = if name.is_empty() { "Unnamed clip" } else { name };
                ui.label(format!("• {label}"));
            }

            if let Some(message) = model.error_banner {
                ui.separator();
                ui.colored_label(Color32::from_rgb(0xff, 0x6b, 0x6b), message);
            }
        });
}

fn debug_window(ctx: &egui::Context, time: &TimeState, stats: &DebugStats) {
    egui::Window::new("Debug")
        .default_pos([16.0, 420.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {:.1}", time.smoothed_fps));
            ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
            ui.label(format!("Frame: {}", time.frame_count));
            ui.label(format!("Clock: {:.3} s", time.now_us() as f64 / 1_000_000.0));
            ui.separator();
            ui.label(format!("State: {}", stats.state_label));
            ui.label(format!("Reel: {} / {}", stats.reel_index, stats.reel_len));
            if let Some((taken, total)) = stats.spin_steps {
                ui.label(format!("Steps: {taken} / {total}"));
            }
            ui.label(format!(
                "Lid: {:.1}° ({})",
                stats.lid_angle_deg,
                if stats.crate_open { "open" } else { "closed" }
            ));
            ui.label(format!(
                "Driver: {}",
                if stats.fallback { "fallback pivot" } else { "model" }
            ));
        });
}

fn paint_scene(ctx: &egui::Context, scene: &ScenePaint) {
    let painter = ctx.layer_painter(egui::LayerId::background());
    for shape in &scene.shapes {
        match shape {
            PaintShape::Polygon {
                points,
                fill,
                stroke,
            } => {
                if points.len() < 3 {
                    continue;
                }
                let pts: Vec<Pos2> = points.iter().map(|p| Pos2::new(p[0], p[1])).collect();
                painter.add(egui::Shape::convex_polygon(
                    pts,
                    rgba(*fill),
                    Stroke::new(1.5, rgba(*stroke)),
                ));
            }
            PaintShape::Card {
                center,
                size,
                primary,
                accent,
                glow,
            } => {
                let center = Pos2::new(center[0], center[1]);
                let rect = Rect::from_center_size(center, Vec2::new(size[0], size[1]));
                let glow = glow.clamp(0.0, 1.0);
                if glow > 0.0 {
                    let halo = (glow * 160.0) as u8;
                    painter.rect_filled(
                        rect.expand(14.0 * glow),
                        18.0,
                        Color32::from_rgba_unmultiplied(0xff, 0xd8, 0x6b, halo),
                    );
                }
                painter.rect_filled(rect, 12.0, rgb(*primary));
                painter.circle_filled(center, size[1].min(size[0]) * 0.18, rgb(*accent));
            }
        }
    }
}

fn rgb(c: [u8; 3]) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

fn rgba(c: [u8; 4]) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}
