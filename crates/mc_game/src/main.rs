//! Mystery Crate -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. Each
//! `RedrawRequested` is one frame:
//!
//!   1. `begin_frame()` -- advance the microsecond clock from wall time
//!   2. keyboard and panel intents go to the session, then the session ticks
//!   3. presentation reads the session and projects the crate and hat card
//!   4. clear pass, then the egui pass (scene layer plus control panel)
//!
//! The session owns every timed operation; this file only feeds it intents
//! and the clock and draws what it reports.

mod assets;
mod audio;
mod config;
mod lid;
mod presentation;
#[cfg(test)]
mod replay;
mod session;
mod spin;

use std::path::Path;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use mc_core::catalog::{load_catalog, Catalog};
use mc_core::input::{InputState, Key};
use mc_core::random::{seeded_rng, session_rng, RandomSource};
use mc_core::time::TimeState;
use mc_devtools::{ButtonStates, DebugStats, Overlay, PanelModel};
use mc_platform::window::PlatformConfig;
use mc_render::{Camera3D, GpuContext};

use assets::CrateAsset;
use audio::SoundBank;
use lid::CrateController;
use session::Session;

const SESSION_CONFIG_PATH: &str = "assets/config/session.json";
const CATALOG_PATH: &str = "assets/catalog/hats.json";
const MODEL_PATH: &str = "assets/models/crate.json";
const AUDIO_DIR: &str = "assets/audio";
const SEED_ENV: &str = "MC_SEED";
/// Backdrop behind the crate, linear RGB.
const CLEAR_COLOR: [f64; 3] = [0.012, 0.010, 0.022];

struct GameState {
    window: Arc<Window>,
    gpu: GpuContext,
    camera: Camera3D,
    time: TimeState,
    input: InputState,
    overlay: Overlay,
    session: Session,
    crate_asset: CrateAsset,
}

impl GameState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let overlay = Overlay::new(&gpu.device, gpu.surface_format, &window);

        let config = config::load_or_default(Path::new(SESSION_CONFIG_PATH));
        let catalog = match load_catalog(Path::new(CATALOG_PATH)) {
            Ok(catalog) => {
                log::info!(
                    "Loaded catalog '{}' ({} items)",
                    catalog.catalog_id,
                    catalog.len()
                );
                catalog
            }
            Err(e) => {
                log::warn!("{e}; using the built-in catalog");
                Catalog::builtin()
            }
        };
        let crate_asset = assets::load_crate(Path::new(MODEL_PATH), config.lid_open_angle());
        let lid = CrateController::new(
            crate_asset.driver.clone(),
            crate_asset.fallback,
            config.lid_duration_ms,
        );
        let sounds = SoundBank::load(Path::new(AUDIO_DIR));
        let session = Session::new(catalog, lid, sounds, config, session_random());

        let mut camera = Camera3D::new(1, 1);
        camera.viewport = logical_viewport(&window, gpu.size);

        Self {
            window,
            gpu,
            camera,
            time: TimeState::new(),
            input: InputState::new(),
            overlay,
            session,
            crate_asset,
        }
    }

    fn debug_stats(&self, now_us: u64) -> DebugStats {
        let lid = self.session.lid();
        DebugStats {
            state_label: self.session.state().label().to_string(),
            reel_index: self.session.spin().current_index(),
            reel_len: self.session.spin().reel_len(),
            spin_steps: self
                .session
                .spin()
                .run()
                .map(|run| (run.steps_taken, run.plan.total_steps)),
            lid_angle_deg: lid.lid_angle(now_us).to_degrees(),
            crate_open: lid.is_open(),
            fallback: lid.is_fallback(),
        }
    }
}

/// `MC_SEED=<u64>` makes every spin reproducible.
fn session_random() -> Box<dyn RandomSource> {
    match std::env::var(SEED_ENV).ok().map(|s| s.parse::<u64>()) {
        Some(Ok(seed)) => {
            log::info!("Using fixed random seed {seed}");
            Box::new(seeded_rng(seed))
        }
        Some(Err(e)) => {
            log::warn!("Ignoring {SEED_ENV}: {e}");
            Box::new(session_rng())
        }
        None => Box::new(session_rng()),
    }
}

/// The painter works in egui points, so the camera projects into logical pixels.
fn logical_viewport(window: &Window, physical: (u32, u32)) -> (u32, u32) {
    let scale = window.scale_factor().max(0.1);
    (
        ((physical.0 as f64) / scale).round() as u32,
        ((physical.1 as f64) / scale).round() as u32,
    )
}

struct App {
    config: PlatformConfig,
    state: Option<GameState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = mc_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(GameState::new(window));
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state.overlay.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = logical_viewport(&state.window, (w, h));
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                state.camera.viewport = logical_viewport(&state.window, state.gpu.size);
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(key),
                            ElementState::Released => state.input.key_up(key),
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();
                let now = state.time.now_us();

                if state.input.is_just_pressed(Key::Escape) {
                    event_loop.exit();
                    return;
                }
                if state.input.is_just_pressed(Key::F3) {
                    state.overlay.toggle_debug();
                }
                for intent in state.input.intents() {
                    state.session.handle(intent, now);
                }
                state.input.end_frame();

                state.session.tick(now);
                for transition in state.session.drain_transitions() {
                    log::debug!(
                        "Status changed at {:.3}s: {}",
                        transition.at_us as f64 / 1_000_000.0,
                        transition.to
                    );
                }

                let view = presentation::sync(&state.session, now);
                let scene = presentation::paint_scene(
                    &view,
                    &state.crate_asset.parts,
                    state.crate_asset.lid_hinge,
                    &mut state.camera,
                );

                let (output, frame_view) = match state.gpu.begin_frame() {
                    Some(frame) => frame,
                    None => return,
                };

                let status_line = state.session.status_line();
                let winner = state.session.winner();
                let winner_name = winner.map_or("Spin to reveal a hat", |item| item.name.as_str());
                let winner_colors = winner.map(|item| (item.colors.primary, item.colors.accent));
                let controls = state.session.controls();
                let stats = state.debug_stats(now);
                let model = PanelModel {
                    status_line: &status_line,
                    winner_name,
                    winner_colors,
                    buttons: ButtonStates {
                        open: controls.open,
                        close: controls.close,
                        spin: controls.spin,
                        claim: controls.claim,
                    },
                    clip_names: &state.crate_asset.clip_names,
                    error_banner: state.crate_asset.error_banner.as_deref(),
                    scene: &scene,
                };

                let (egui_primitives, egui_textures_delta, panel_actions) =
                    state
                        .overlay
                        .prepare(&state.window, &state.time, &model, &stats);

                // Clicks from this frame's panel; their effect shows next frame.
                for intent in panel_actions.intents {
                    state.session.handle(intent, now);
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                state.gpu.clear_pass(&mut encoder, &frame_view, CLEAR_COLOR);

                state.overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
                    &mut encoder,
                    &egui_primitives,
                    &egui_textures_delta,
                    &screen_descriptor,
                );

                {
                    let mut egui_pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui Render Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &frame_view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();

                    state
                        .overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::KeyO => Some(Key::O),
        KeyCode::KeyC => Some(Key::C),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::Space => Some(Key::Space),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(Key::Enter),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Mystery Crate starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
