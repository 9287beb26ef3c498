use winit::{
    event::*,
    event_loop::EventLoop,
    window::Window,
};
use glam::Vec2;
use std::sync::Arc;

// Import from the library crate
use showcase::{logging, ui, model, view, controller};

use controller::{CanvasRect, FrameLoopContext, InputEvent, PointerUpdate};
use model::ScenePreset;
use view::{GpuContext, RenderState};

struct App {
    gpu: GpuContext,
    window: Arc<Window>,
    render_state: RenderState,
    frame_ctx: FrameLoopContext,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Input handling
    cursor: Vec2,

    // Frame timing
    start_time: std::time::Instant,
}

impl App {
    async fn new(window: Arc<Window>, preset: &ScenePreset) -> Result<Self, view::GpuInitError> {
        let gpu = GpuContext::new_native(window.clone()).await?;
        let (width, height) = (gpu.config.width, gpu.config.height);

        let render_state = RenderState::new(
            &gpu.device,
            &gpu.queue,
            gpu.format,
            gpu.config.alpha_mode,
            width,
            height,
        );
        let frame_ctx = FrameLoopContext::new(preset, width, height);

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            gpu,
            window,
            render_state,
            frame_ctx,
            egui_state,
            egui_ctx,
            cursor: Vec2::ZERO,
            start_time: std::time::Instant::now(),
        })
    }

    /// Feed an event to the orbit input and forward pointer changes to the
    /// pick tracker. The window is the canvas, so client coordinates are
    /// already physical pixels.
    fn route(&mut self, event: InputEvent) {
        let update = self.frame_ctx.input_state.borrow_mut().process_event(&event);
        match update {
            Some(PointerUpdate::Moved(client)) => {
                let size = self.window.inner_size();
                let rect = CanvasRect {
                    left: 0.0,
                    top: 0.0,
                    width: size.width as f32,
                    height: size.height as f32,
                };
                self.frame_ctx.pick.borrow_mut().set_from_client(client, &rect, (size.width, size.height));
            }
            Some(PointerUpdate::Cleared) => self.frame_ctx.pick.borrow_mut().clear(),
            None => {}
        }
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        let egui_captured = self.egui_state.on_window_event(self.window.as_ref(), event).consumed;
        if egui_captured {
            return true;
        }

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.route(InputEvent::PointerMove { x: self.cursor.x, y: self.cursor.y });
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.route(InputEvent::PointerLeave);
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Right => controller::MouseButton::Right,
                    MouseButton::Middle => controller::MouseButton::Middle,
                    _ => controller::MouseButton::Left,
                };
                let event = match state {
                    ElementState::Pressed => InputEvent::PointerDown { button, x: self.cursor.x, y: self.cursor.y },
                    ElementState::Released => InputEvent::PointerUp { button },
                };
                self.route(event);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // browser convention: positive delta scrolls down / zooms out
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                self.route(InputEvent::Wheel { delta_y });
                true
            }
            WindowEvent::Touch(touch) => {
                let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                let event = match touch.phase {
                    TouchPhase::Started => InputEvent::TouchStart { x, y },
                    TouchPhase::Moved => InputEvent::TouchMove { x, y },
                    TouchPhase::Ended | TouchPhase::Cancelled => InputEvent::TouchEnd,
                };
                self.route(event);
                true
            }
            WindowEvent::Focused(false) => {
                self.route(InputEvent::FocusLost);
                false
            }
            _ => false,
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let time_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let size = self.window.inner_size();

        let report = self.frame_ctx.tick(time_ms, (size.width, size.height));
        if let Some((w, h)) = report.resized {
            self.render_state.resize(&self.gpu.device, &self.gpu.surface, w, h);
        }

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, &mut self.frame_ctx, self.render_state.width);
        self.egui_state.handle_platform_output(&self.window, std::mem::take(&mut full_output.platform_output));

        let dpr = full_output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        self.render_state.egui_primitives = Some(primitives);
        self.render_state.egui_full_output = Some(full_output);
        self.render_state.egui_dpr = dpr;

        self.render_state.sync_scene(&self.gpu.device, &self.gpu.queue, &self.frame_ctx.scene, &self.frame_ctx.camera);
        self.render_state.draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, &self.frame_ctx.scene)
    }
}

fn main() {
    logging::init();

    // SCENE_PRESET names a builtin preset or a .json file
    let selector = std::env::var("SCENE_PRESET").ok();
    let preset = ScenePreset::resolve(selector.as_deref());

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("failed to create event loop: {e}");
            return;
        }
    };
    let window_attributes = Window::default_attributes()
        .with_title(format!("Showcase - {}", preset.name))
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = match event_loop.create_window(window_attributes) {
        Ok(window) => Arc::new(window),
        Err(e) => {
            tracing::error!("failed to create window: {e}");
            return;
        }
    };

    let mut app = match pollster::block_on(App::new(window.clone(), &preset)) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("GPU init failed: {e}");
            return;
        }
    };

    let result = event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::RedrawRequested => {
                            match app.render() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                                Err(e) => tracing::warn!("frame skipped: {e}"),
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    });
    if let Err(e) = result {
        tracing::error!("event loop error: {e}");
    }
}
