use std::cell::RefCell;
use std::rc::Rc;

use crate::controller::camera_controller::OrbitController;
use crate::controller::input::InputState;
use crate::controller::pick::PickTracker;
use crate::model::animation::animate;
use crate::model::builder::{apply_outcome, build_scene};
use crate::model::{AssetLoader, Camera, NodeId, Scene, ScenePreset};

/// Last configured output size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
}

impl ViewportState {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the new size when `measured` differs from the configured
    /// one. Zero-sized measurements (minimized window, hidden canvas) are
    /// ignored.
    pub fn check(&mut self, measured: (u32, u32)) -> Option<(u32, u32)> {
        let (w, h) = measured;
        if w == 0 || h == 0 || (w, h) == (self.width, self.height) {
            return None;
        }
        self.width = w;
        self.height = h;
        Some((w, h))
    }
}

/// Rolling frame statistics shown in the debug window
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub fps: f32,
    pub last_time: Option<f32>,
    pub picked: Option<String>,
}

impl FrameStats {
    fn record(&mut self, time: f32) {
        self.frames += 1;
        if let Some(last) = self.last_time {
            let dt = time - last;
            if dt > 0.0 {
                // smoothed, so the label stays readable
                self.fps = if self.fps == 0.0 { 1.0 / dt } else { self.fps * 0.9 + 0.1 / dt };
            }
        }
        self.last_time = Some(time);
    }
}

/// What one tick changed, for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub time: f32,
    pub resized: Option<(u32, u32)>,
    pub loaded: usize,
    pub picked: Option<NodeId>,
}

/// Scene state advanced once per display refresh
pub struct FrameLoopContext {
    pub scene: Scene,
    pub camera: Camera,
    pub orbit: Option<OrbitController>,
    pub pick: Rc<RefCell<PickTracker>>,
    pub input_state: Rc<RefCell<InputState>>,
    pub loader: AssetLoader,
    pub picking_enabled: bool,
    pub viewport: ViewportState,
    pub stats: FrameStats,
}

impl FrameLoopContext {
    /// Build the preset's scene and start loading its assets
    pub fn new(preset: &ScenePreset, width: u32, height: u32) -> Self {
        let (scene, requests) = build_scene(preset);
        let camera = Camera::new(&preset.camera, width, height);
        let orbit = preset.orbit.then(|| OrbitController::from_camera(&camera));

        let mut loader = AssetLoader::new();
        for request in requests {
            loader.request(request);
        }

        Self {
            scene,
            camera,
            orbit,
            pick: Rc::new(RefCell::new(PickTracker::new())),
            input_state: Rc::new(RefCell::new(InputState::new())),
            loader,
            picking_enabled: preset.picking,
            viewport: ViewportState::new(width, height),
            stats: FrameStats::default(),
        }
    }

    /// Advance the scene to `time_ms` (host timestamp in milliseconds).
    /// `measured` is the current output size in physical pixels.
    pub fn tick(&mut self, time_ms: f64, measured: (u32, u32)) -> FrameReport {
        let time = (time_ms * 0.001) as f32;

        let outcomes = self.loader.drain();
        let loaded = outcomes.len();
        for outcome in outcomes {
            apply_outcome(&mut self.scene, outcome);
        }

        let resized = self.viewport.check(measured);
        if let Some((w, h)) = resized {
            self.camera.set_aspect(w, h);
            tracing::debug!(width = w, height = h, "viewport resized");
        }

        if let Some(orbit) = self.orbit.as_mut() {
            let (drag, zoom) = {
                let mut input = self.input_state.borrow_mut();
                (input.consume_drag(), input.consume_zoom())
            };
            orbit.apply_drag(drag);
            orbit.apply_zoom(zoom);
            orbit.apply_to(&mut self.camera);
        }

        animate(&mut self.scene, time);

        let picked = if self.picking_enabled {
            self.pick.borrow_mut().resolve(&mut self.scene, &self.camera, time)
        } else {
            None
        };
        self.stats.picked = picked.and_then(|id| self.scene.node(id)).map(|n| n.name.clone());
        self.stats.record(time);

        FrameReport { time, resized, loaded, picked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn cubes_context() -> FrameLoopContext {
        let mut preset = ScenePreset::builtin("cubes").unwrap();
        // no files behind these in the test environment
        preset.models.clear();
        if let Some(row) = preset.cubes.as_mut() {
            row.textures.clear();
        }
        FrameLoopContext::new(&preset, 800, 600)
    }

    #[test]
    fn test_viewport_check_is_idempotent() {
        let mut viewport = ViewportState::new(800, 600);
        assert_eq!(viewport.check((800, 600)), None);
        assert_eq!(viewport.check((1024, 768)), Some((1024, 768)));
        assert_eq!(viewport.check((1024, 768)), None);
        assert_eq!(viewport.check((0, 768)), None);
        assert_eq!(viewport, ViewportState::new(1024, 768));
    }

    #[test]
    fn test_tick_converts_ms_and_rotates_cubes() {
        let mut ctx = cubes_context();
        let report = ctx.tick(5000.0, (800, 600));
        assert_eq!(report.time, 5.0);
        assert_eq!(report.resized, None);

        let cube3 = ctx.scene.find_by_name("cube3").unwrap();
        let rotation = ctx.scene.node(cube3).unwrap().transform.rotation;
        assert!((rotation.x - 2.5).abs() < 1e-5);
        assert_eq!(rotation.x, rotation.y);
    }

    #[test]
    fn test_tick_twice_same_time_is_stable() {
        let mut ctx = cubes_context();
        ctx.tick(1234.0, (800, 600));
        let first: Vec<Vec3> = ctx.scene.nodes().map(|(_, n)| n.transform.rotation).collect();
        ctx.tick(1234.0, (800, 600));
        let second: Vec<Vec3> = ctx.scene.nodes().map(|(_, n)| n.transform.rotation).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resize_updates_aspect_once() {
        let mut ctx = cubes_context();
        let report = ctx.tick(0.0, (1000, 500));
        assert_eq!(report.resized, Some((1000, 500)));
        assert_eq!(ctx.camera.aspect(), 2.0);

        let projection = ctx.camera.projection();
        let report = ctx.tick(16.0, (1000, 500));
        assert_eq!(report.resized, None);
        assert_eq!(ctx.camera.projection(), projection);
    }

    #[test]
    fn test_pick_only_runs_when_enabled() {
        let mut ctx = cubes_context();
        ctx.picking_enabled = false;
        // straight at the middle of the row
        ctx.pick.borrow_mut().set_from_client(
            Vec2::new(400.0, 300.0),
            &crate::controller::pick::CanvasRect { left: 0.0, top: 0.0, width: 800.0, height: 600.0 },
            (800, 600),
        );
        assert_eq!(ctx.tick(0.0, (800, 600)).picked, None);
        assert_eq!(ctx.stats.picked, None);
    }

    #[test]
    fn test_pick_resolves_before_draw() {
        let preset = ScenePreset::builtin("picking").unwrap();
        let mut ctx = FrameLoopContext::new(&preset, 800, 600);

        let cube0 = ctx.scene.find_by_name("cube0").unwrap();
        let center = ctx.scene.world_matrix(cube0).w_axis.truncate();
        let ndc = ctx.camera.view_proj().project_point3(center).truncate();
        // back from ndc to client pixels on an unscaled full-window canvas
        let client = Vec2::new((ndc.x + 1.0) * 400.0, (1.0 - ndc.y) * 300.0);
        ctx.pick.borrow_mut().set_from_client(
            client,
            &crate::controller::pick::CanvasRect { left: 0.0, top: 0.0, width: 800.0, height: 600.0 },
            (800, 600),
        );

        let report = ctx.tick(0.0, (800, 600));
        assert_eq!(report.picked, Some(cube0));
        assert_eq!(ctx.stats.picked.as_deref(), Some("cube0"));
    }

    #[test]
    fn test_orbit_consumes_drag() {
        let mut ctx = cubes_context();
        let camera = ctx.camera.position;
        ctx.orbit = Some(OrbitController::from_camera(&ctx.camera));
        ctx.input_state.borrow_mut().drag_delta = Vec2::new(50.0, 0.0);
        ctx.tick(0.0, (800, 600));
        assert_ne!(ctx.camera.position, camera);
        assert_eq!(ctx.input_state.borrow().drag_delta, Vec2::ZERO);
    }
}
