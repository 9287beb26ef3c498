use egui::Context;

use crate::controller::FrameLoopContext;
use crate::model::settings::color_to_hex;
use crate::model::{Camera, FogSettings, LightSettings};

/// Build the complete UI and return egui output. Edits go straight into
/// the scene settings and camera and take effect on the next frame.
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    frame: &mut FrameLoopContext,
    canvas_width: u32,
) -> egui::FullOutput {
    let output = egui_ctx.run(raw_input, |ctx| {
        draw_stats_window(ctx, frame);
        draw_settings_window(ctx, frame, canvas_width);
    });

    // a drag that starts on a window must not orbit the camera
    frame.input_state.borrow_mut().ui_wants_pointer = egui_ctx.wants_pointer_input();
    output
}

fn draw_stats_window(ctx: &Context, frame: &FrameLoopContext) {
    let stats = &frame.stats;
    egui::Window::new("Stats")
        .default_pos([8.0, 8.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", stats.fps)).small());
            ui.label(egui::RichText::new(format!("Frames: {}", stats.frames)).small());
            ui.label(egui::RichText::new(format!(
                "Nodes: {}  Meshes: {}  Textures: {}",
                frame.scene.node_count(),
                frame.scene.mesh_count(),
                frame.scene.texture_count(),
            )).small());
            if frame.loader.in_flight() > 0 {
                ui.label(egui::RichText::new(format!("Loading: {}", frame.loader.in_flight())).small());
            }
            if frame.picking_enabled {
                ui.separator();
                let picked = stats.picked.as_deref().unwrap_or("-");
                ui.label(egui::RichText::new(format!("Picked: {picked}")).small());
            }
        });
}

fn draw_settings_window(ctx: &Context, frame: &mut FrameLoopContext, canvas_width: u32) {
    egui::Window::new("Settings")
        .default_pos([canvas_width as f32 - 220.0, 8.0])
        .default_size([210.0, 200.0])
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Lights")
                .default_open(true)
                .show(ui, |ui| light_controls(ui, &mut frame.scene.lights));
            egui::CollapsingHeader::new("Fog")
                .show(ui, |ui| fog_controls(ui, &mut frame.scene.fog));
            egui::CollapsingHeader::new("Camera")
                .show(ui, |ui| camera_controls(ui, &mut frame.camera));
        });
}

fn color_row(ui: &mut egui::Ui, label: &str, color: &mut [f32; 3]) {
    ui.horizontal(|ui| {
        ui.color_edit_button_rgb(color);
        ui.label(egui::RichText::new(format!("{label} #{:06X}", color_to_hex(*color))).small());
    });
}

fn light_controls(ui: &mut egui::Ui, lights: &mut LightSettings) {
    color_row(ui, "Ambient", &mut lights.ambient_color);
    ui.add(egui::Slider::new(&mut lights.ambient_intensity, 0.0..=2.0).text("ambient"));
    color_row(ui, "Sun", &mut lights.sun_color);
    ui.add(egui::Slider::new(&mut lights.sun_intensity, 0.0..=5.0).text("sun"));
    ui.horizontal(|ui| {
        for axis in lights.sun_position.iter_mut() {
            ui.add(egui::DragValue::new(axis).speed(0.1));
        }
    });
}

fn fog_controls(ui: &mut egui::Ui, fog: &mut FogSettings) {
    ui.checkbox(&mut fog.enabled, "enabled");
    color_row(ui, "Color", &mut fog.color);

    let range = fog.range();
    let mut near = range.min;
    let mut far = range.max;
    if ui.add(egui::Slider::new(&mut near, 0.1..=100.0).text("near")).changed() {
        fog.set_range(range.with_min(near));
    }
    if ui.add(egui::Slider::new(&mut far, 0.1..=100.0).text("far")).changed() {
        fog.set_range(fog.range().with_max(far));
    }
}

fn camera_controls(ui: &mut egui::Ui, camera: &mut Camera) {
    let mut fov = camera.fov();
    if ui.add(egui::Slider::new(&mut fov, 1.0..=180.0).text("fov")).changed() {
        camera.set_fov(fov);
    }
    let mut near = camera.near();
    if ui.add(egui::Slider::new(&mut near, 0.1..=50.0).logarithmic(true).text("near")).changed() {
        camera.set_near(near);
    }
    let mut far = camera.far();
    if ui.add(egui::Slider::new(&mut far, 0.1..=200.0).logarithmic(true).text("far")).changed() {
        camera.set_far(far);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScenePreset;

    #[test]
    fn test_ui_runs_headless_without_touching_settings() {
        let mut preset = ScenePreset::builtin("picking").unwrap();
        preset.models.clear();
        let mut frame = FrameLoopContext::new(&preset, 800, 600);
        let lights = frame.scene.lights.clone();
        let fov = frame.camera.fov();

        let ctx = Context::default();
        build_ui(&ctx, egui::RawInput::default(), &mut frame, 800);
        build_ui(&ctx, egui::RawInput::default(), &mut frame, 800);

        assert_eq!(frame.scene.lights, lights);
        assert_eq!(frame.camera.fov(), fov);
        assert!(!frame.input_state.borrow().ui_wants_pointer);
    }
}
