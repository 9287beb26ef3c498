use glam::Vec2;

use crate::model::settings::{color_from_hex, Rgb};
use crate::model::{Camera, NodeId, Scene};

/// Pointer position meaning "nothing under the pointer". It is far outside
/// the viewport, so no ray is ever cast from it.
pub const NO_PICK: Vec2 = Vec2::new(-100000.0, -100000.0);

const FLASH_ON: u32 = 0xFFFF00;
const FLASH_OFF: u32 = 0xFF0000;

/// On-screen rectangle of the canvas in client (CSS) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Highlight {
    node: NodeId,
    saved_emissive: Rgb,
}

/// Tracks the pointer in normalized device coordinates and flashes the
/// emissive color of whatever is under it. At most one node is
/// highlighted at a time.
#[derive(Debug, Clone)]
pub struct PickTracker {
    ndc: Vec2,
    highlighted: Option<Highlight>,
}

impl PickTracker {
    pub fn new() -> Self {
        Self {
            ndc: NO_PICK,
            highlighted: None,
        }
    }

    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlighted.map(|h| h.node)
    }

    /// Pointer moved to `client` (event client coordinates).
    /// `pixel_size` is the canvas drawing buffer size, which already
    /// includes the device pixel ratio.
    pub fn set_from_client(&mut self, client: Vec2, rect: &CanvasRect, pixel_size: (u32, u32)) {
        if rect.width <= 0.0 || rect.height <= 0.0 || pixel_size.0 == 0 || pixel_size.1 == 0 {
            return;
        }
        let pixel = canvas_relative(client, rect, pixel_size);
        self.ndc = pixel_to_ndc(pixel, pixel_size);
    }

    /// Pointer left the canvas or the touch ended
    pub fn clear(&mut self) {
        self.ndc = NO_PICK;
    }

    /// Restore the previous highlight, then highlight the nearest node
    /// under the pointer with a flashing emissive color.
    pub fn resolve(&mut self, scene: &mut Scene, camera: &Camera, time: f32) -> Option<NodeId> {
        if let Some(prev) = self.highlighted.take() {
            if let Some(node) = scene.node_mut(prev.node) {
                node.material.emissive = prev.saved_emissive;
            }
        }

        let ray = camera.ray_from_ndc(self.ndc)?;
        let hit = scene.raycast(&ray).into_iter().next()?;
        let node = scene.node_mut(hit.node)?;

        self.highlighted = Some(Highlight {
            node: hit.node,
            saved_emissive: node.material.emissive,
        });
        node.material.emissive = flash_color(time);
        Some(hit.node)
    }
}

impl Default for PickTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Client coordinates to canvas drawing-buffer pixels
pub fn canvas_relative(client: Vec2, rect: &CanvasRect, pixel_size: (u32, u32)) -> Vec2 {
    Vec2::new(
        (client.x - rect.left) * pixel_size.0 as f32 / rect.width,
        (client.y - rect.top) * pixel_size.1 as f32 / rect.height,
    )
}

/// Canvas pixels to [-1, 1] with +y up
pub fn pixel_to_ndc(pixel: Vec2, pixel_size: (u32, u32)) -> Vec2 {
    Vec2::new(
        pixel.x / pixel_size.0 as f32 * 2.0 - 1.0,
        pixel.y / pixel_size.1 as f32 * -2.0 + 1.0,
    )
}

/// Two-tone square wave at 8x time: yellow in the upper half of each
/// cycle, red otherwise
pub fn flash_color(time: f32) -> Rgb {
    if (time * 8.0).rem_euclid(2.0) > 1.0 {
        color_from_hex(FLASH_ON)
    } else {
        color_from_hex(FLASH_OFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CameraSettings, Material, SceneNode, Transform};
    use crate::utils::create_box_mesh;
    use glam::Vec3;

    const SIZE: (u32, u32) = (800, 600);

    fn setup() -> (Scene, Camera, NodeId, NodeId) {
        let mut scene = Scene::new();
        let cube = scene.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        let mut material = Material::default();
        material.emissive = [0.1, 0.2, 0.3];
        let left = scene.add_node(SceneNode::mesh("left", cube, material, Transform::at(Vec3::new(-2.0, 0.0, 0.0))));
        let right = scene.add_node(SceneNode::mesh("right", cube, Material::default(), Transform::at(Vec3::new(2.0, 0.0, 0.0))));

        let settings = CameraSettings {
            fov: 60.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
        };
        (scene, Camera::new(&settings, SIZE.0, SIZE.1), left, right)
    }

    // ndc of the screen projection of a world point
    fn ndc_of(camera: &Camera, world: Vec3) -> Vec2 {
        camera.view_proj().project_point3(world).truncate()
    }

    fn full_canvas() -> CanvasRect {
        CanvasRect { left: 0.0, top: 0.0, width: SIZE.0 as f32, height: SIZE.1 as f32 }
    }

    fn tracked_emissives(scene: &Scene) -> usize {
        scene.nodes().filter(|(_, n)| {
            n.material.emissive == color_from_hex(FLASH_ON) || n.material.emissive == color_from_hex(FLASH_OFF)
        }).count()
    }

    #[test]
    fn test_top_left_pixel_maps_to_minus_one_one() {
        assert_eq!(pixel_to_ndc(Vec2::ZERO, SIZE), Vec2::new(-1.0, 1.0));
        assert_eq!(pixel_to_ndc(Vec2::new(400.0, 300.0), SIZE), Vec2::ZERO);
        assert_eq!(pixel_to_ndc(Vec2::new(800.0, 600.0), SIZE), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_client_coordinates_account_for_rect_and_pixel_ratio() {
        // canvas drawn at 2x device pixel ratio, offset on the page
        let rect = CanvasRect { left: 100.0, top: 50.0, width: 400.0, height: 300.0 };
        let mut pick = PickTracker::new();

        pick.set_from_client(Vec2::new(100.0, 50.0), &rect, SIZE);
        assert_eq!(pick.ndc(), Vec2::new(-1.0, 1.0));

        pick.set_from_client(Vec2::new(300.0, 200.0), &rect, SIZE);
        assert_eq!(pick.ndc(), Vec2::ZERO);
        assert_eq!(canvas_relative(Vec2::new(300.0, 200.0), &rect, SIZE), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_clear_sets_sentinel_and_hits_nothing() {
        let (mut scene, camera, left, _) = setup();
        let mut pick = PickTracker::new();
        pick.set_from_client(Vec2::new(400.0, 300.0), &full_canvas(), SIZE);
        pick.clear();

        let ndc = pick.ndc();
        assert!(ndc.x < -1.0 && ndc.y < -1.0);
        assert_eq!(pick.resolve(&mut scene, &camera, 1.0), None);
        assert_eq!(pick.highlighted(), None);
        assert_eq!(scene.node(left).unwrap().material.emissive, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_resolve_highlights_node_under_pointer() {
        let (mut scene, camera, left, _) = setup();
        let mut pick = PickTracker::new();
        pick.ndc = ndc_of(&camera, Vec3::new(-2.0, 0.0, 0.5));

        assert_eq!(pick.resolve(&mut scene, &camera, 0.0), Some(left));
        assert_eq!(scene.node(left).unwrap().material.emissive, color_from_hex(FLASH_OFF));
        assert_eq!(tracked_emissives(&scene), 1);
    }

    #[test]
    fn test_moving_to_other_node_restores_first() {
        let (mut scene, camera, left, right) = setup();
        let mut pick = PickTracker::new();
        let original = scene.node(left).unwrap().material.emissive;

        pick.ndc = ndc_of(&camera, Vec3::new(-2.0, 0.0, 0.5));
        pick.resolve(&mut scene, &camera, 0.2);
        assert_ne!(scene.node(left).unwrap().material.emissive, original);

        pick.ndc = ndc_of(&camera, Vec3::new(2.0, 0.0, 0.5));
        assert_eq!(pick.resolve(&mut scene, &camera, 0.3), Some(right));
        assert_eq!(scene.node(left).unwrap().material.emissive, original);
        assert_eq!(tracked_emissives(&scene), 1);

        // same node again: the saved color is still the pre-highlight one
        pick.resolve(&mut scene, &camera, 0.4);
        pick.clear();
        pick.resolve(&mut scene, &camera, 0.5);
        assert_eq!(scene.node(right).unwrap().material.emissive, [0.0, 0.0, 0.0]);
        assert_eq!(tracked_emissives(&scene), 0);
    }

    #[test]
    fn test_empty_space_clears_highlight() {
        let (mut scene, camera, left, _) = setup();
        let mut pick = PickTracker::new();
        pick.ndc = ndc_of(&camera, Vec3::new(-2.0, 0.0, 0.5));
        pick.resolve(&mut scene, &camera, 0.0);

        pick.ndc = Vec2::new(0.0, 0.9);
        assert_eq!(pick.resolve(&mut scene, &camera, 0.1), None);
        assert_eq!(pick.highlighted(), None);
        assert_eq!(scene.node(left).unwrap().material.emissive, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_flash_alternates() {
        assert_eq!(flash_color(0.0), color_from_hex(FLASH_OFF));
        assert_eq!(flash_color(0.1), color_from_hex(FLASH_OFF));
        assert_eq!(flash_color(0.15), color_from_hex(FLASH_ON));
        assert_eq!(flash_color(0.25), color_from_hex(FLASH_OFF));
    }
}
