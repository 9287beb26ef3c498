use glam::{Mat4, Vec2, Vec3};

use super::raycast::Ray;
use super::settings::CameraSettings;

/// Perspective camera looking at a target point.
///
/// The projection matrix is cached; every setter that changes a projection
/// parameter recomputes it, so the GUI can change fov/near/far directly.
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    fov_deg: f32,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Camera {
    pub fn new(settings: &CameraSettings, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::from(settings.position),
            target: Vec3::from(settings.target),
            up: Vec3::Y,
            fov_deg: settings.fov,
            aspect: aspect_ratio(width, height),
            near: settings.near,
            far: settings.far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn fov(&self) -> f32 { self.fov_deg }
    pub fn near(&self) -> f32 { self.near }
    pub fn far(&self) -> f32 { self.far }
    pub fn aspect(&self) -> f32 { self.aspect }

    pub fn set_fov(&mut self, fov_deg: f32) {
        self.fov_deg = fov_deg.clamp(1.0, 179.0);
        self.update_projection();
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near.max(1e-4);
        self.update_projection();
    }

    pub fn set_far(&mut self, far: f32) {
        self.far = far;
        self.update_projection();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
        self.update_projection();
    }

    pub fn update_projection(&mut self) {
        // keep the frustum non-degenerate while a slider drags near past far
        let far = self.far.max(self.near + 1e-3);
        self.projection = Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, far);
    }

    pub fn projection(&self) -> Mat4 { self.projection }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }

    /// Ray from the camera position through a point in normalized device
    /// coordinates. Points outside the viewport yield no ray.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        if !(-1.0..=1.0).contains(&ndc.x) || !(-1.0..=1.0).contains(&ndc.y) {
            return None;
        }

        let inv = self.view_proj().inverse();
        // wgpu clip space depth runs 0..1
        let through = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Some(Ray::new(self.position, through - self.position))
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let settings = CameraSettings {
            fov: 60.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 10.0],
            target: [0.0, 0.0, 0.0],
        };
        Camera::new(&settings, 800, 600)
    }

    #[test]
    fn test_setters_recompute_projection() {
        let mut cam = camera();
        let before = cam.projection();

        cam.set_fov(90.0);
        assert_ne!(cam.projection(), before);
        assert_eq!(cam.fov(), 90.0);

        let wide = cam.projection();
        cam.set_aspect(600, 600);
        assert_ne!(cam.projection(), wide);
        assert_eq!(cam.aspect(), 1.0);

        let square = cam.projection();
        cam.set_far(10.0);
        assert_ne!(cam.projection(), square);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::ZERO).unwrap();
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
        assert_eq!(ray.origin, cam.position);
    }

    #[test]
    fn test_ray_hits_geometry_inside_near_plane() {
        use crate::model::scene::{Material, Scene, SceneNode, Transform};
        use crate::utils::create_box_mesh;

        let mut cam = camera();
        cam.set_near(5.0);
        let mut scene = Scene::new();
        let cube = scene.add_mesh(create_box_mesh(1.0, 1.0, 1.0));
        // 3 units in front of the camera, closer than the near plane
        let id = scene.add_node(SceneNode::mesh("close", cube, Material::default(), Transform::at(Vec3::new(0.0, 0.0, 7.0))));

        let ray = cam.ray_from_ndc(Vec2::ZERO).unwrap();
        let hits = scene.raycast(&ray);
        assert_eq!(hits.first().map(|h| h.node), Some(id));
        assert!((hits[0].distance - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_corner_ray_goes_up_left() {
        let cam = camera();
        let ray = cam.ray_from_ndc(Vec2::new(-1.0, 1.0)).unwrap();
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_outside_viewport_has_no_ray() {
        let cam = camera();
        assert!(cam.ray_from_ndc(Vec2::new(-100000.0, -100000.0)).is_none());
        assert!(cam.ray_from_ndc(Vec2::new(0.0, 1.5)).is_none());
    }
}
