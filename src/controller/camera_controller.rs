use glam::{Vec2, Vec3};
use crate::model::Camera;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Orbits the camera around a target point with pointer drag and zoom
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Radians per dragged pixel
    pub rotate_speed: f32,
    /// Fractional distance change per wheel unit
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitController {
    /// Start orbiting from wherever the camera currently is
    pub fn from_camera(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.length().max(0.01);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        Self {
            target: camera.target,
            distance,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            rotate_speed: 0.005,
            zoom_speed: 0.001,
            min_distance: 1.0,
            max_distance: 100.0,
        }
    }

    /// Dragging right swings the camera left around the target, like an
    /// orbit control
    pub fn apply_drag(&mut self, delta: Vec2) {
        self.yaw -= delta.x * self.rotate_speed;
        self.pitch = (self.pitch + delta.y * self.rotate_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Positive wheel deltas move away from the target
    pub fn apply_zoom(&mut self, wheel_delta: f32) {
        let factor = (1.0 + wheel_delta * self.zoom_speed).max(0.1);
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch) * self.distance
    }

    pub fn apply_to(&self, camera: &mut Camera) {
        camera.position = self.eye();
        camera.target = self.target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CameraSettings;

    fn camera_at(position: [f32; 3]) -> Camera {
        let settings = CameraSettings {
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            position,
            target: [0.0, 0.0, 0.0],
        };
        Camera::new(&settings, 800, 600)
    }

    #[test]
    fn test_from_camera_preserves_position() {
        let mut camera = camera_at([3.0, 4.0, 5.0]);
        let orbit = OrbitController::from_camera(&camera);
        orbit.apply_to(&mut camera);
        assert!((camera.position - Vec3::new(3.0, 4.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn test_drag_keeps_distance_and_clamps_pitch() {
        let camera = camera_at([0.0, 0.0, 7.0]);
        let mut orbit = OrbitController::from_camera(&camera);
        orbit.apply_drag(Vec2::new(120.0, 0.0));
        assert!((orbit.eye().length() - 7.0).abs() < 1e-4);
        assert!(orbit.eye().x < 0.0);

        orbit.apply_drag(Vec2::new(0.0, 10_000.0));
        assert!(orbit.pitch <= PITCH_LIMIT);
        assert!(orbit.eye().y > 6.9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let camera = camera_at([0.0, 0.0, 7.0]);
        let mut orbit = OrbitController::from_camera(&camera);
        orbit.apply_zoom(100.0);
        assert!(orbit.distance > 7.0);

        orbit.apply_zoom(-1_000_000.0);
        assert_eq!(orbit.distance, orbit.min_distance);
        for _ in 0..100 {
            orbit.apply_zoom(1000.0);
        }
        assert_eq!(orbit.distance, orbit.max_distance);
    }
}
