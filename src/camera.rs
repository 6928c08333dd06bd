use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

/// Perspective camera that always faces the scene origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Camera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            position: config.initial_position,
            fov_degrees: config.fov_degrees,
            aspect,
            near: config.near,
            far: config.far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// View matrix recomputed from the current position on every call.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        );
    }
}

/// First-order low-pass toward a pointer-derived target.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    parallax: f32,
    smoothing: f32,
    depth: f32,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            parallax: config.parallax,
            smoothing: config.smoothing,
            depth: config.initial_position.z,
        }
    }

    /// Target for a pointer normalized to `[-1, 1]`, y growing downward.
    pub fn target(&self, pointer: Vec2) -> Vec3 {
        Vec3::new(
            pointer.x * self.parallax,
            -pointer.y * self.parallax,
            self.depth,
        )
    }

    pub fn update(&self, camera: &mut Camera, pointer: Vec2) {
        let target = self.target(pointer);
        camera.position.x += (target.x - camera.position.x) * self.smoothing;
        camera.position.y += (target.y - camera.position.y) * self.smoothing;
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn converges_toward_pointer_target() {
        let controller = CameraController::default();
        let mut camera = camera();
        for _ in 0..300 {
            controller.update(&mut camera, Vec2::new(1.0, 1.0));
        }
        assert!((camera.position.x - 0.5).abs() < 1e-4);
        assert!((camera.position.y + 0.5).abs() < 1e-4);
        assert_eq!(camera.position.z, 5.0);
    }

    #[test]
    fn error_decays_by_smoothing_factor() {
        let controller = CameraController::default();
        let mut camera = camera();
        let pointer = Vec2::new(-0.6, 0.8);
        let target = controller.target(pointer);
        let initial = (target - camera.position).truncate().abs();
        let mut previous = initial;
        for n in 1..=60 {
            controller.update(&mut camera, pointer);
            let error = (target - camera.position).truncate().abs();
            let bound = initial * 0.95_f32.powi(n);
            assert!(error.x <= bound.x + 1e-5 && error.y <= bound.y + 1e-5);
            assert!(error.x <= previous.x && error.y <= previous.y);
            previous = error;
        }
    }

    #[test]
    fn never_overshoots_after_jump() {
        let controller = CameraController::default();
        let mut camera = camera();
        for _ in 0..50 {
            controller.update(&mut camera, Vec2::new(1.0, -1.0));
        }
        for _ in 0..50 {
            controller.update(&mut camera, Vec2::new(-1.0, 1.0));
            assert!(camera.position.x >= -0.5);
            assert!(camera.position.y >= -0.5);
        }
    }

    #[test]
    fn view_faces_origin() {
        let mut camera = camera();
        camera.position = Vec3::new(0.4, -0.3, 5.0);
        let origin_in_view = camera.view().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.x.abs() < 1e-5);
        assert!(origin_in_view.y.abs() < 1e-5);
        assert!(origin_in_view.z < 0.0);
    }

    #[test]
    fn aspect_updates_projection() {
        let mut camera = camera();
        let before = camera.projection();
        camera.set_aspect(1.0);
        assert_eq!(camera.aspect(), 1.0);
        assert_ne!(before, camera.projection());
    }
}
