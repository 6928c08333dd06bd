use crate::population::{AnimationParams, DecorativeObject};

/// Advances rotation and float motion once per frame.
#[derive(Debug, Clone, Copy)]
pub struct AnimationDriver {
    amplitude: f32,
}

impl AnimationDriver {
    pub fn new(amplitude: f32) -> Self {
        Self { amplitude }
    }

    /// Rotation accumulates per call; height is recomputed from `elapsed_ms`
    /// so replaying the same timestamp lands on the same position.
    pub fn advance(&self, objects: &mut [DecorativeObject], elapsed_ms: f64) {
        for object in objects {
            let params = *object.params();
            object.transform.rotation += params.rotation_velocity;
            object.transform.position.y = float_height(&params, elapsed_ms, self.amplitude);
        }
    }
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// `baseline_y + sin(t * speed + phase) * amplitude`, evaluated in f64.
pub fn float_height(params: &AnimationParams, elapsed_ms: f64, amplitude: f32) -> f32 {
    let angle = elapsed_ms * params.float_speed as f64 + params.float_phase as f64;
    params.baseline_y + (angle.sin() * amplitude as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Archetype, GeometryFactory};
    use crate::population::Transform;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    fn object(params: AnimationParams) -> DecorativeObject {
        DecorativeObject::new(
            GeometryFactory::default().create_archetype(Archetype::Octahedron),
            Transform {
                position: Vec3::new(1.0, params.baseline_y, -4.0),
                rotation: Vec3::ZERO,
                scale: 1.0,
            },
            params,
        )
    }

    fn params() -> AnimationParams {
        AnimationParams {
            rotation_velocity: Vec3::new(0.001, -0.002, 0.003),
            float_speed: 0.002,
            float_phase: FRAC_PI_2,
            baseline_y: 2.0,
        }
    }

    #[test]
    fn float_height_is_pure() {
        let p = params();
        assert_eq!(float_height(&p, 1234.5, 0.5), float_height(&p, 1234.5, 0.5));
        assert!((float_height(&p, 0.0, 0.5) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn height_does_not_depend_on_frame_history() {
        let driver = AnimationDriver::default();
        let mut stepped = vec![object(params())];
        for frame in 0..120 {
            driver.advance(&mut stepped, frame as f64 * 16.0);
        }
        let mut jumped = vec![object(params())];
        driver.advance(&mut jumped, 119.0 * 16.0);
        assert_eq!(
            stepped[0].transform.position.y,
            jumped[0].transform.position.y
        );
    }

    #[test]
    fn rotation_accumulates_per_frame() {
        let driver = AnimationDriver::default();
        let mut objects = vec![object(params())];
        for _ in 0..10 {
            driver.advance(&mut objects, 0.0);
        }
        let rotation = objects[0].transform.rotation;
        assert!((rotation - Vec3::new(0.01, -0.02, 0.03)).length() < 1e-6);
    }

    #[test]
    fn only_rotation_and_height_change() {
        let driver = AnimationDriver::default();
        let mut objects = vec![object(params())];
        let before = objects[0].clone();
        driver.advance(&mut objects, 500.0);
        let after = &objects[0];
        assert_eq!(after.params(), before.params());
        assert_eq!(after.transform.position.x, before.transform.position.x);
        assert_eq!(after.transform.position.z, before.transform.position.z);
        assert_eq!(after.transform.scale, before.transform.scale);
        let offset = after.transform.position.y - after.params().baseline_y;
        assert!(offset.abs() <= 0.5 + 1e-6);
    }
}
