use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};
use rand::Rng;

use crate::config::{PopulationConfig, MAX_INITIAL_ROTATION, POPULATION_SIZE};
use crate::geometry::{Archetype, Geometry, GeometryFactory};

/// Placement of a shape in world space. Rotation is XYZ Euler in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Transform {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            glam::EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rotation, self.position)
    }
}

/// Motion parameters drawn once at creation and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParams {
    /// Radians added to each rotation axis per frame.
    pub rotation_velocity: Vec3,
    /// Radians of float phase per elapsed millisecond.
    pub float_speed: f32,
    pub float_phase: f32,
    pub baseline_y: f32,
}

/// One floating shape of the backdrop.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorativeObject {
    pub geometry: Geometry,
    pub transform: Transform,
    params: AnimationParams,
}

impl DecorativeObject {
    pub fn new(geometry: Geometry, transform: Transform, params: AnimationParams) -> Self {
        Self {
            geometry,
            transform,
            params,
        }
    }

    pub fn archetype(&self) -> Archetype {
        self.geometry.archetype
    }

    pub fn params(&self) -> &AnimationParams {
        &self.params
    }
}

/// Scatters the fixed population of shapes in front of the camera.
#[derive(Debug, Clone)]
pub struct ObjectPopulator {
    config: PopulationConfig,
    factory: GeometryFactory,
}

impl ObjectPopulator {
    pub fn new(config: PopulationConfig, factory: GeometryFactory) -> Self {
        Self { config, factory }
    }

    pub fn populate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<DecorativeObject> {
        (0..POPULATION_SIZE).map(|_| self.spawn(rng)).collect()
    }

    fn spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> DecorativeObject {
        let c = &self.config;
        let geometry = self.factory.create(rng);

        let position = Vec3::new(
            rng.gen_range(-c.half_extent_x..c.half_extent_x),
            rng.gen_range(-c.half_extent_y..c.half_extent_y),
            rng.gen_range(
                c.depth_center - c.depth_half_extent..c.depth_center + c.depth_half_extent,
            ),
        );
        let rotation = Vec3::new(
            rng.gen_range(0.0..MAX_INITIAL_ROTATION),
            rng.gen_range(0.0..MAX_INITIAL_ROTATION),
            rng.gen_range(0.0..MAX_INITIAL_ROTATION),
        );
        let scale = rng.gen_range(c.scale.0..c.scale.1);

        let limit = c.rotation_speed_limit;
        let params = AnimationParams {
            rotation_velocity: Vec3::new(
                rng.gen_range(-limit..limit),
                rng.gen_range(-limit..limit),
                rng.gen_range(-limit..limit),
            ),
            float_speed: rng.gen_range(c.float_speed.0..c.float_speed.1),
            float_phase: rng.gen_range(0.0..TAU),
            baseline_y: position.y,
        };

        DecorativeObject::new(
            geometry,
            Transform {
                position,
                rotation,
                scale,
            },
            params,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaterialConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    fn populator() -> ObjectPopulator {
        ObjectPopulator::new(
            PopulationConfig::default(),
            GeometryFactory::new(&MaterialConfig::default()),
        )
    }

    #[test]
    fn creates_fifteen_objects() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(populator().populate(&mut rng).len(), 15);
    }

    #[test]
    fn sampled_values_stay_in_range() {
        let populator = populator();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            for object in populator.populate(&mut rng) {
                let t = object.transform;
                let p = object.params();
                assert!((-10.0..=10.0).contains(&t.position.x));
                assert!((-10.0..=10.0).contains(&t.position.y));
                assert!((-10.0..=0.0).contains(&t.position.z));
                assert!((0.5..=1.0).contains(&t.scale));
                for axis in t.rotation.to_array() {
                    assert!((0.0..=PI).contains(&axis));
                }
                for axis in p.rotation_velocity.to_array() {
                    assert!((-0.005..=0.005).contains(&axis));
                }
                assert!((0.001..=0.003).contains(&p.float_speed));
                assert!((0.0..=TAU).contains(&p.float_phase));
                assert_eq!(p.baseline_y, t.position.y);
            }
        }
    }

    #[test]
    fn population_archetypes_are_balanced() {
        let populator = populator();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts = [0usize; 3];
        let rounds = 400;
        for _ in 0..rounds {
            for object in populator.populate(&mut rng) {
                let index = match object.archetype() {
                    Archetype::Icosahedron => 0,
                    Archetype::Octahedron => 1,
                    Archetype::TorusKnot => 2,
                };
                counts[index] += 1;
            }
        }
        let total = (rounds * POPULATION_SIZE) as f64;
        for count in counts {
            assert!((count as f64 / total - 1.0 / 3.0).abs() < 0.03);
        }
    }

    #[test]
    fn same_seed_gives_same_scene() {
        let populator = populator();
        let a = populator.populate(&mut StdRng::seed_from_u64(5));
        let b = populator.populate(&mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn model_matrix_applies_scale_then_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::ZERO,
            scale: 0.5,
        };
        let point = transform.model_matrix().transform_point3(Vec3::X);
        assert!((point - Vec3::new(1.5, 2.0, 3.0)).length() < 1e-6);
    }
}
