use glam::Vec2;
use rand::Rng;

use crate::animation::AnimationDriver;
use crate::camera::{Camera, CameraController};
use crate::config::BackdropConfig;
use crate::error::Result;
use crate::geometry::GeometryFactory;
use crate::population::{DecorativeObject, ObjectPopulator};
use crate::render::{FrameGlobals, RenderBackend};

/// The decorative objects and the camera looking at them.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<DecorativeObject>,
    camera: Camera,
    driver: AnimationDriver,
    controller: CameraController,
}

impl Scene {
    pub fn new(
        objects: Vec<DecorativeObject>,
        camera: Camera,
        driver: AnimationDriver,
        controller: CameraController,
    ) -> Self {
        Self {
            objects,
            camera,
            driver,
            controller,
        }
    }

    /// Builds a freshly populated scene for a viewport of the given aspect.
    pub fn generate<R: Rng + ?Sized>(config: &BackdropConfig, aspect: f32, rng: &mut R) -> Self {
        let factory = GeometryFactory::new(&config.material);
        let populator = ObjectPopulator::new(config.population.clone(), factory);
        Self::new(
            populator.populate(rng),
            Camera::new(&config.camera, aspect),
            AnimationDriver::new(config.animation.float_amplitude),
            CameraController::new(&config.camera),
        )
    }

    pub fn objects(&self) -> &[DecorativeObject] {
        &self.objects
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// One tick of motion: shapes first, then the parallax camera.
    pub fn advance(&mut self, pointer: Vec2, elapsed_ms: f64) {
        self.driver.advance(&mut self.objects, elapsed_ms);
        self.controller.update(&mut self.camera, pointer);
    }

    pub fn draw<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        backend.begin_frame(&FrameGlobals {
            view_proj: self.camera.view_proj(),
            camera_position: self.camera.position,
        })?;
        for object in &self.objects {
            backend.submit(&object.transform, &object.geometry)?;
        }
        backend.end_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingBackend;
    use crate::viewport::Viewport;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene() -> Scene {
        Scene::generate(
            &BackdropConfig::default(),
            16.0 / 9.0,
            &mut StdRng::seed_from_u64(3),
        )
    }

    #[test]
    fn draw_submits_every_object_once() {
        let scene = scene();
        let mut backend = RecordingBackend::new(Viewport::new(1600, 900, 1.0));
        scene.draw(&mut backend).unwrap();
        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.draws.len(), 15);
        for (draw, object) in frame.draws.iter().zip(scene.objects()) {
            assert_eq!(draw.archetype, object.archetype());
            assert_eq!(draw.transform, object.transform);
        }
        assert_eq!(frame.view_proj, scene.camera().view_proj());
    }

    #[test]
    fn advance_moves_camera_and_shapes() {
        let mut scene = scene();
        let before = scene.objects()[0].transform;
        scene.advance(glam::Vec2::new(1.0, 1.0), 100.0);
        let after = scene.objects()[0].transform;
        assert_ne!(before.rotation, after.rotation);
        assert!(scene.camera().position.x > 0.0);
        assert!(scene.camera().position.y < 0.0);
    }
}
