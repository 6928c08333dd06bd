use log::debug;

use crate::camera::Camera;
use crate::error::Result;
use crate::render::RenderBackend;

/// Host viewport in CSS pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub const fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// `width / height`, or 1.0 while the viewport has no height.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Backing store size in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let ratio = if self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        };
        (
            (self.width as f64 * ratio).round() as u32,
            (self.height as f64 * ratio).round() as u32,
        )
    }
}

/// Reports the host's current viewport.
pub trait ViewportProvider {
    fn viewport(&self) -> Viewport;
}

/// Keeps camera projection and render surface matched to the viewport.
#[derive(Debug, Clone, Copy)]
pub struct ViewportManager {
    current: Viewport,
}

impl ViewportManager {
    pub fn new(initial: Viewport) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> Viewport {
        self.current
    }

    /// Applies a resize immediately; there is no debouncing.
    pub fn resize<B>(&mut self, viewport: Viewport, camera: &mut Camera, backend: &mut B) -> Result<()>
    where
        B: RenderBackend + ?Sized,
    {
        debug!(
            "viewport resized to {}x{} @{}x",
            viewport.width, viewport.height, viewport.pixel_ratio
        );
        self.current = viewport;
        camera.set_aspect(viewport.aspect());
        backend.resize(&viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::render::RecordingBackend;

    #[test]
    fn resize_updates_aspect_and_surface() {
        let initial = Viewport::new(1280, 720, 1.0);
        let mut manager = ViewportManager::new(initial);
        let mut camera = Camera::new(&CameraConfig::default(), initial.aspect());
        let mut backend = RecordingBackend::new(initial);

        let resized = Viewport::new(800, 1000, 2.0);
        manager.resize(resized, &mut camera, &mut backend).unwrap();

        assert_eq!(camera.aspect(), 800.0 / 1000.0);
        assert_eq!(backend.surface(), resized);
        assert_eq!(backend.surface().physical_size(), (1600, 2000));
        assert_eq!(manager.current(), resized);
    }

    #[test]
    fn zero_height_keeps_unit_aspect() {
        assert_eq!(Viewport::new(640, 0, 1.0).aspect(), 1.0);
    }

    #[test]
    fn fractional_pixel_ratio_rounds() {
        assert_eq!(Viewport::new(101, 51, 1.5).physical_size(), (152, 77));
    }
}
