use glam::{Mat4, Vec3};

use super::{FrameGlobals, RenderBackend};
use crate::error::{BackdropError, Result};
use crate::geometry::{Archetype, Geometry};
use crate::population::Transform;
use crate::viewport::Viewport;

/// A draw call captured by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub archetype: Archetype,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub draws: Vec<RecordedDraw>,
}

/// Headless backend that keeps the last completed frame for inspection.
#[derive(Debug)]
pub struct RecordingBackend {
    surface: Viewport,
    pending: Option<RecordedFrame>,
    last_frame: Option<RecordedFrame>,
    frames: u64,
    resizes: usize,
    released: bool,
}

impl RecordingBackend {
    pub fn new(surface: Viewport) -> Self {
        Self {
            surface,
            pending: None,
            last_frame: None,
            frames: 0,
            resizes: 0,
            released: false,
        }
    }

    pub fn surface(&self) -> Viewport {
        self.surface
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.last_frame.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl RenderBackend for RecordingBackend {
    fn begin_frame(&mut self, globals: &FrameGlobals) -> Result<()> {
        if self.pending.is_some() {
            return Err(BackdropError::Render(
                "begin_frame called twice without end_frame".to_string(),
            ));
        }
        self.pending = Some(RecordedFrame {
            view_proj: globals.view_proj,
            camera_position: globals.camera_position,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn submit(&mut self, transform: &Transform, geometry: &Geometry) -> Result<()> {
        let frame = self
            .pending
            .as_mut()
            .ok_or_else(|| BackdropError::Render("submit outside of a frame".to_string()))?;
        frame.draws.push(RecordedDraw {
            archetype: geometry.archetype,
            transform: *transform,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let frame = self
            .pending
            .take()
            .ok_or_else(|| BackdropError::Render("end_frame without begin_frame".to_string()))?;
        self.last_frame = Some(frame);
        self.frames += 1;
        Ok(())
    }

    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        self.surface = *viewport;
        self.resizes += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
