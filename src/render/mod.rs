use glam::{Mat4, Vec2, Vec3};

use crate::error::Result;
use crate::geometry::{Geometry, Mesh};
use crate::population::Transform;
use crate::viewport::Viewport;

mod recording;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(not(target_arch = "wasm32"))]
mod shared;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use recording::{RecordedDraw, RecordedFrame, RecordingBackend};

/// Per-frame camera state handed to the backend before any submission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameGlobals {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
}

/// Minimal capability set a renderer must offer to draw the backdrop.
///
/// A frame is `begin_frame`, any number of `submit` calls, then `end_frame`.
/// `resize` may arrive between frames.
pub trait RenderBackend {
    fn begin_frame(&mut self, globals: &FrameGlobals) -> Result<()>;

    fn submit(&mut self, transform: &Transform, geometry: &Geometry) -> Result<()>;

    fn end_frame(&mut self) -> Result<()>;

    /// Matches the surface to `viewport`, including its pixel ratio.
    fn resize(&mut self, viewport: &Viewport) -> Result<()>;

    /// Detaches the surface from its host. Called once on disposal.
    fn release(&mut self) {}
}

/// Projects the wireframe of `mesh` into pixel space of a `size` surface.
///
/// Edges with an endpoint at or behind the camera plane are skipped.
pub fn project_edges(mvp: Mat4, mesh: &Mesh, size: Vec2) -> Vec<(Vec2, Vec2)> {
    let screen: Vec<Option<Vec2>> = mesh
        .positions
        .iter()
        .map(|position| {
            let clip = mvp * position.extend(1.0);
            if clip.w <= f32::EPSILON {
                return None;
            }
            let ndc = clip.truncate() / clip.w;
            Some(Vec2::new(
                (ndc.x * 0.5 + 0.5) * size.x,
                (0.5 - ndc.y * 0.5) * size.y,
            ))
        })
        .collect();

    mesh.edges
        .iter()
        .filter_map(|[a, b]| {
            let a = screen.get(*a as usize).copied().flatten()?;
            let b = screen.get(*b as usize).copied().flatten()?;
            Some((a, b))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> Mesh {
        Mesh {
            positions: vec![Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0)],
            indices: Vec::new(),
            edges: vec![[0, 1]],
        }
    }

    #[test]
    fn identity_maps_ndc_corners_to_pixels() {
        let edges = project_edges(Mat4::IDENTITY, &segment(), Vec2::new(200.0, 100.0));
        assert_eq!(edges, vec![(Vec2::new(0.0, 0.0), Vec2::new(200.0, 100.0))]);
    }

    #[test]
    fn edges_behind_the_camera_are_dropped() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -2.0), Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let edges = project_edges(proj * view, &segment(), Vec2::splat(100.0));
        assert!(edges.is_empty());
    }
}
