use glam::Vec2;
use parking_lot::RwLock;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Pointer position shared between event listeners and the frame loop.
///
/// Stored normalized to `[-1, 1]` on both axes, `(0, 0)` at the viewport
/// center and y growing downward. Readers see the last delivered value.
#[derive(Debug, Default)]
pub struct InputState {
    pointer: RwLock<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer(&self) -> Vec2 {
        *self.pointer.read()
    }

    pub fn set_pointer(&self, normalized: Vec2) {
        *self.pointer.write() = normalized;
    }

    /// Records a pointer event given in the same pixel space as `viewport`.
    pub fn set_pointer_from_client(&self, client: Vec2, viewport: Vec2) {
        if let Some(normalized) = normalize_pointer(client, viewport) {
            self.set_pointer(normalized);
        }
    }
}

/// Returns `None` for a degenerate viewport.
pub fn normalize_pointer(client: Vec2, viewport: Vec2) -> Option<Vec2> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }
    Some((client / viewport - Vec2::splat(0.5)) * 2.0)
}
