use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::bootstrap::{Host, ResizeSink, SceneBootstrapper};
use crate::error::{BackdropError, Result};
use crate::geometry::Archetype;
use crate::input::InputState;
use crate::population::Transform;
use crate::render::RecordingBackend;
use crate::scheduler::FixedStepScheduler;
use crate::viewport::{Viewport, ViewportProvider};

struct Routes {
    input: Arc<InputState>,
    resize: Rc<dyn ResizeSink>,
}

/// Host without a display. Events are injected with the `dispatch_*` calls.
pub struct HeadlessHost {
    container: bool,
    viewport: Rc<Cell<Viewport>>,
    routes: Rc<RefCell<Option<Routes>>>,
    surfaces: usize,
    /// Delivered as soon as listeners attach.
    pending_pointer: Option<Vec2>,
}

impl HeadlessHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            container: true,
            viewport: Rc::new(Cell::new(viewport)),
            routes: Rc::new(RefCell::new(None)),
            surfaces: 0,
            pending_pointer: None,
        }
    }

    pub fn without_container(viewport: Viewport) -> Self {
        Self {
            container: false,
            ..Self::new(viewport)
        }
    }

    pub fn surfaces_created(&self) -> usize {
        self.surfaces
    }

    pub fn listener_count(&self) -> usize {
        usize::from(self.routes.borrow().is_some())
    }

    /// Delivers a pointer move in viewport pixels. `false` if nobody listens.
    pub fn dispatch_pointer(&self, client: Vec2) -> bool {
        let routes = self.routes.borrow();
        let Some(routes) = routes.as_ref() else {
            return false;
        };
        let viewport = self.viewport.get();
        routes.input.set_pointer_from_client(
            client,
            Vec2::new(viewport.width as f32, viewport.height as f32),
        );
        true
    }

    pub fn dispatch_resize(&self, viewport: Viewport) -> bool {
        self.viewport.set(viewport);
        let resize = match self.routes.borrow().as_ref() {
            Some(routes) => Rc::clone(&routes.resize),
            None => return false,
        };
        resize.resized(viewport);
        true
    }
}

impl ViewportProvider for HeadlessHost {
    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }
}

/// Clears the headless routes when dropped.
pub struct HeadlessListeners {
    routes: Rc<RefCell<Option<Routes>>>,
}

impl Drop for HeadlessListeners {
    fn drop(&mut self) {
        self.routes.borrow_mut().take();
    }
}

impl Host for HeadlessHost {
    type Backend = RecordingBackend;
    type Listeners = HeadlessListeners;

    fn container_present(&self) -> bool {
        self.container
    }

    fn create_surface(&mut self, viewport: Viewport) -> Result<RecordingBackend> {
        self.surfaces += 1;
        Ok(RecordingBackend::new(viewport))
    }

    fn attach_listeners(
        &mut self,
        input: Arc<InputState>,
        resize: Rc<dyn ResizeSink>,
    ) -> Result<HeadlessListeners> {
        *self.routes.borrow_mut() = Some(Routes { input, resize });
        if let Some(client) = self.pending_pointer.take() {
            self.dispatch_pointer(client);
        }
        Ok(HeadlessListeners {
            routes: Rc::clone(&self.routes),
        })
    }
}

/// Final state of an offscreen run.
#[derive(Debug, Clone)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub draws_per_frame: usize,
    pub camera_position: Vec3,
    pub objects: Vec<(Archetype, Transform)>,
}

impl HeadlessSummary {
    pub fn count(&self, archetype: Archetype) -> usize {
        self.objects
            .iter()
            .filter(|(kind, _)| *kind == archetype)
            .count()
    }
}

/// Runs `frames` frames at `step_ms` against a recording surface, optionally
/// moving the pointer to `pointer` (viewport pixels) before the loop starts.
pub fn run_headless<R: Rng + ?Sized>(
    bootstrapper: &SceneBootstrapper,
    viewport: Viewport,
    frames: u64,
    step_ms: f64,
    pointer: Option<Vec2>,
    rng: &mut R,
) -> Result<HeadlessSummary> {
    let mut host = HeadlessHost::new(viewport);
    host.pending_pointer = pointer;
    let mut scheduler = FixedStepScheduler::new(frames, step_ms);
    let handle = bootstrapper
        .bootstrap(&mut host, &mut scheduler, rng)?
        .ok_or_else(|| BackdropError::Host("headless host has no container".to_string()))?;

    let runtime = handle.runtime();
    let backend = runtime.backend();
    Ok(HeadlessSummary {
        frames: backend.frames_rendered(),
        draws_per_frame: backend.last_frame().map_or(0, |frame| frame.draws.len()),
        camera_position: runtime.scene().camera().position,
        objects: runtime
            .scene()
            .objects()
            .iter()
            .map(|object| (object.archetype(), object.transform))
            .collect(),
    })
}
