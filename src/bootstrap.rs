use std::any::Any;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;

use crate::config::BackdropConfig;
use crate::error::{BackdropError, Result};
use crate::input::InputState;
use crate::render::RenderBackend;
use crate::scene::Scene;
use crate::scheduler::{CancellationToken, FrameScheduler};
use crate::viewport::{Viewport, ViewportManager, ViewportProvider};

/// Receives viewport changes from host listeners, synchronously.
pub trait ResizeSink {
    fn resized(&self, viewport: Viewport);
}

/// Environment the backdrop is mounted into.
pub trait Host: ViewportProvider {
    type Backend: RenderBackend + 'static;
    /// Dropping this value detaches every listener it registered.
    type Listeners: 'static;

    /// Whether the region that hosts the backdrop exists.
    fn container_present(&self) -> bool;

    fn create_surface(&mut self, viewport: Viewport) -> Result<Self::Backend>;

    fn attach_listeners(
        &mut self,
        input: Arc<InputState>,
        resize: Rc<dyn ResizeSink>,
    ) -> Result<Self::Listeners>;
}

/// Scene, renderer and viewport state driven by the frame loop.
pub struct SceneRuntime<B> {
    scene: Scene,
    backend: B,
    input: Arc<InputState>,
    viewport: ViewportManager,
    frames: u64,
}

impl<B: RenderBackend> SceneRuntime<B> {
    pub fn new(scene: Scene, backend: B, input: Arc<InputState>, viewport: Viewport) -> Self {
        Self {
            scene,
            backend,
            input,
            viewport: ViewportManager::new(viewport),
            frames: 0,
        }
    }

    /// Animation, camera, then one frame submission.
    pub fn frame(&mut self, elapsed_ms: f64) {
        let pointer = self.input.pointer();
        self.scene.advance(pointer, elapsed_ms);
        match self.scene.draw(&mut self.backend) {
            Ok(()) => self.frames += 1,
            Err(err) => warn!("frame {} dropped: {err}", self.frames),
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        let camera = self.scene.camera_mut();
        if let Err(err) = self.viewport.resize(viewport, camera, &mut self.backend) {
            warn!("failed to resize render surface: {err}");
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.current()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn release(&mut self) {
        self.backend.release();
    }
}

impl<B: RenderBackend> ResizeSink for RefCell<SceneRuntime<B>> {
    fn resized(&self, viewport: Viewport) {
        match self.try_borrow_mut() {
            Ok(mut runtime) => runtime.resize(viewport),
            Err(_) => warn!("resize delivered while a frame was in progress; ignored"),
        }
    }
}

/// Clears the running flag when the scene goes away.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Mounts at most one running backdrop at a time.
pub struct SceneBootstrapper {
    config: BackdropConfig,
    running: Arc<AtomicBool>,
}

impl SceneBootstrapper {
    pub fn new(config: BackdropConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A bootstrapper with another configuration that shares this one's
    /// running flag, so only one of them can have a live scene.
    pub fn with_config(&self, config: BackdropConfig) -> Self {
        Self {
            config,
            running: Arc::clone(&self.running),
        }
    }

    pub fn config(&self) -> &BackdropConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the backdrop on `host`.
    ///
    /// Returns `Ok(None)` without touching the host when its container is
    /// missing, and [`BackdropError::AlreadyRunning`] while an earlier handle
    /// from this bootstrapper is still alive.
    pub fn bootstrap<H, S, R>(
        &self,
        host: &mut H,
        scheduler: &mut S,
        rng: &mut R,
    ) -> Result<Option<SceneHandle<H::Backend>>>
    where
        H: Host,
        S: FrameScheduler + ?Sized,
        R: Rng + ?Sized,
    {
        if !host.container_present() {
            debug!("backdrop container absent; skipping scene setup");
            return Ok(None);
        }
        self.config.validate()?;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BackdropError::AlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let viewport = host.viewport();
        let backend = host.create_surface(viewport)?;
        let scene = Scene::generate(&self.config, viewport.aspect(), rng);
        let input = Arc::new(InputState::new());
        let runtime = Rc::new(RefCell::new(SceneRuntime::new(
            scene,
            backend,
            Arc::clone(&input),
            viewport,
        )));

        let resize_sink: Rc<dyn ResizeSink> = runtime.clone();
        let listeners = match host.attach_listeners(input, resize_sink) {
            Ok(listeners) => listeners,
            Err(err) => {
                runtime.borrow_mut().release();
                return Err(err);
            }
        };

        let token = CancellationToken::new();
        let frame_runtime = Rc::clone(&runtime);
        let started = scheduler.start(
            Box::new(move |elapsed_ms| match frame_runtime.try_borrow_mut() {
                Ok(mut runtime) => runtime.frame(elapsed_ms),
                Err(_) => warn!("frame re-entered while the previous one was running"),
            }),
            token.clone(),
        );
        if let Err(err) = started {
            drop(listeners);
            runtime.borrow_mut().release();
            return Err(err);
        }

        info!(
            "backdrop running: {} objects on a {}x{} surface",
            runtime.borrow().scene().objects().len(),
            viewport.width,
            viewport.height
        );

        Ok(Some(SceneHandle {
            runtime,
            token,
            listeners: Some(Box::new(listeners)),
            _guard: guard,
        }))
    }
}

impl Default for SceneBootstrapper {
    fn default() -> Self {
        Self::new(BackdropConfig::default())
    }
}

/// Owns a running backdrop. Disposing or dropping it stops the frame loop,
/// detaches listeners and releases the surface.
pub struct SceneHandle<B: RenderBackend + 'static> {
    runtime: Rc<RefCell<SceneRuntime<B>>>,
    token: CancellationToken,
    listeners: Option<Box<dyn Any>>,
    _guard: RunningGuard,
}

impl<B: RenderBackend + 'static> SceneHandle<B> {
    pub fn runtime(&self) -> Ref<'_, SceneRuntime<B>> {
        self.runtime.borrow()
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn dispose(self) {}
}

impl<B: RenderBackend + 'static> Drop for SceneHandle<B> {
    fn drop(&mut self) {
        self.token.cancel();
        self.listeners.take();
        match self.runtime.try_borrow_mut() {
            Ok(mut runtime) => runtime.release(),
            Err(_) => warn!("render surface busy during disposal; leaving it attached"),
        }
        info!("backdrop disposed");
    }
}
