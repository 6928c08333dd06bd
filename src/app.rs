//! Native window host: a winit event loop driving the wgpu renderer.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::bootstrap::{Host, ResizeSink, SceneBootstrapper, SceneHandle};
use crate::config::BackdropConfig;
use crate::error::{BackdropError, Result};
use crate::input::InputState;
use crate::render::native::WgpuRenderer;
use crate::scheduler::ManualScheduler;
use crate::viewport::{Viewport, ViewportProvider};

const INITIAL_WIDTH: f64 = 1280.0;
const INITIAL_HEIGHT: f64 = 720.0;

/// The platform could not give us a window or an event loop.
#[derive(Debug, Error)]
#[error("failed to initialize {stage}: {message}")]
pub struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn new(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

struct Routes {
    input: Arc<InputState>,
    resize: Rc<dyn ResizeSink>,
}

/// A winit window treated as the backdrop container.
///
/// The window is the region, so the container is always present. Viewports
/// are reported in physical pixels with a pixel ratio of 1.
pub struct WinitHost {
    window: Arc<Window>,
    routes: Rc<RefCell<Option<Routes>>>,
}

impl WinitHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            routes: Rc::new(RefCell::new(None)),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn pointer_moved(&self, position: Vec2) {
        let size = self.window.inner_size();
        if let Some(routes) = self.routes.borrow().as_ref() {
            routes.input.set_pointer_from_client(
                position,
                Vec2::new(size.width as f32, size.height as f32),
            );
        }
    }

    fn resized(&self, size: PhysicalSize<u32>) {
        let resize = match self.routes.borrow().as_ref() {
            Some(routes) => Rc::clone(&routes.resize),
            None => return,
        };
        resize.resized(physical_viewport(size));
    }
}

fn physical_viewport(size: PhysicalSize<u32>) -> Viewport {
    Viewport::new(size.width, size.height, 1.0)
}

impl ViewportProvider for WinitHost {
    fn viewport(&self) -> Viewport {
        physical_viewport(self.window.inner_size())
    }
}

/// Detaches the window routes when dropped.
pub struct WinitListeners {
    routes: Rc<RefCell<Option<Routes>>>,
}

impl Drop for WinitListeners {
    fn drop(&mut self) {
        self.routes.borrow_mut().take();
    }
}

impl Host for WinitHost {
    type Backend = WgpuRenderer;
    type Listeners = WinitListeners;

    fn container_present(&self) -> bool {
        true
    }

    fn create_surface(&mut self, viewport: Viewport) -> Result<WgpuRenderer> {
        pollster::block_on(WgpuRenderer::new(Arc::clone(&self.window), viewport))
            .map_err(|err| BackdropError::Surface(format!("{err:#}")))
    }

    fn attach_listeners(
        &mut self,
        input: Arc<InputState>,
        resize: Rc<dyn ResizeSink>,
    ) -> Result<WinitListeners> {
        *self.routes.borrow_mut() = Some(Routes { input, resize });
        Ok(WinitListeners {
            routes: Rc::clone(&self.routes),
        })
    }
}

struct Mounted {
    host: WinitHost,
    scheduler: ManualScheduler,
    handle: SceneHandle<WgpuRenderer>,
    started: Instant,
}

/// winit application that mounts the backdrop into its first window.
pub struct BackdropApp {
    bootstrapper: SceneBootstrapper,
    seed: Option<u64>,
    mounted: Option<Mounted>,
    failure: Option<anyhow::Error>,
}

impl BackdropApp {
    pub fn new(config: BackdropConfig, seed: Option<u64>) -> Self {
        Self {
            bootstrapper: SceneBootstrapper::new(config),
            seed,
            mounted: None,
            failure: None,
        }
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title("Hero Backdrop")
                    .with_inner_size(LogicalSize::new(INITIAL_WIDTH, INITIAL_HEIGHT)),
            )
            .map_err(|err| WindowInitError::new("window", err))?;

        let mut host = WinitHost::new(Arc::new(window));
        let mut scheduler = ManualScheduler::new();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let handle = self
            .bootstrapper
            .bootstrap(&mut host, &mut scheduler, &mut rng)?
            .ok_or(BackdropError::Host("window has no drawable region".to_string()))?;

        self.mounted = Some(Mounted {
            host,
            scheduler,
            handle,
            started: Instant::now(),
        });
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            let frames = mounted.handle.runtime().frames();
            info!("closing after {frames} frames");
            mounted.handle.dispose();
        }
    }
}

impl ApplicationHandler for BackdropApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.mounted.is_some() {
            return;
        }
        if let Err(err) = self.mount(event_loop) {
            error!("failed to start backdrop: {err:#}");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        if window_id != mounted.host.window().id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                self.unmount();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => mounted.host.resized(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                debug!("scale factor changed to {scale_factor}");
            }
            WindowEvent::CursorMoved { position, .. } => mounted
                .host
                .pointer_moved(Vec2::new(position.x as f32, position.y as f32)),
            WindowEvent::RedrawRequested => {
                let elapsed_ms = mounted.started.elapsed().as_secs_f64() * 1000.0;
                if !mounted.scheduler.pump(elapsed_ms) {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mounted) = &self.mounted {
            mounted.host.window().request_redraw();
        }
    }
}

/// Opens a window and runs the backdrop until it is closed.
///
/// Fails with a [`WindowInitError`] when no window can be created, so callers
/// can fall back to headless mode.
pub fn run_windowed(config: BackdropConfig, seed: Option<u64>) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().map_err(|err| WindowInitError::new("event loop", err))?;
    let mut app = BackdropApp::new(config, seed);
    event_loop.run_app(&mut app)?;
    app.unmount();
    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
