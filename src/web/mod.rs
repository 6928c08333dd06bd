//! Browser host: mounts the backdrop into the page's `#hero` element.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::{error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Window};

use crate::bootstrap::{Host, ResizeSink, SceneBootstrapper, SceneHandle};
use crate::config::BackdropConfig;
use crate::error::{BackdropError, Result};
use crate::input::wasm::{window_viewport, DomListeners};
use crate::input::InputState;
use crate::render::wasm::CanvasRenderer;
use crate::scheduler::{CancellationToken, FrameCallback, FrameScheduler};
use crate::viewport::{Viewport, ViewportProvider};

const CONTAINER_ID: &str = "hero";

thread_local! {
    static BOOTSTRAPPER: SceneBootstrapper = SceneBootstrapper::default();
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // The embedding page installed its own logger first; keep it.
        log::debug!("logger already installed; console_log skipped");
    }
}

/// Starts the backdrop with the default configuration.
///
/// Returns `undefined` when the page has no `#hero` element or the backdrop
/// could not start; failures are only logged.
#[wasm_bindgen]
pub fn start_backdrop() -> Option<BackdropHandle> {
    BOOTSTRAPPER.with(|bootstrapper| mount(bootstrapper))
}

/// Starts the backdrop with a JSON configuration. Invalid JSON is logged and
/// nothing is mounted.
#[wasm_bindgen]
pub fn start_backdrop_with_config(json: &str) -> Option<BackdropHandle> {
    let config = match BackdropConfig::from_json(json) {
        Ok(config) => config,
        Err(err) => {
            error!("backdrop not started: {err}");
            return None;
        }
    };
    BOOTSTRAPPER.with(|bootstrapper| mount(&bootstrapper.with_config(config)))
}

fn mount(bootstrapper: &SceneBootstrapper) -> Option<BackdropHandle> {
    let started = DomHost::from_global().and_then(|mut host| {
        let mut scheduler = AnimationFrameScheduler::new(host.window.clone());
        bootstrapper.bootstrap(&mut host, &mut scheduler, &mut rand::thread_rng())
    });
    match started {
        Ok(Some(handle)) => Some(BackdropHandle {
            inner: Some(handle),
        }),
        Ok(None) => None,
        Err(BackdropError::AlreadyRunning) => {
            warn!("backdrop already running; ignoring start request");
            None
        }
        Err(err) => {
            error!("backdrop not started: {err}");
            None
        }
    }
}

/// Disposer returned to the page.
#[wasm_bindgen]
pub struct BackdropHandle {
    inner: Option<SceneHandle<CanvasRenderer>>,
}

#[wasm_bindgen]
impl BackdropHandle {
    /// Stops the animation, removes listeners and the canvas. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.dispose();
        }
    }

    #[wasm_bindgen(getter)]
    pub fn active(&self) -> bool {
        self.inner.as_ref().is_some_and(SceneHandle::is_active)
    }

    #[wasm_bindgen(getter)]
    pub fn frames(&self) -> f64 {
        self.inner
            .as_ref()
            .map_or(0.0, |handle| handle.runtime().frames() as f64)
    }
}

/// The current page, with `#hero` as the container.
pub struct DomHost {
    window: Window,
    document: Document,
    hero: Option<Element>,
}

impl DomHost {
    pub fn from_global() -> Result<Self> {
        let window =
            web_sys::window().ok_or_else(|| BackdropError::Host("window not available".into()))?;
        let document = window
            .document()
            .ok_or_else(|| BackdropError::Host("document not available".into()))?;
        let hero = document.get_element_by_id(CONTAINER_ID);
        Ok(Self {
            window,
            document,
            hero,
        })
    }
}

impl ViewportProvider for DomHost {
    fn viewport(&self) -> Viewport {
        window_viewport(&self.window)
    }
}

impl Host for DomHost {
    type Backend = CanvasRenderer;
    type Listeners = DomListeners;

    fn container_present(&self) -> bool {
        self.hero.is_some()
    }

    fn create_surface(&mut self, viewport: Viewport) -> Result<CanvasRenderer> {
        let hero = self
            .hero
            .as_ref()
            .ok_or_else(|| BackdropError::Host(format!("#{CONTAINER_ID} disappeared")))?;
        CanvasRenderer::mount(&self.document, hero, viewport)
    }

    fn attach_listeners(
        &mut self,
        input: Arc<InputState>,
        resize: Rc<dyn ResizeSink>,
    ) -> Result<DomListeners> {
        Ok(DomListeners::attach(
            &self.window,
            &self.document,
            input,
            resize,
        ))
    }
}

type FrameClosure = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` loop that stops rescheduling once cancelled.
pub struct AnimationFrameScheduler {
    window: Window,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn start(&mut self, mut callback: FrameCallback, token: CancellationToken) -> Result<()> {
        let slot: Rc<RefCell<Option<FrameClosure>>> = Rc::new(RefCell::new(None));
        let pending = Rc::clone(&slot);
        let window = self.window.clone();

        *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            if token.is_cancelled() {
                // Breaks the closure's reference cycle.
                pending.borrow_mut().take();
                info!("animation loop stopped");
                return;
            }
            callback(timestamp);
            if let Some(closure) = pending.borrow().as_ref() {
                if let Err(err) = window.request_animation_frame(closure.as_ref().unchecked_ref())
                {
                    error!("requestAnimationFrame failed: {err:?}");
                }
            }
        }) as Box<dyn FnMut(f64)>));

        let requested = match slot.borrow().as_ref() {
            Some(closure) => self
                .window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .map(|_| ())
                .map_err(|err| format!("requestAnimationFrame failed: {err:?}")),
            None => Err("frame closure missing".to_string()),
        };
        if let Err(message) = requested {
            slot.borrow_mut().take();
            return Err(BackdropError::Scheduler(message));
        }
        Ok(())
    }
}
