use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;
use gloo_events::EventListener;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, MouseEvent, Window};

use super::InputState;
use crate::bootstrap::ResizeSink;
use crate::viewport::Viewport;

/// Document pointer and window resize listeners.
///
/// Dropping the handler removes every listener.
pub struct DomListeners {
    _listeners: Vec<EventListener>,
}

impl DomListeners {
    pub fn attach(
        window: &Window,
        document: &Document,
        input: Arc<InputState>,
        resize: Rc<dyn ResizeSink>,
    ) -> Self {
        let mut listeners = Vec::with_capacity(2);

        {
            let window = window.clone();
            listeners.push(EventListener::new(document, "mousemove", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                input.set_pointer_from_client(
                    Vec2::new(event.client_x() as f32, event.client_y() as f32),
                    inner_size(&window),
                );
            }));
        }

        {
            let target = window.clone();
            listeners.push(EventListener::new(window, "resize", move |_| {
                resize.resized(window_viewport(&target));
            }));
        }

        Self {
            _listeners: listeners,
        }
    }
}

/// Inner window size in CSS pixels with the current device pixel ratio.
pub fn window_viewport(window: &Window) -> Viewport {
    let size = inner_size(window);
    Viewport::new(size.x as u32, size.y as u32, window.device_pixel_ratio())
}

fn inner_size(window: &Window) -> Vec2 {
    let read = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|value| value.as_f64()).unwrap_or(0.0) as f32
    };
    Vec2::new(read(window.inner_width()), read(window.inner_height()))
}
