use glam::{Mat4, Vec2};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement};

use super::{project_edges, FrameGlobals, RenderBackend};
use crate::error::{BackdropError, Result};
use crate::geometry::Geometry;
use crate::population::Transform;
use crate::viewport::Viewport;

const CONTAINER_ID: &str = "canvas-container";
const CONTAINER_CLASSES: &str =
    "absolute inset-0 z-0 pointer-events-none opacity-60 mix-blend-screen";

/// Wireframe renderer drawing into a 2D canvas over a transparent background.
pub struct CanvasRenderer {
    container: Element,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    viewport: Viewport,
    view_proj: Mat4,
    in_frame: bool,
}

impl CanvasRenderer {
    /// Inserts the overlay container as the first child of `host` and a canvas
    /// inside it.
    pub fn mount(document: &Document, host: &Element, viewport: Viewport) -> Result<Self> {
        let container = document
            .create_element("div")
            .map_err(|err| surface_error("failed to create container", err))?;
        container.set_id(CONTAINER_ID);
        container.set_class_name(CONTAINER_CLASSES);
        host.insert_before(&container, host.first_child().as_ref())
            .map_err(|err| surface_error("failed to insert container", err))?;

        match Self::attach_canvas(document, container.clone(), viewport) {
            Ok(renderer) => Ok(renderer),
            Err(err) => {
                container.remove();
                Err(err)
            }
        }
    }

    fn attach_canvas(document: &Document, container: Element, viewport: Viewport) -> Result<Self> {
        let canvas = document
            .create_element("canvas")
            .map_err(|err| surface_error("failed to create canvas", err))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| BackdropError::Surface("element is not a canvas".to_string()))?;
        container
            .append_child(&canvas)
            .map_err(|err| surface_error("failed to append canvas", err))?;

        let context = canvas
            .get_context("2d")
            .map_err(|err| surface_error("failed to query canvas context", err))?
            .ok_or_else(|| BackdropError::Surface("canvas does not support 2d".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| BackdropError::Surface("failed to cast canvas context".to_string()))?;

        let mut renderer = Self {
            container,
            canvas,
            context,
            viewport,
            view_proj: Mat4::IDENTITY,
            in_frame: false,
        };
        renderer.apply_size()?;
        Ok(renderer)
    }

    /// Backing store in device pixels, layout box in CSS pixels.
    fn apply_size(&mut self) -> Result<()> {
        let (width, height) = self.viewport.physical_size();
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let style = self.canvas.style();
        style
            .set_property("width", &format!("{}px", self.viewport.width))
            .and_then(|()| style.set_property("height", &format!("{}px", self.viewport.height)))
            .map_err(|err| surface_error("failed to size canvas", err))
    }

    fn surface_size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }
}

impl RenderBackend for CanvasRenderer {
    fn begin_frame(&mut self, globals: &FrameGlobals) -> Result<()> {
        if self.in_frame {
            return Err(BackdropError::Render("frame already open".to_string()));
        }
        self.view_proj = globals.view_proj;
        let size = self.surface_size();
        self.context
            .clear_rect(0.0, 0.0, size.x as f64, size.y as f64);
        self.in_frame = true;
        Ok(())
    }

    fn submit(&mut self, transform: &Transform, geometry: &Geometry) -> Result<()> {
        if !self.in_frame {
            return Err(BackdropError::Render("submit outside a frame".to_string()));
        }
        let mvp = self.view_proj * transform.model_matrix();
        let edges = project_edges(mvp, &geometry.mesh, self.surface_size());
        if edges.is_empty() {
            return Ok(());
        }

        let material = &geometry.material;
        let [r, g, b] = (material.color.clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * 255.0)
            .round()
            .to_array();
        self.context
            .set_stroke_style(&JsValue::from_str(&format!("rgb({r}, {g}, {b})")));
        self.context.set_global_alpha(material.opacity as f64);
        self.context.set_line_width(self.viewport.pixel_ratio.max(1.0));

        self.context.begin_path();
        for (from, to) in edges {
            self.context.move_to(from.x as f64, from.y as f64);
            self.context.line_to(to.x as f64, to.y as f64);
        }
        self.context.stroke();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if !self.in_frame {
            return Err(BackdropError::Render("no frame to end".to_string()));
        }
        self.context.set_global_alpha(1.0);
        self.in_frame = false;
        Ok(())
    }

    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        self.viewport = *viewport;
        self.apply_size()
    }

    fn release(&mut self) {
        self.in_frame = false;
        self.container.remove();
    }
}

fn surface_error(context: &str, err: JsValue) -> BackdropError {
    BackdropError::Surface(format!("{context}: {err:?}"))
}
