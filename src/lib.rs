//! Procedural wireframe backdrop for landing-page hero sections.
//!
//! A handful of low-poly shapes drift and spin in front of a perspective
//! camera that leans toward the pointer. The scene logic is host agnostic:
//! the same [`SceneBootstrapper`] mounts it into a browser page, a native
//! winit window or a headless recording surface.

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod animation;
pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod input;
pub mod population;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::AnimationDriver;
pub use bootstrap::{Host, ResizeSink, SceneBootstrapper, SceneHandle, SceneRuntime};
pub use camera::{Camera, CameraController};
pub use config::{BackdropConfig, POPULATION_SIZE};
pub use error::{BackdropError, Result};
pub use geometry::{Archetype, Geometry, GeometryFactory, Material, Mesh};
pub use headless::{run_headless, HeadlessHost, HeadlessSummary};
pub use input::InputState;
pub use population::{DecorativeObject, ObjectPopulator, Transform};
pub use render::{FrameGlobals, RecordingBackend, RenderBackend};
pub use scene::Scene;
pub use scheduler::{CancellationToken, FixedStepScheduler, FrameScheduler, ManualScheduler};
pub use viewport::{Viewport, ViewportManager, ViewportProvider};
