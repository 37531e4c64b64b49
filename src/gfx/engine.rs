//! Rendering engine seam
//!
//! The viewer only talks to an [`Engine`] (acquired as part of the rendering
//! toolkit) and to the [`EngineContext`] it creates for a container. The wgpu
//! implementation lives in [`crate::gfx::rendering`].

use std::sync::Arc;

use winit::window::Window;

use crate::{
    error::Result,
    gfx::{camera::CameraUniform, scene::SceneGraph},
};

/// Smallest surface height the viewer will configure
pub const MIN_SURFACE_HEIGHT: u32 = 400;

/// Surface dimensions in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height follows the container width: `max(400, width * 0.75)`
    pub fn for_container_width(width: u32) -> Self {
        let width = width.max(1);
        let height = ((width as f32 * 0.75) as u32).max(MIN_SURFACE_HEIGHT);
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Scene lighting installed by the viewer before an asset is shown
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Parallel light arriving from `direction` (pointing towards the light)
    Directional {
        direction: [f32; 3],
        color: [f32; 3],
        intensity: f32,
    },
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
}

impl Light {
    pub fn key() -> Self {
        Light::Directional {
            direction: [0.5, 1.0, 0.75],
            color: [1.0, 1.0, 1.0],
            intensity: 0.9,
        }
    }

    pub fn fill() -> Self {
        Light::Ambient {
            color: [1.0, 1.0, 1.0],
            intensity: 0.35,
        }
    }
}

/// A rendering engine able to create per-container drawing contexts
pub trait Engine: Send + Sync {
    /// Human-readable adapter or backend name
    fn name(&self) -> String;

    /// Creates a fresh context drawing into `window` at `size`. Headless
    /// containers pass `None`.
    fn create_context(
        &self,
        window: Option<Arc<Window>>,
        size: SurfaceSize,
    ) -> Result<Box<dyn EngineContext>>;
}

/// Drawing state bound to one container
pub trait EngineContext {
    fn add_light(&mut self, light: Light);

    fn lights(&self) -> &[Light];

    /// Uploads a normalized scene, replacing the previous one
    fn set_scene(&mut self, scene: &SceneGraph) -> Result<()>;

    fn has_scene(&self) -> bool;

    fn resize(&mut self, size: SurfaceSize);

    fn size(&self) -> SurfaceSize;

    fn render(&mut self, camera: &CameraUniform) -> Result<()>;
}
