//! # Graphics Module
//!
//! Everything the viewer needs to turn a decoded asset into pixels: camera
//! and navigation, asset decoding, scene normalization and the wgpu engine.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Orbit camera with damped controls
//! - **Engine seam** ([`engine`]) - [`Engine`]/[`EngineContext`] traits the viewer drives
//! - **Asset Loading** ([`loader`]) - GLB and OBJ decoding into a [`scene::SceneRoot`]
//! - **Rendering Pipeline** ([`rendering`]) - wgpu implementation of the engine seam
//! - **Scene Management** ([`scene`]) - Normalization into the canonical viewing frame
//! - **Resource Management** ([`resources`]) - Depth buffer and global uniforms
//!
//! [`Engine`]: engine::Engine
//! [`EngineContext`]: engine::EngineContext

pub mod camera;
pub mod engine;
pub mod loader;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use engine::{Engine, EngineContext, Light, SurfaceSize};
pub use loader::{AssetLoader, LoadedAsset, ModelLoader};
pub use rendering::render_engine::WgpuEngine;
