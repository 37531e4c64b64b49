// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Handles adapter acquisition, the viewer pipeline and frame rendering.

pub mod render_engine;

// Re-export main types
pub use render_engine::{AdapterRequest, WgpuContext, WgpuEngine};
