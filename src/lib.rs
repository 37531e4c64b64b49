// src/lib.rs
//! Snapforge
//!
//! Turns a camera still into a rendered, downloadable 3D model: capture a
//! frame, enhance it through a remote image service, send the result to an
//! image-to-3D service and inspect the returned asset in a wgpu viewer.

pub mod app;
pub mod assets;
pub mod capture;
pub mod config;
pub mod error;
pub mod gfx;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod session;
pub mod toolkit;
pub mod viewer;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::SnapforgeApp;
pub use config::Config;
pub use error::{Error, Result};
pub use session::Session;
