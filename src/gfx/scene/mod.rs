//! # Scene Module
//!
//! CPU-side representation of a loaded asset and its normalization into the
//! canonical viewing frame.
//!
//! - [`SceneRoot`] - meshes of a decoded asset, node transforms baked in
//! - [`SceneGraph`] - a normalized root with its scale and bounding metrics
//! - [`Aabb`] - axis-aligned bounds used for normalization and framing
//! - [`Vertex3D`] - GPU vertex layout

pub mod bounds;
pub mod mesh;
pub mod scene_graph;
pub mod vertex;

// Re-export main types
pub use bounds::{Aabb, BoundingMetrics};
pub use mesh::MeshData;
pub use scene_graph::{framing_distance, normalization_scale, SceneGraph, SceneRoot};
pub use vertex::Vertex3D;
