//! Normalization of loaded assets into a canonical frame
//!
//! Generated assets arrive in arbitrary units and positions. Every asset is
//! scaled so its largest extent is [`CANONICAL_SIZE`] units and then moved so
//! its bounding-box center sits at the origin. Scale is applied before the
//! translation, so the translation is computed from the scaled center.

use cgmath::{Matrix4, Vector3};

use super::{
    bounds::{Aabb, BoundingMetrics},
    mesh::MeshData,
};

/// Largest extent of a normalized asset
pub const CANONICAL_SIZE: f32 = 1.8;

/// Lower bound on the framed diagonal, keeps near-zero assets out of the near plane
pub const MIN_FRAMING_DIAGONAL: f32 = 1.0;

/// Camera distance as a multiple of the framed diagonal
pub const FRAMING_MARGIN: f32 = 1.5;

/// Scale that maps `max_dimension` onto [`CANONICAL_SIZE`]; `1.0` for
/// degenerate (zero-size) assets
pub fn normalization_scale(max_dimension: f32) -> f32 {
    if max_dimension > 0.0 {
        CANONICAL_SIZE / max_dimension
    } else {
        1.0
    }
}

/// Camera distance for an asset with the given diagonal once scaled
pub fn framing_distance(diagonal: f32, scale: f32) -> f32 {
    (diagonal * scale).max(MIN_FRAMING_DIAGONAL) * FRAMING_MARGIN
}

/// Displayable root of a decoded asset
#[derive(Debug, Clone, Default)]
pub struct SceneRoot {
    pub name: Option<String>,
    pub meshes: Vec<MeshData>,
}

impl SceneRoot {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(MeshData::triangle_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(MeshData::vertex_count).sum()
    }
}

/// A normalized asset ready for display.
///
/// Built once per load and never mutated; a new asset produces a new graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    root: SceneRoot,
    bounds: BoundingMetrics,
    scale: f32,
    translation: Vector3<f32>,
}

impl SceneGraph {
    pub fn normalize(root: SceneRoot) -> Self {
        let aabb = Aabb::from_points(root.meshes.iter().flat_map(|mesh| mesh.positions.iter()));
        let bounds = aabb.metrics();
        let scale = normalization_scale(bounds.max_dimension);
        let translation = -(bounds.center * scale);

        log::debug!(
            "Normalized asset: max dimension {:.4}, scale {:.4}, diagonal {:.4}",
            bounds.max_dimension,
            scale,
            bounds.diagonal
        );

        Self {
            root,
            bounds,
            scale,
            translation,
        }
    }

    pub fn root(&self) -> &SceneRoot {
        &self.root
    }

    /// Bounds in the asset's source units
    pub fn bounds(&self) -> &BoundingMetrics {
        &self.bounds
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.translation
    }

    /// Translation after uniform scale
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from_scale(self.scale)
    }

    /// Bounds after normalization
    pub fn normalized_bounds(&self) -> Aabb {
        let aabb = self.bounds.aabb;
        Aabb::new(
            aabb.min * self.scale + self.translation,
            aabb.max * self.scale + self.translation,
        )
    }

    pub fn framing_distance(&self) -> f32 {
        framing_distance(self.bounds.diagonal, self.scale)
    }
}
