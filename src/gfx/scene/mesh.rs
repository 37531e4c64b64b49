//! CPU-side triangle meshes produced by the asset loaders

use super::vertex::Vertex3D;

/// Indexed triangle mesh in the asset's root space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds a mesh, computing smooth normals when none (or a mismatched
    /// set) are supplied.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let indices = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());
        let normals = match normals {
            Some(normals) if normals.len() == positions.len() => normals,
            _ => calculate_vertex_normals(&positions, &indices),
        };

        Self {
            name: name.into(),
            positions,
            normals,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    /// Interleaves positions and normals for upload
    pub fn vertices(&self) -> Vec<Vertex3D> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(position, normal)| Vertex3D {
                position: *position,
                normal: *normal,
            })
            .collect()
    }

    /// Drops triangles that reference vertices outside the position list
    pub fn retain_valid_triangles(&mut self) -> usize {
        let count = self.positions.len() as u32;
        let before = self.indices.len() / 3;
        let kept: Vec<u32> = self
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();
        self.indices = kept;
        before - self.indices.len() / 3
    }
}

/// Averages face normals into per-vertex normals
pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![[0.0f32; 3]; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let (i0, i1, i2) = (
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        );
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);
        let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

        // Unnormalized cross product weights larger faces more
        let face_normal = [
            edge1[1] * edge2[2] - edge1[2] * edge2[1],
            edge1[2] * edge2[0] - edge1[0] * edge2[2],
            edge1[0] * edge2[1] - edge1[1] * edge2[0],
        ];

        for &vertex_idx in &[i0, i1, i2] {
            normals[vertex_idx][0] += face_normal[0];
            normals[vertex_idx][1] += face_normal[1];
            normals[vertex_idx][2] += face_normal[2];
        }
    }

    for normal in normals.iter_mut() {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        } else {
            *normal = [0.0, 1.0, 0.0];
        }
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_normals_are_computed() {
        let mesh = MeshData::new(
            "tri",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
        );
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        for normal in &mesh.normals {
            assert_relative_eq!(normal[2], 1.0);
        }
    }

    #[test]
    fn test_out_of_range_triangles_are_dropped() {
        let mut mesh = MeshData::new(
            "broken",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            Some(vec![0, 1, 2, 0, 1, 9]),
        );
        assert_eq!(mesh.retain_valid_triangles(), 1);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
