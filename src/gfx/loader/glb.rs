//! Binary glTF (GLB) decoding
//!
//! Walks the default scene (or the first one), bakes node transforms into
//! the vertex data and returns triangle meshes in scene-root space. Embedded
//! images are not decoded; the viewer shades with lights only.

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4, InnerSpace};

use super::LoadedAsset;
use crate::{
    error::{Error, Result},
    gfx::scene::{MeshData, SceneRoot},
};

pub fn decode_glb(bytes: &[u8]) -> Result<LoadedAsset> {
    let ::gltf::Gltf { document, blob } =
        ::gltf::Gltf::from_slice(bytes).map_err(|e| Error::AssetDecodeError(e.to_string()))?;
    let buffers = ::gltf::import_buffers(&document, None, blob)
        .map_err(|e| Error::AssetDecodeError(e.to_string()))?;

    let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Ok(LoadedAsset { scene: None });
    };

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_node(&node, Matrix4::identity(), &buffers, &mut meshes)?;
    }

    Ok(LoadedAsset {
        scene: Some(SceneRoot {
            name: scene.name().map(str::to_owned),
            meshes,
        }),
    })
}

fn collect_node(
    node: &::gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[::gltf::buffer::Data],
    meshes: &mut Vec<MeshData>,
) -> Result<()> {
    let world = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let normal_matrix = normal_matrix(&world);
        for (index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping {:?} primitive {} of mesh {:?}",
                    primitive.mode(),
                    index,
                    mesh.name()
                );
                continue;
            }

            let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };

            let positions: Vec<[f32; 3]> = positions
                .map(|p| {
                    let v = world * Vector4::new(p[0], p[1], p[2], 1.0);
                    [v.x, v.y, v.z]
                })
                .collect();
            let normals = reader.read_normals().map(|normals| {
                normals
                    .map(|n| {
                        let v = (normal_matrix * Vector3::new(n[0], n[1], n[2])).normalize();
                        [v.x, v.y, v.z]
                    })
                    .collect::<Vec<_>>()
            });
            let indices = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect::<Vec<_>>());

            let name = match mesh.name() {
                Some(name) => format!("{name}#{index}"),
                None => format!("mesh{}#{index}", mesh.index()),
            };
            let mut data = MeshData::new(name, positions, normals, indices);
            let dropped = data.retain_valid_triangles();
            if dropped > 0 {
                log::warn!("Dropped {} malformed triangles from {}", dropped, data.name);
            }
            meshes.push(data);
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, meshes)?;
    }
    Ok(())
}

/// Inverse-transpose of the upper 3x3, identity when the transform is singular
fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Packs a JSON document and an optional binary chunk into a GLB container
    pub(crate) fn glb_bytes(json: &serde_json::Value, bin: &[u8]) -> Vec<u8> {
        let mut json_chunk = serde_json::to_vec(json).unwrap();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let mut bin_chunk = bin.to_vec();
        while bin_chunk.len() % 4 != 0 {
            bin_chunk.push(0);
        }

        let mut total = 12 + 8 + json_chunk.len();
        if !bin_chunk.is_empty() {
            total += 8 + bin_chunk.len();
        }

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json_chunk);
        if !bin_chunk.is_empty() {
            out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
            out.extend_from_slice(b"BIN\0");
            out.extend_from_slice(&bin_chunk);
        }
        out
    }

    /// A single triangle spanning (0,0,0)-(2,2,0), placed by a node translation
    pub(crate) fn triangle_glb(translation: [f32; 3]) -> Vec<u8> {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);

        let json = serde_json::json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "translation": translation }],
            "meshes": [{ "name": "tri", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [2.0, 2.0, 0.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ]
        });
        glb_bytes(&json, &bin)
    }

    /// A valid GLB whose document declares no scenes
    pub(crate) fn sceneless_glb() -> Vec<u8> {
        glb_bytes(&serde_json::json!({ "asset": { "version": "2.0" } }), &[])
    }

    #[test]
    fn test_triangle_is_decoded_in_root_space() {
        let loaded = decode_glb(&triangle_glb([5.0, 0.0, 0.0])).unwrap();
        let scene = loaded.scene.expect("scene root");

        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_relative_eq!(mesh.positions[0][0], 5.0);
        assert_relative_eq!(mesh.positions[1][0], 7.0);
        // computed normals face +Z
        assert_relative_eq!(mesh.normals[0][2], 1.0);
    }

    #[test]
    fn test_document_without_scene_has_no_root() {
        let loaded = decode_glb(&sceneless_glb()).unwrap();
        assert!(loaded.scene.is_none());
    }

    #[test]
    fn test_truncated_glb_is_a_decode_error() {
        let bytes = triangle_glb([0.0; 3]);
        let result = decode_glb(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(Error::AssetDecodeError(_))));
    }
}
