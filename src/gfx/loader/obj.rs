//! Wavefront OBJ decoding through `tobj`

use std::io::BufReader;

use super::LoadedAsset;
use crate::{
    error::{Error, Result},
    gfx::scene::{MeshData, SceneRoot},
};

/// Decodes an OBJ document from memory. Material libraries are not
/// resolved since a single uploaded file carries no sidecar `.mtl`.
pub fn decode_obj(bytes: &[u8]) -> Result<LoadedAsset> {
    let mut reader = BufReader::new(bytes);
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| Error::AssetDecodeError(e.to_string()))?;

    if models.is_empty() {
        return Ok(LoadedAsset { scene: None });
    }

    let meshes = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            let positions: Vec<[f32; 3]> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();
            let normals = (!mesh.normals.is_empty()).then(|| {
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| [n[0], n[1], n[2]])
                    .collect::<Vec<_>>()
            });

            let mut data = MeshData::new(model.name, positions, normals, Some(mesh.indices));
            data.retain_valid_triangles();
            data
        })
        .collect();

    Ok(LoadedAsset {
        scene: Some(SceneRoot { name: None, meshes }),
    })
}
