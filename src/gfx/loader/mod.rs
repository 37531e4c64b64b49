//! Asset decoding
//!
//! [`AssetLoader`] is the asset-format half of the rendering toolkit. Decoding
//! is exposed as a future so the viewer's render loop only starts after a
//! successful decode.

pub mod glb;
pub mod obj;

use futures::future::BoxFuture;

use crate::{
    assets::{BinaryHandle, ContentKind},
    error::{Error, Result},
    gfx::scene::SceneRoot,
};

const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Result of decoding an asset. `scene` is `None` when the document has no
/// displayable scene root.
#[derive(Debug, Clone, Default)]
pub struct LoadedAsset {
    pub scene: Option<SceneRoot>,
}

pub trait AssetLoader: Send + Sync {
    fn load<'a>(&'a self, asset: &'a BinaryHandle) -> BoxFuture<'a, Result<LoadedAsset>>;
}

/// Best-effort content kind for a handle, looking at magic bytes when the
/// producer only said "octet-stream"
pub fn sniff_kind(asset: &BinaryHandle) -> ContentKind {
    match asset.kind() {
        ContentKind::OctetStream => {
            let bytes = asset.bytes();
            if bytes.starts_with(GLB_MAGIC) {
                ContentKind::GltfBinary
            } else if looks_like_obj(bytes) {
                ContentKind::Obj
            } else {
                ContentKind::OctetStream
            }
        }
        kind => kind,
    }
}

fn looks_like_obj(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    text.lines()
        .map(str::trim_start)
        .any(|line| line.starts_with("v ") || line.starts_with("o ") || line.starts_with("f "))
}

/// Dispatches to the glTF or OBJ decoder by content kind
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    fn decode(asset: &BinaryHandle) -> Result<LoadedAsset> {
        match sniff_kind(asset) {
            ContentKind::GltfBinary => glb::decode_glb(asset.bytes()),
            ContentKind::Obj => obj::decode_obj(asset.bytes()),
            other => Err(Error::AssetDecodeError(format!(
                "unsupported asset content type {other}"
            ))),
        }
    }
}

impl AssetLoader for ModelLoader {
    fn load<'a>(&'a self, asset: &'a BinaryHandle) -> BoxFuture<'a, Result<LoadedAsset>> {
        Box::pin(async move {
            let loaded = Self::decode(asset)?;
            if let Some(scene) = &loaded.scene {
                log::info!(
                    "Decoded {} asset: {} meshes, {} triangles",
                    asset.kind(),
                    scene.meshes.len(),
                    scene.triangle_count()
                );
            }
            Ok(loaded)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_glb_magic() {
        let handle = BinaryHandle::new(b"glTF\x02\x00\x00\x00".to_vec(), ContentKind::OctetStream);
        assert_eq!(sniff_kind(&handle), ContentKind::GltfBinary);
    }

    #[test]
    fn test_sniff_obj_text() {
        let handle = BinaryHandle::new(
            b"# exported\nv 0 0 0\nv 1 0 0\n".to_vec(),
            ContentKind::OctetStream,
        );
        assert_eq!(sniff_kind(&handle), ContentKind::Obj);
    }

    #[test]
    fn test_declared_kind_wins() {
        let handle = BinaryHandle::new(b"v 0 0 0".to_vec(), ContentKind::Png);
        assert_eq!(sniff_kind(&handle), ContentKind::Png);
    }

    #[test]
    fn test_unknown_bytes_fail_to_decode() {
        let handle = BinaryHandle::new(vec![0xde, 0xad, 0xbe, 0xef], ContentKind::OctetStream);
        let result = pollster::block_on(ModelLoader::new().load(&handle));
        assert!(matches!(result, Err(Error::AssetDecodeError(_))));
    }
}
