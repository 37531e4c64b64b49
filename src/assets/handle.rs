//! Binary handles passed between pipeline stages

use std::{fmt, sync::Arc};

/// Content kind tag carried by every [`BinaryHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Png,
    Jpeg,
    GltfBinary,
    Obj,
    OctetStream,
}

impl ContentKind {
    pub fn mime(self) -> &'static str {
        match self {
            ContentKind::Png => "image/png",
            ContentKind::Jpeg => "image/jpeg",
            ContentKind::GltfBinary => "model/gltf-binary",
            ContentKind::Obj => "model/obj",
            ContentKind::OctetStream => "application/octet-stream",
        }
    }

    /// Maps a MIME type (parameters ignored) onto a known kind
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => ContentKind::Png,
            "image/jpeg" | "image/jpg" => ContentKind::Jpeg,
            "model/gltf-binary" => ContentKind::GltfBinary,
            "model/obj" | "text/plain" => ContentKind::Obj,
            _ => ContentKind::OctetStream,
        }
    }

    /// Maps a file extension onto a known kind
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" => ContentKind::Png,
            "jpg" | "jpeg" => ContentKind::Jpeg,
            "glb" => ContentKind::GltfBinary,
            "obj" => ContentKind::Obj,
            _ => ContentKind::OctetStream,
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, ContentKind::Png | ContentKind::Jpeg)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An opaque reference to an in-memory byte buffer plus its content kind.
///
/// Cloning shares the underlying buffer; the bytes are never copied once a
/// handle exists. Stages hand handles to each other by value.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryHandle {
    data: Arc<[u8]>,
    kind: ContentKind,
}

impl BinaryHandle {
    pub fn new(data: impl Into<Arc<[u8]>>, kind: ContentKind) -> Self {
        Self {
            data: data.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Re-tags the handle after content sniffing. Shares the same buffer.
    pub fn with_kind(self, kind: ContentKind) -> Self {
        Self {
            data: self.data,
            kind,
        }
    }

    /// True when both handles point at the same buffer
    pub fn same_buffer(&self, other: &BinaryHandle) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for BinaryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryHandle")
            .field("kind", &self.kind)
            .field("len", &self.data.len())
            .finish()
    }
}
