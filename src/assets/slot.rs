//! Single-slot owner of the current generated asset and its public URL

use std::sync::Arc;

use super::{
    handle::BinaryHandle,
    registry::{ObjectUrlRegistry, PublicUrl},
};

/// Suggested filename used when the generator gives none
pub const DEFAULT_MODEL_FILENAME: &str = "model.glb";

/// The generated asset currently offered for display and download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub handle: BinaryHandle,
    pub public_url: PublicUrl,
    pub suggested_filename: String,
}

/// Resource lifecycle manager for the one live [`AssetReference`].
///
/// `install` and `clear` are the only places a URL gets revoked, so each URL
/// is revoked exactly once and only after it has been replaced.
pub struct AssetSlot {
    registry: Arc<ObjectUrlRegistry>,
    current: Option<AssetReference>,
}

impl AssetSlot {
    pub fn new(registry: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }

    /// Installs a new asset, revoking the previous reference right after the
    /// new one is in place.
    pub fn install(&mut self, handle: BinaryHandle, filename: &str) -> AssetReference {
        let public_url = self.registry.mint(handle.clone());
        let reference = AssetReference {
            handle,
            public_url,
            suggested_filename: filename.to_owned(),
        };

        let previous = self.current.replace(reference.clone());
        if let Some(previous) = previous {
            self.revoke(&previous.public_url);
        }

        log::info!(
            "Installed asset {} ({} bytes) as {}",
            reference.suggested_filename,
            reference.handle.len(),
            reference.public_url
        );
        reference
    }

    pub fn current(&self) -> Option<&AssetReference> {
        self.current.as_ref()
    }

    /// Revokes and empties the slot
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            self.revoke(&previous.public_url);
        }
    }

    /// Whether the download control should be enabled
    pub fn can_download(&self) -> bool {
        self.current.is_some()
    }

    // Failures are only logged; teardown's revoke_all picks up leaked URLs
    fn revoke(&self, url: &PublicUrl) {
        match self.registry.revoke(url) {
            Ok(true) => log::debug!("Revoked {}", url),
            Ok(false) => log::debug!("{} was already revoked", url),
            Err(err) => log::warn!("Could not revoke {}: {}", url, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ContentKind;

    fn glb(byte: u8) -> BinaryHandle {
        BinaryHandle::new(vec![byte; 16], ContentKind::GltfBinary)
    }

    #[test]
    fn test_live_references_never_exceed_one() {
        let registry = ObjectUrlRegistry::new();
        let mut slot = AssetSlot::new(registry.clone());

        let mut previous: Option<AssetReference> = None;
        for i in 0..8u8 {
            let reference = slot.install(glb(i), "model.glb");
            assert_eq!(registry.live_count(), 1);
            assert!(registry.is_live(&reference.public_url));
            if let Some(previous) = previous {
                assert!(!registry.is_live(&previous.public_url));
            }
            previous = Some(reference);
        }
    }

    #[test]
    fn test_clear_revokes_and_empties() {
        let registry = ObjectUrlRegistry::new();
        let mut slot = AssetSlot::new(registry.clone());
        let reference = slot.install(glb(1), "statue.glb");

        slot.clear();
        assert!(slot.current().is_none());
        assert!(!slot.can_download());
        assert!(registry.resolve(&reference.public_url).is_none());

        // clearing an empty slot is a no-op
        slot.clear();
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_install_after_external_revoke_does_not_fail() {
        let registry = ObjectUrlRegistry::new();
        let mut slot = AssetSlot::new(registry.clone());
        let first = slot.install(glb(1), "a.glb");
        registry.revoke_all();

        let second = slot.install(glb(2), "b.glb");
        assert_eq!(slot.current().unwrap().public_url, second.public_url);
        assert!(!registry.is_live(&first.public_url));
        assert_eq!(registry.live_count(), 1);
    }
}
