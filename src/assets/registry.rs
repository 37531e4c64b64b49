//! Process-scoped object URLs
//!
//! Mirrors the browser's object-URL table: a minted URL resolves to the bytes
//! of a [`BinaryHandle`] until it is revoked. The registry is shared between
//! the asset slot (which mints and revokes) and the viewer (which resolves).

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use super::handle::BinaryHandle;

const URL_SCHEME: &str = "blob:snapforge/";

/// A public reference URL minted by [`ObjectUrlRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicUrl(String);

impl PublicUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a string previously produced by the registry
    pub fn parse(url: &str) -> Option<Self> {
        url.starts_with(URL_SCHEME).then(|| PublicUrl(url.to_owned()))
    }
}

impl fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Revocation failed because the table lock was poisoned by a panic elsewhere
#[derive(Debug)]
pub struct RegistryPoisoned;

impl fmt::Display for RegistryPoisoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("object URL registry lock poisoned")
    }
}

#[derive(Default)]
pub struct ObjectUrlRegistry {
    entries: Mutex<HashMap<PublicUrl, BinaryHandle>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn table(&self) -> Result<MutexGuard<'_, HashMap<PublicUrl, BinaryHandle>>, RegistryPoisoned> {
        self.entries.lock().map_err(|_| RegistryPoisoned)
    }

    /// Mints a fresh URL for the handle
    pub fn mint(&self, handle: BinaryHandle) -> PublicUrl {
        let url = PublicUrl(format!(
            "{URL_SCHEME}{:016x}{:016x}",
            rand::random::<u64>(),
            rand::random::<u64>()
        ));
        match self.entries.lock() {
            Ok(mut table) => {
                table.insert(url.clone(), handle);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(url.clone(), handle);
            }
        }
        url
    }

    /// Looks up the bytes behind a live URL
    pub fn resolve(&self, url: &PublicUrl) -> Option<BinaryHandle> {
        self.table().ok()?.get(url).cloned()
    }

    /// Revokes a URL. Unknown or already revoked URLs are a no-op and report
    /// `Ok(false)`.
    pub fn revoke(&self, url: &PublicUrl) -> Result<bool, RegistryPoisoned> {
        Ok(self.table()?.remove(url).is_some())
    }

    /// Revokes every outstanding URL, returning how many were live
    pub fn revoke_all(&self) -> usize {
        match self.entries.lock() {
            Ok(mut table) => table.drain().count(),
            Err(poisoned) => poisoned.into_inner().drain().count(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.table().map(|table| table.len()).unwrap_or(0)
    }

    pub fn is_live(&self, url: &PublicUrl) -> bool {
        self.table()
            .map(|table| table.contains_key(url))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ContentKind;

    #[test]
    fn test_mint_resolve_revoke() {
        let registry = ObjectUrlRegistry::new();
        let handle = BinaryHandle::new(vec![7u8; 4], ContentKind::GltfBinary);
        let url = registry.mint(handle.clone());

        assert!(url.as_str().starts_with("blob:snapforge/"));
        assert!(registry.resolve(&url).unwrap().same_buffer(&handle));

        assert!(registry.revoke(&url).unwrap());
        assert!(registry.resolve(&url).is_none());
        // second revoke is a no-op, not an error
        assert!(!registry.revoke(&url).unwrap());
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let handle = BinaryHandle::new(vec![0u8], ContentKind::Png);
        let a = registry.mint(handle.clone());
        let b = registry.mint(handle);
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
        assert_eq!(registry.revoke_all(), 2);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_parse_rejects_foreign_urls() {
        assert!(PublicUrl::parse("https://example.com/model.glb").is_none());
        assert!(PublicUrl::parse("blob:snapforge/abc").is_some());
    }
}
