//! Progressive acquisition of the rendering toolkit
//!
//! A toolkit is the engine, the asset loader and the navigation settings the
//! viewer needs to show an asset. [`ToolkitLoader`] walks an ordered list of
//! [`ToolkitSource`]s and takes the first one that yields a complete toolkit.
//! Sources may describe their exports as separate named parts or as a ready
//! bundle; both shapes are normalized here.

pub mod sources;

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    error::{Error, Result},
    gfx::{
        camera::orbit_controls::{OrbitControls, DEFAULT_DAMPING},
        engine::Engine,
        loader::AssetLoader,
    },
};

pub use sources::{BundledToolkit, PinnedToolkit, ToolkitPin};

/// Tunables for the orbit/zoom navigation controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSettings {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub damping_factor: f32,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            damping_factor: DEFAULT_DAMPING,
        }
    }
}

impl NavigationSettings {
    /// A fresh controller with damping enabled
    pub fn controls(&self) -> OrbitControls {
        OrbitControls::new(self.rotate_speed, self.zoom_speed).with_damping(self.damping_factor)
    }
}

/// A complete rendering toolkit
#[derive(Clone)]
pub struct Toolkit {
    pub engine: Arc<dyn Engine>,
    pub asset_loader: Arc<dyn AssetLoader>,
    pub navigation: NavigationSettings,
}

impl fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolkit")
            .field("engine", &self.engine.name())
            .field("navigation", &self.navigation)
            .finish_non_exhaustive()
    }
}

/// The two export shapes a source may produce
pub enum ToolkitExports {
    /// Separately exported parts, any of which may be missing
    Named {
        engine: Option<Arc<dyn Engine>>,
        asset_loader: Option<Arc<dyn AssetLoader>>,
        navigation: Option<NavigationSettings>,
    },
    /// A default-style bundle that already holds every part
    Bundle(Toolkit),
}

impl ToolkitExports {
    /// Produces a complete toolkit or names the missing parts
    pub fn normalize(self) -> Result<Toolkit> {
        match self {
            ToolkitExports::Bundle(toolkit) => Ok(toolkit),
            ToolkitExports::Named {
                engine: Some(engine),
                asset_loader: Some(asset_loader),
                navigation: Some(navigation),
            } => Ok(Toolkit {
                engine,
                asset_loader,
                navigation,
            }),
            ToolkitExports::Named {
                engine,
                asset_loader,
                navigation,
            } => {
                let missing: Vec<&str> = [
                    engine.is_none().then_some("engine"),
                    asset_loader.is_none().then_some("asset loader"),
                    navigation.is_none().then_some("navigation"),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(Error::LibraryUnavailable(format!(
                    "incomplete exports, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// One place a toolkit can be acquired from
pub trait ToolkitSource: Send + Sync {
    fn name(&self) -> &str;

    fn acquire(&self) -> BoxFuture<'_, Result<ToolkitExports>>;
}

/// Ordered list of toolkit sources, first success wins
pub struct ToolkitLoader {
    sources: Vec<Box<dyn ToolkitSource>>,
}

impl ToolkitLoader {
    pub fn new(sources: Vec<Box<dyn ToolkitSource>>) -> Self {
        Self { sources }
    }

    /// Hardware adapter first, then the pinned fallback
    pub fn with_fallback(pin: ToolkitPin, navigation: NavigationSettings) -> Self {
        Self::new(vec![
            Box::new(BundledToolkit { navigation }),
            Box::new(PinnedToolkit::new(pin).with_navigation(navigation)),
        ])
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn load(&self) -> Result<Toolkit> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let attempt = match source.acquire().await {
                Ok(exports) => exports.normalize(),
                Err(e) => Err(e),
            };
            match attempt {
                Ok(toolkit) => {
                    log::info!(
                        "Rendering toolkit loaded from {} ({})",
                        source.name(),
                        toolkit.engine.name()
                    );
                    return Ok(toolkit);
                }
                Err(e) => {
                    log::warn!("Toolkit source {} failed: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::LibraryUnavailable(
                "no toolkit sources configured".into(),
            ));
        }
        Err(Error::LibraryUnavailable(failures.join("; ")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::viewer::tests::{MockEngine, MockLoader};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source with a scripted outcome that counts its acquisitions
    pub(crate) struct ScriptedSource {
        pub name: &'static str,
        pub outcome: fn() -> Result<ToolkitExports>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub fn new(name: &'static str, outcome: fn() -> Result<ToolkitExports>) -> Self {
            Self {
                name,
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ToolkitSource for ScriptedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn acquire(&self) -> BoxFuture<'_, Result<ToolkitExports>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = (self.outcome)();
            Box::pin(async move { outcome })
        }
    }

    pub(crate) fn failing() -> Result<ToolkitExports> {
        Err(Error::LibraryUnavailable("no adapter".into()))
    }

    pub(crate) fn named_complete() -> Result<ToolkitExports> {
        Ok(ToolkitExports::Named {
            engine: Some(Arc::new(MockEngine::default())),
            asset_loader: Some(Arc::new(MockLoader::default())),
            navigation: Some(NavigationSettings::default()),
        })
    }

    fn named_without_loader() -> Result<ToolkitExports> {
        Ok(ToolkitExports::Named {
            engine: Some(Arc::new(MockEngine::default())),
            asset_loader: None,
            navigation: Some(NavigationSettings::default()),
        })
    }

    fn bundle() -> Result<ToolkitExports> {
        Ok(ToolkitExports::Bundle(Toolkit {
            engine: Arc::new(MockEngine::default()),
            asset_loader: Arc::new(MockLoader::default()),
            navigation: NavigationSettings::default(),
        }))
    }

    #[test]
    fn test_first_success_wins() {
        let primary = ScriptedSource::new("bundled", named_complete);
        let fallback = ScriptedSource::new("pinned", bundle);
        let fallback_calls = fallback.calls.clone();

        let loader = ToolkitLoader::new(vec![Box::new(primary), Box::new(fallback)]);
        assert!(pollster::block_on(loader.load()).is_ok());
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_used_when_bundled_fails() {
        let primary = ScriptedSource::new("bundled", failing);
        let fallback = ScriptedSource::new("pinned", bundle);
        let fallback_calls = fallback.calls.clone();

        let loader = ToolkitLoader::new(vec![Box::new(primary), Box::new(fallback)]);
        assert!(pollster::block_on(loader.load()).is_ok());
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_incomplete_named_exports_are_rejected() {
        let loader = ToolkitLoader::new(vec![Box::new(ScriptedSource::new(
            "partial",
            named_without_loader,
        ))]);
        match pollster::block_on(loader.load()) {
            Err(Error::LibraryUnavailable(message)) => {
                assert!(message.contains("asset loader"), "{message}");
            }
            other => panic!("expected LibraryUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_all_sources_failing_names_each_attempt() {
        let loader = ToolkitLoader::new(vec![
            Box::new(ScriptedSource::new("bundled", failing)),
            Box::new(ScriptedSource::new("pinned", failing)),
        ]);
        match pollster::block_on(loader.load()) {
            Err(Error::LibraryUnavailable(message)) => {
                assert!(message.contains("bundled"));
                assert!(message.contains("pinned"));
            }
            other => panic!("expected LibraryUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_default_chain_tries_bundled_before_pinned() {
        let loader = ToolkitLoader::with_fallback(ToolkitPin::default(), NavigationSettings::default());
        assert_eq!(loader.source_names(), vec!["bundled", "pinned-fallback"]);
    }

    #[test]
    fn test_navigation_settings_enable_damping() {
        let controls = NavigationSettings::default().controls();
        assert!(controls.damping_factor() > 0.0);
    }
}
