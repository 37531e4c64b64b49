//! Scene normalizer and renderer
//!
//! [`Viewer::display`] turns a public asset URL into an interactive view:
//! acquire the toolkit, replace the previous engine context, light the scene,
//! decode and normalize the asset, frame the camera on a diagonal, attach
//! damped orbit navigation, start the render loop and register the resize
//! handler. A failed step leaves whatever was built before it in place and
//! nothing after it.

pub mod container;

use std::sync::atomic::{AtomicU64, Ordering};

use winit::event::{DeviceEvent, KeyEvent, WindowEvent};

use crate::{
    assets::{ObjectUrlRegistry, PublicUrl},
    error::{Error, Result},
    gfx::{
        camera::{CameraManager, OrbitCamera},
        engine::{EngineContext, Light},
        scene::SceneGraph,
    },
    toolkit::ToolkitLoader,
};

pub use container::{Container, RenderLoop};

static NEXT_VIEWER_ID: AtomicU64 = AtomicU64::new(1);

struct ActiveView {
    context: Box<dyn EngineContext>,
    scene: Option<SceneGraph>,
    camera: Option<CameraManager>,
    render_loop: Option<RenderLoop>,
}

pub struct Viewer {
    id: u64,
    container: Container,
    loader: ToolkitLoader,
    active: Option<ActiveView>,
}

impl Viewer {
    pub fn new(container: Container, loader: ToolkitLoader) -> Self {
        Self {
            id: NEXT_VIEWER_ID.fetch_add(1, Ordering::Relaxed),
            container,
            loader,
            active: None,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn has_engine_context(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_rendering(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|view| view.render_loop.is_some())
    }

    pub fn context(&self) -> Option<&dyn EngineContext> {
        self.active.as_ref().map(|view| view.context.as_ref())
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.active.as_ref().and_then(|view| view.scene.as_ref())
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.active
            .as_ref()
            .and_then(|view| view.camera.as_ref())
            .map(|manager| &manager.camera)
    }

    /// Frames rendered by the current loop
    pub fn frames_rendered(&self) -> u64 {
        self.active
            .as_ref()
            .and_then(|view| view.render_loop.as_ref())
            .map_or(0, RenderLoop::frames)
    }

    /// Drops the engine context and stops the render loop
    pub fn discard(&mut self) {
        if self.active.take().is_some() {
            log::debug!("Discarded previous view");
        }
    }

    pub async fn display(&mut self, url: &PublicUrl, registry: &ObjectUrlRegistry) -> Result<()> {
        // 1. toolkit, before anything is torn down or created
        let toolkit = self.loader.load().await?;

        // 2. fresh engine context replacing the previous view
        self.discard();
        let size = self.container.surface_size();
        self.container.fit_window(size);
        let context = toolkit.engine.create_context(self.container.window(), size)?;
        let view = self.active.insert(ActiveView {
            context,
            scene: None,
            camera: None,
            render_loop: None,
        });

        // 3. lights
        view.context.add_light(Light::key());
        view.context.add_light(Light::fill());

        // 4-5. decode, scale to the canonical size and recenter
        let handle = registry
            .resolve(url)
            .ok_or_else(|| Error::AssetDecodeError(format!("{url} is no longer live")))?;
        let loaded = toolkit.asset_loader.load(&handle).await?;
        let root = loaded.scene.ok_or(Error::AssetHasNoScene)?;
        let graph = SceneGraph::normalize(root);
        view.context.set_scene(&graph)?;

        // 6-7. camera on the diagonal with damped navigation
        let mut camera = OrbitCamera::framed_on_diagonal(graph.framing_distance(), size.aspect());
        camera.update_view_proj();
        let manager = CameraManager::new(camera, toolkit.navigation.controls());

        log::info!(
            "Displaying {}: {} triangles, scale {:.4}, camera distance {:.3}",
            url,
            graph.root().triangle_count(),
            graph.scale(),
            manager.camera.distance
        );

        view.scene = Some(graph);
        view.camera = Some(manager);

        // 8. render loop, one per container
        view.render_loop = Some(self.container.attach_render_loop());

        // 9. resize handler, once per container
        if self.container.register_resize_handler(self.id) {
            log::debug!("Registered resize handler for viewer {}", self.id);
        }

        self.container.request_redraw();
        Ok(())
    }

    /// Renders one frame if a loop is running; `false` when idle
    pub fn render_frame(&mut self) -> Result<bool> {
        let Some(view) = self.active.as_mut() else {
            return Ok(false);
        };
        let (Some(render_loop), Some(camera)) = (view.render_loop.as_mut(), view.camera.as_mut())
        else {
            return Ok(false);
        };

        camera.update();
        view.context.render(&camera.camera.uniform)?;
        render_loop.tick();
        Ok(true)
    }

    /// Resize handler: recomputes the surface from the new container width
    pub fn on_resize(&mut self, width: u32) {
        self.container.set_width(width);
        if !self.container.has_resize_handler(self.id) {
            return;
        }

        let size = self.container.surface_size();
        self.container.fit_window(size);
        if let Some(view) = self.active.as_mut() {
            view.context.resize(size);
            if let Some(camera) = view.camera.as_mut() {
                camera.resize(size.width, size.height);
            }
        }
    }

    pub fn window_event(&mut self, event: &WindowEvent) {
        if let Some(camera) = self.camera_manager() {
            camera.controls.process_window_event(event);
        }
    }

    pub fn device_event(&mut self, event: &DeviceEvent) {
        if let Some(camera) = self.camera_manager() {
            camera.process_event(event);
        }
    }

    pub fn keyboard_event(&mut self, event: &KeyEvent) {
        if let Some(camera) = self.camera_manager() {
            camera.process_keyboard_event(event);
        }
    }

    /// Back to the diagonal framing chosen by the last display
    pub fn reset_view(&mut self) {
        if let Some(manager) = self.camera_manager() {
            manager.controls.reset(&mut manager.camera);
            manager.camera.update_view_proj();
        }
    }

    fn camera_manager(&mut self) -> Option<&mut CameraManager> {
        self.active.as_mut().and_then(|view| view.camera.as_mut())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        assets::{BinaryHandle, ContentKind},
        gfx::{
            camera::CameraUniform,
            engine::{Engine, SurfaceSize},
            loader::{AssetLoader, LoadedAsset},
            scene::{MeshData, SceneRoot},
        },
        toolkit::{NavigationSettings, Toolkit, ToolkitExports, ToolkitSource},
    };
    use approx::assert_relative_eq;
    use futures::future::BoxFuture;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use winit::window::Window;

    #[derive(Default)]
    pub(crate) struct MockContext {
        lights: Vec<Light>,
        has_scene: bool,
        size: Option<SurfaceSize>,
    }

    impl EngineContext for MockContext {
        fn add_light(&mut self, light: Light) {
            self.lights.push(light);
        }

        fn lights(&self) -> &[Light] {
            &self.lights
        }

        fn set_scene(&mut self, _scene: &SceneGraph) -> Result<()> {
            self.has_scene = true;
            Ok(())
        }

        fn has_scene(&self) -> bool {
            self.has_scene
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.size = Some(size);
        }

        fn size(&self) -> SurfaceSize {
            self.size.unwrap_or(SurfaceSize::new(0, 0))
        }

        fn render(&mut self, _camera: &CameraUniform) -> Result<()> {
            Ok(())
        }
    }

    /// Engine double that counts the contexts it hands out
    #[derive(Default, Clone)]
    pub(crate) struct MockEngine {
        pub contexts_created: Arc<AtomicUsize>,
    }

    impl Engine for MockEngine {
        fn name(&self) -> String {
            "mock".into()
        }

        fn create_context(
            &self,
            _window: Option<Arc<Window>>,
            size: SurfaceSize,
        ) -> Result<Box<dyn EngineContext>> {
            self.contexts_created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockContext {
                size: Some(size),
                ..Default::default()
            }))
        }
    }

    #[derive(Clone)]
    pub(crate) enum MockOutcome {
        Scene(SceneRoot),
        NoScene,
        DecodeError,
    }

    /// Asset loader double returning a scripted outcome whatever the bytes
    #[derive(Clone)]
    pub(crate) struct MockLoader {
        pub outcome: MockOutcome,
    }

    impl Default for MockLoader {
        fn default() -> Self {
            Self {
                outcome: MockOutcome::Scene(box_scene([0.0, 0.0, 0.0], [4.0, 2.0, 1.0])),
            }
        }
    }

    impl AssetLoader for MockLoader {
        fn load<'a>(&'a self, _asset: &'a BinaryHandle) -> BoxFuture<'a, Result<LoadedAsset>> {
            let outcome = match &self.outcome {
                MockOutcome::Scene(root) => Ok(LoadedAsset {
                    scene: Some(root.clone()),
                }),
                MockOutcome::NoScene => Ok(LoadedAsset { scene: None }),
                MockOutcome::DecodeError => Err(Error::AssetDecodeError("truncated".into())),
            };
            Box::pin(async move { outcome })
        }
    }

    pub(crate) fn box_scene(min: [f32; 3], max: [f32; 3]) -> SceneRoot {
        let positions = vec![min, [max[0], min[1], min[2]], max];
        SceneRoot {
            name: None,
            meshes: vec![MeshData::new("box", positions, None, None)],
        }
    }

    struct FixedSource {
        toolkit: Option<Toolkit>,
    }

    impl ToolkitSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn acquire(&self) -> BoxFuture<'_, Result<ToolkitExports>> {
            let outcome = match &self.toolkit {
                Some(toolkit) => Ok(ToolkitExports::Bundle(toolkit.clone())),
                None => Err(Error::LibraryUnavailable("offline".into())),
            };
            Box::pin(async move { outcome })
        }
    }

    fn viewer_with(engine: &MockEngine, loader: MockLoader) -> Viewer {
        let toolkit = Toolkit {
            engine: Arc::new(engine.clone()),
            asset_loader: Arc::new(loader),
            navigation: NavigationSettings::default(),
        };
        Viewer::new(
            Container::headless(800),
            ToolkitLoader::new(vec![Box::new(FixedSource {
                toolkit: Some(toolkit),
            })]),
        )
    }

    fn live_url() -> (Arc<ObjectUrlRegistry>, PublicUrl) {
        let registry = ObjectUrlRegistry::new();
        let url = registry.mint(BinaryHandle::new(
            b"glTF".to_vec(),
            ContentKind::GltfBinary,
        ));
        (registry, url)
    }

    #[test]
    fn test_display_builds_full_view() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(&engine, MockLoader::default());
        let (registry, url) = live_url();

        pollster::block_on(viewer.display(&url, &registry)).unwrap();

        assert!(viewer.is_rendering());
        let context = viewer.context().unwrap();
        assert!(context.has_scene());
        assert_eq!(context.lights(), &[Light::key(), Light::fill()]);
        assert_eq!(context.size(), SurfaceSize::new(800, 600));

        let graph = viewer.scene().unwrap();
        assert_relative_eq!(graph.scale(), 0.45);
        assert_relative_eq!(viewer.camera().unwrap().distance, graph.framing_distance());
    }

    #[test]
    fn test_redisplay_keeps_one_loop_and_one_resize_handler() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(&engine, MockLoader::default());
        let (registry, url) = live_url();

        pollster::block_on(viewer.display(&url, &registry)).unwrap();
        pollster::block_on(viewer.display(&url, &registry)).unwrap();

        assert_eq!(engine.contexts_created.load(Ordering::SeqCst), 2);
        assert_eq!(viewer.container().active_render_loops(), 1);
        assert_eq!(viewer.container().resize_handler_count(), 1);
    }

    #[test]
    fn test_unavailable_toolkit_creates_no_context() {
        let mut viewer = Viewer::new(
            Container::headless(800),
            ToolkitLoader::new(vec![
                Box::new(FixedSource { toolkit: None }),
                Box::new(FixedSource { toolkit: None }),
            ]),
        );
        let (registry, url) = live_url();

        let result = pollster::block_on(viewer.display(&url, &registry));
        assert!(matches!(result, Err(Error::LibraryUnavailable(_))));
        assert!(!viewer.has_engine_context());
    }

    #[test]
    fn test_asset_without_scene_displays_nothing() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(
            &engine,
            MockLoader {
                outcome: MockOutcome::NoScene,
            },
        );
        let (registry, url) = live_url();

        let result = pollster::block_on(viewer.display(&url, &registry));
        assert!(matches!(result, Err(Error::AssetHasNoScene)));
        assert!(!viewer.is_rendering());
        assert!(!viewer.context().unwrap().has_scene());
    }

    #[test]
    fn test_decode_failure_keeps_context_without_loop() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(
            &engine,
            MockLoader {
                outcome: MockOutcome::DecodeError,
            },
        );
        let (registry, url) = live_url();

        let result = pollster::block_on(viewer.display(&url, &registry));
        assert!(matches!(result, Err(Error::AssetDecodeError(_))));
        assert!(viewer.has_engine_context());
        assert!(!viewer.is_rendering());
        assert_eq!(viewer.container().active_render_loops(), 0);
    }

    #[test]
    fn test_revoked_url_is_a_decode_error() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(&engine, MockLoader::default());
        let (registry, url) = live_url();
        registry.revoke(&url).unwrap();

        let result = pollster::block_on(viewer.display(&url, &registry));
        assert!(matches!(result, Err(Error::AssetDecodeError(_))));
    }

    #[test]
    fn test_frames_advance_only_while_rendering() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(&engine, MockLoader::default());
        assert!(!viewer.render_frame().unwrap());

        let (registry, url) = live_url();
        pollster::block_on(viewer.display(&url, &registry)).unwrap();
        assert!(viewer.render_frame().unwrap());
        assert!(viewer.render_frame().unwrap());
        assert_eq!(viewer.frames_rendered(), 2);
    }

    #[test]
    fn test_resize_applies_height_heuristic() {
        let engine = MockEngine::default();
        let mut viewer = viewer_with(&engine, MockLoader::default());
        let (registry, url) = live_url();
        pollster::block_on(viewer.display(&url, &registry)).unwrap();

        viewer.on_resize(400);
        assert_eq!(viewer.context().unwrap().size(), SurfaceSize::new(400, 400));
        assert_relative_eq!(viewer.camera().unwrap().aspect, 1.0);
    }
}
