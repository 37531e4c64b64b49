//! One user session: the open camera, the pipeline and everything it produced
//!
//! Remote stages are handed out as `'static` futures so the caller can spawn
//! them on the runtime while the session itself stays on the UI thread.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::runtime::Handle;

use crate::{
    assets::{
        AssetReference, BinaryHandle, ContentKind, ObjectUrlRegistry, DEFAULT_MODEL_FILENAME,
    },
    capture::{CaptureProvider, CaptureSession},
    config::Config,
    error::{Error, Result},
    pipeline::{Controls, GenerationPipeline, PipelineContext, RenderHandoff, Stage, StageResult},
    progress::{OverlayHost, ProgressReporter},
    remote::{EnhanceService, HttpEnhanceService, HttpModelService, ModelService},
};

/// Label of the overlay shown while a model is generated
pub const GENERATE_LABEL: &str = "Generating 3D model";

pub struct Session {
    registry: Arc<ObjectUrlRegistry>,
    capture: CaptureSession,
    ctx: Arc<PipelineContext>,
    pipeline: Arc<GenerationPipeline>,
    reporter: Arc<Mutex<ProgressReporter>>,
    torn_down: bool,
}

impl Session {
    pub fn new(
        enhancer: Arc<dyn EnhanceService>,
        modeler: Arc<dyn ModelService>,
        overlays: Arc<dyn OverlayHost>,
        runtime: Handle,
    ) -> Self {
        let registry = ObjectUrlRegistry::new();
        Self {
            ctx: Arc::new(PipelineContext::new(registry.clone())),
            registry,
            capture: CaptureSession::default(),
            pipeline: Arc::new(GenerationPipeline::new(enhancer, modeler)),
            reporter: Arc::new(Mutex::new(ProgressReporter::new(overlays, runtime))),
            torn_down: false,
        }
    }

    /// Builds the HTTP services described by `config`
    pub fn from_config(
        config: &Config,
        overlays: Arc<dyn OverlayHost>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let enhance_client = reqwest::Client::builder().build()?;
        let generate_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generate.timeout_secs))
            .build()?;

        let enhancer = HttpEnhanceService::new(enhance_client, &config.enhance.endpoint)
            .with_api_key(&config.enhance.api_key_header, config.enhance.api_key.clone());
        let modeler = HttpModelService::new(generate_client, &config.generate.endpoint)
            .with_bearer_token(config.generate.api_key.clone());

        let mut session = Self::new(Arc::new(enhancer), Arc::new(modeler), overlays, runtime);
        session.capture = CaptureSession::new(config.capture.constraints());
        Ok(session)
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.ctx
    }

    pub fn start_camera(&mut self, provider: &dyn CaptureProvider) -> Result<()> {
        self.capture.start(provider)
    }

    pub fn camera_active(&self) -> bool {
        self.capture.is_active()
    }

    pub fn capture(&mut self) -> Result<BinaryHandle> {
        self.pipeline.capture(&mut self.capture, &self.ctx)
    }

    pub fn controls(&self) -> Controls {
        self.pipeline.controls(&self.ctx, &self.capture)
    }

    pub fn stage_result(&self, stage: Stage) -> StageResult {
        self.ctx.stage_result(stage)
    }

    /// The enhancement stage as a spawnable future
    pub fn enhance_task(
        &self,
        instruction: String,
    ) -> impl Future<Output = Result<BinaryHandle>> + Send + 'static {
        let pipeline = self.pipeline.clone();
        let ctx = self.ctx.clone();
        async move { pipeline.enhance(&ctx, &instruction).await }
    }

    /// The 3D stage as a spawnable future, with the progress overlay running
    /// for as long as the remote call does
    pub fn generate_task(
        &self,
        handoff: Arc<dyn RenderHandoff>,
    ) -> impl Future<Output = Result<AssetReference>> + Send + 'static {
        let pipeline = self.pipeline.clone();
        let ctx = self.ctx.clone();
        let reporter = self.reporter.clone();
        async move {
            // a rejected call leaves the running overlay alone
            let guard = pipeline.begin(Stage::Generate3D)?;

            lock(&reporter).start(GENERATE_LABEL);
            let result = pipeline
                .generate_with(&guard, &ctx, handoff.as_ref())
                .await;
            match &result {
                Err(Error::Superseded(_)) => lock(&reporter).cancel(),
                _ => lock(&reporter).stop(result.is_ok()),
            }
            drop(guard);
            result
        }
    }

    /// Installs a model file from disk as if it had just been generated
    pub fn open_local(&self, path: &Path) -> Result<AssetReference> {
        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let handle = BinaryHandle::new(bytes, ContentKind::from_extension(extension));
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_MODEL_FILENAME);

        let reference = self.ctx.assets().install(handle, filename);
        log::info!("Opened {} as {}", path.display(), reference.public_url);
        Ok(reference)
    }

    /// Writes the installed model into `dir`
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        self.ctx.save_current(dir)
    }

    /// Stops the overlay, revokes every public URL and releases the camera.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        lock(&self.reporter).cancel();
        self.ctx.clear();
        let revoked = self.registry.revoke_all();
        self.capture.release();
        log::info!("Session closed, {} object URL(s) revoked", revoked);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn lock(reporter: &Mutex<ProgressReporter>) -> std::sync::MutexGuard<'_, ProgressReporter> {
    reporter.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capture::tests::MockCamera,
        pipeline::NoRender,
        progress::{tests::RecordingHost, ProgressOutcome},
        remote::GeneratedModel,
    };
    use futures::future::BoxFuture;
    use std::sync::atomic::Ordering;
    use tokio::sync::Notify;

    struct EchoEnhancer;

    impl EnhanceService for EchoEnhancer {
        fn enhance<'a>(
            &'a self,
            image: &'a BinaryHandle,
            _instruction: &'a str,
        ) -> BoxFuture<'a, Result<BinaryHandle>> {
            Box::pin(async move { Ok(image.clone()) })
        }
    }

    struct FixedModeler;

    impl ModelService for FixedModeler {
        fn generate<'a>(&'a self, _image: &'a BinaryHandle) -> BoxFuture<'a, Result<GeneratedModel>> {
            Box::pin(async {
                Ok(GeneratedModel {
                    handle: BinaryHandle::new(b"glTF".to_vec(), ContentKind::GltfBinary),
                    suggested_filename: "model.glb".into(),
                })
            })
        }
    }

    /// Holds each call until `release` is notified
    #[derive(Default)]
    struct GatedModeler {
        started: Notify,
        release: Notify,
    }

    impl ModelService for GatedModeler {
        fn generate<'a>(&'a self, image: &'a BinaryHandle) -> BoxFuture<'a, Result<GeneratedModel>> {
            Box::pin(async move {
                self.started.notify_one();
                self.release.notified().await;
                FixedModeler.generate(image).await
            })
        }
    }

    fn session(host: Arc<RecordingHost>) -> Session {
        Session::new(
            Arc::new(EchoEnhancer),
            Arc::new(FixedModeler),
            host,
            Handle::current(),
        )
    }

    async fn gated_session(host: Arc<RecordingHost>, modeler: Arc<GatedModeler>) -> Session {
        let mut session = Session::new(Arc::new(EchoEnhancer), modeler, host, Handle::current());
        session.start_camera(&MockCamera::default()).unwrap();
        session.capture().unwrap();
        session.enhance_task("marble".into()).await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_runs_progress_overlay() {
        let host = Arc::new(RecordingHost::default());
        let camera = MockCamera::default();
        let mut session = session(host.clone());

        session.start_camera(&camera).unwrap();
        session.capture().unwrap();
        session.enhance_task("marble".into()).await.unwrap();
        session.generate_task(Arc::new(NoRender)).await.unwrap();

        assert_eq!(host.overlays.lock().unwrap().len(), 1);
        assert!(session.controls().download);
        assert_eq!(session.registry().live_count(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(host.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_generate_leaves_running_overlay_alone() {
        let host = Arc::new(RecordingHost::default());
        let modeler = Arc::new(GatedModeler::default());
        let session = gated_session(host.clone(), modeler.clone()).await;

        let first = tokio::spawn(session.generate_task(Arc::new(NoRender)));
        modeler.started.notified().await;

        let second = session.generate_task(Arc::new(NoRender)).await;
        assert!(matches!(second, Err(Error::StageBusy(Stage::Generate3D))));
        assert_eq!(host.overlays.lock().unwrap().len(), 1);
        {
            let log = host.log(0);
            let log = log.lock().unwrap();
            assert_eq!(log.outcome, None);
            assert!(!log.removed);
        }

        modeler.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(host.log(0).lock().unwrap().outcome, Some(ProgressOutcome::Ready));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_generate_removes_overlay_without_outcome() {
        let host = Arc::new(RecordingHost::default());
        let modeler = Arc::new(GatedModeler::default());
        let mut session = gated_session(host.clone(), modeler.clone()).await;

        let first = tokio::spawn(session.generate_task(Arc::new(NoRender)));
        modeler.started.notified().await;
        session.capture().unwrap();

        modeler.release.notify_one();
        let result = first.await.unwrap();
        assert!(matches!(result, Err(Error::Superseded(Stage::Generate3D))));

        let log = host.log(0);
        let log = log.lock().unwrap();
        assert_eq!(log.outcome, None);
        assert!(log.removed);
    }

    #[tokio::test]
    async fn test_teardown_revokes_and_releases() {
        let host = Arc::new(RecordingHost::default());
        let camera = MockCamera::default();
        let mut session = session(host);

        session.start_camera(&camera).unwrap();
        session.capture().unwrap();
        session.enhance_task("marble".into()).await.unwrap();
        session.generate_task(Arc::new(NoRender)).await.unwrap();
        let registry = session.registry().clone();

        session.teardown();
        session.teardown();
        assert_eq!(registry.live_count(), 0);
        assert!(!session.camera_active());
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
        assert!(!session.controls().download);
    }

    #[tokio::test]
    async fn test_open_local_installs_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let session = session(Arc::new(RecordingHost::default()));
        let reference = session.open_local(&path).unwrap();
        assert_eq!(reference.suggested_filename, "cube.obj");
        assert_eq!(reference.handle.kind(), ContentKind::Obj);
        assert!(session.registry().is_live(&reference.public_url));
    }

    #[tokio::test]
    async fn test_dropping_session_releases_camera() {
        let camera = MockCamera::default();
        {
            let mut session = session(Arc::new(RecordingHost::default()));
            session.start_camera(&camera).unwrap();
        }
        assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
    }
}
