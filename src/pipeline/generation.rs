//! Stage execution
//!
//! Each remote stage takes its [`StageGuard`] for the whole call, snapshots
//! its input and the current cycle under the state lock, awaits the service
//! without holding any lock, then commits only if no newer capture or
//! enhancement happened meanwhile. Stale results are dropped with
//! `Superseded`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::{guard::StageGuard, PipelineContext, RenderHandoff, Stage, StageResult};
use crate::{
    assets::{AssetReference, BinaryHandle},
    capture::CaptureSession,
    error::{Error, Result},
    remote::{EnhanceService, ModelService},
};

/// Which user controls are currently enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub capture: bool,
    pub enhance: bool,
    pub generate: bool,
    pub download: bool,
}

pub struct GenerationPipeline {
    enhancer: Arc<dyn EnhanceService>,
    modeler: Arc<dyn ModelService>,
    enhance_in_flight: AtomicBool,
    generate_in_flight: AtomicBool,
}

impl GenerationPipeline {
    pub fn new(enhancer: Arc<dyn EnhanceService>, modeler: Arc<dyn ModelService>) -> Self {
        Self {
            enhancer,
            modeler,
            enhance_in_flight: AtomicBool::new(false),
            generate_in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self, stage: Stage) -> bool {
        match stage {
            Stage::Enhance => self.enhance_in_flight.load(Ordering::Acquire),
            Stage::Generate3D => self.generate_in_flight.load(Ordering::Acquire),
            Stage::Capture | Stage::Render => false,
        }
    }

    /// Marks `stage` as in flight until the returned guard drops
    pub fn begin(&self, stage: Stage) -> Result<StageGuard<'_>> {
        match stage {
            Stage::Enhance => StageGuard::try_acquire(stage, &self.enhance_in_flight),
            Stage::Generate3D => StageGuard::try_acquire(stage, &self.generate_in_flight),
            Stage::Capture | Stage::Render => Err(Error::Config(format!(
                "{stage} has no in-flight guard"
            ))),
        }
    }

    pub fn controls(&self, ctx: &PipelineContext, session: &CaptureSession) -> Controls {
        let (captured, enhanced) = {
            let state = ctx.state();
            (state.captured.is_some(), state.enhanced.is_some())
        };
        Controls {
            capture: session.is_active(),
            enhance: captured && !self.is_busy(Stage::Enhance),
            generate: enhanced && !self.is_busy(Stage::Generate3D),
            download: ctx.can_download(),
        }
    }

    /// Grabs a frame from the active device and starts a new cycle
    pub fn capture(
        &self,
        session: &mut CaptureSession,
        ctx: &PipelineContext,
    ) -> Result<BinaryHandle> {
        let frame = session.capture_frame()?;

        let mut state = ctx.state();
        state.captured = Some(frame.clone());
        state.enhanced = None;
        state.cycle += 1;
        state.enhance = StageResult::Idle;
        state.generate = StageResult::Idle;

        log::info!("Captured frame ({} bytes), cycle {}", frame.len(), state.cycle);
        Ok(frame)
    }

    /// Sends the captured frame and `instruction` to the enhancement service
    pub async fn enhance(&self, ctx: &PipelineContext, instruction: &str) -> Result<BinaryHandle> {
        let _guard = self.begin(Stage::Enhance)?;
        let cycle = ctx.cycle();

        let result = self.run_enhance(ctx, instruction).await;
        if let Err(e) = &result {
            log::warn!("{} failed: {}", Stage::Enhance, e);
            ctx.record_failure(Stage::Enhance, cycle, e);
        }
        result
    }

    async fn run_enhance(&self, ctx: &PipelineContext, instruction: &str) -> Result<BinaryHandle> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(Error::MissingInput("enhancement instruction"));
        }

        let (image, cycle) = {
            let mut state = ctx.state();
            let image = state
                .captured
                .clone()
                .ok_or(Error::MissingInput("captured image"))?;
            state.enhance = StageResult::Pending;
            (image, state.cycle)
        };

        log::info!("Enhancing {} byte capture", image.len());
        let enhanced = self.enhancer.enhance(&image, instruction).await?;

        let mut state = ctx.state();
        if state.cycle != cycle {
            log::info!("Discarding enhancement of cycle {}", cycle);
            return Err(Error::Superseded(Stage::Enhance));
        }
        state.captured = None;
        state.enhanced = Some(enhanced.clone());
        state.cycle += 1;
        state.enhance = StageResult::Succeeded(enhanced.clone());
        state.generate = StageResult::Idle;
        Ok(enhanced)
    }

    /// Turns the enhanced image into a model, installs it and hands it to
    /// `handoff` for display
    pub async fn generate(
        &self,
        ctx: &PipelineContext,
        handoff: &dyn RenderHandoff,
    ) -> Result<AssetReference> {
        let guard = self.begin(Stage::Generate3D)?;
        self.generate_with(&guard, ctx, handoff).await
    }

    /// [`Self::generate`] for a caller that already holds the stage guard
    pub async fn generate_with(
        &self,
        guard: &StageGuard<'_>,
        ctx: &PipelineContext,
        handoff: &dyn RenderHandoff,
    ) -> Result<AssetReference> {
        debug_assert_eq!(guard.stage(), Stage::Generate3D);
        let cycle = ctx.cycle();

        let reference = match self.run_generate(ctx).await {
            Ok(reference) => reference,
            Err(e) => {
                log::warn!("{} failed: {}", Stage::Generate3D, e);
                ctx.record_failure(Stage::Generate3D, cycle, &e);
                return Err(e);
            }
        };

        ctx.state().render = StageResult::Pending;
        if let Err(e) = handoff.render(&reference) {
            log::warn!("{} failed: {}", Stage::Render, e);
            ctx.record_render(&Err(e));
        }
        Ok(reference)
    }

    async fn run_generate(&self, ctx: &PipelineContext) -> Result<AssetReference> {
        let (image, cycle) = {
            let mut state = ctx.state();
            let image = state
                .enhanced
                .clone()
                .ok_or(Error::MissingInput("enhanced image"))?;
            state.generate = StageResult::Pending;
            (image, state.cycle)
        };

        log::info!("Generating model from {} byte image", image.len());
        let model = self.modeler.generate(&image).await?;

        let mut state = ctx.state();
        if state.cycle != cycle {
            log::info!("Discarding model of cycle {}", cycle);
            return Err(Error::Superseded(Stage::Generate3D));
        }
        state.generate = StageResult::Succeeded(model.handle.clone());
        let reference = ctx
            .assets()
            .install(model.handle, &model.suggested_filename);
        Ok(reference)
    }
}
