//! Shared pipeline state
//!
//! Both mutexes are only ever held for short, synchronous sections and never
//! across an `.await`. When both are needed, `state` is locked before
//! `assets`.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Stage, StageResult};
use crate::{
    assets::{download, AssetReference, AssetSlot, BinaryHandle, ObjectUrlRegistry},
    error::{Error, Result},
};

#[derive(Debug, Default)]
pub(crate) struct PipelineState {
    pub captured: Option<BinaryHandle>,
    pub enhanced: Option<BinaryHandle>,
    /// Bumped by every capture and every committed enhancement
    pub cycle: u64,
    pub enhance: StageResult,
    pub generate: StageResult,
    pub render: StageResult,
}

impl PipelineState {
    pub fn result_mut(&mut self, stage: Stage) -> Option<&mut StageResult> {
        match stage {
            Stage::Enhance => Some(&mut self.enhance),
            Stage::Generate3D => Some(&mut self.generate),
            Stage::Render => Some(&mut self.render),
            Stage::Capture => None,
        }
    }
}

pub struct PipelineContext {
    state: Mutex<PipelineState>,
    assets: Mutex<AssetSlot>,
}

impl PipelineContext {
    pub fn new(registry: Arc<ObjectUrlRegistry>) -> Self {
        Self {
            state: Mutex::new(PipelineState::default()),
            assets: Mutex::new(AssetSlot::new(registry)),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn assets(&self) -> MutexGuard<'_, AssetSlot> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn captured(&self) -> Option<BinaryHandle> {
        self.state().captured.clone()
    }

    pub fn enhanced(&self) -> Option<BinaryHandle> {
        self.state().enhanced.clone()
    }

    pub fn cycle(&self) -> u64 {
        self.state().cycle
    }

    pub fn stage_result(&self, stage: Stage) -> StageResult {
        let mut state = self.state();
        match stage {
            Stage::Capture => state
                .captured
                .clone()
                .map_or(StageResult::Idle, StageResult::Succeeded),
            other => state.result_mut(other).cloned().unwrap_or_default(),
        }
    }

    /// Records a failure unless a newer cycle has started meanwhile
    pub(crate) fn record_failure(&self, stage: Stage, cycle: u64, error: &Error) {
        if matches!(error, Error::Superseded(_) | Error::StageBusy(_)) {
            return;
        }
        let mut state = self.state();
        if state.cycle != cycle {
            return;
        }
        if let Some(result) = state.result_mut(stage) {
            *result = StageResult::Failed(error.to_string());
        }
    }

    /// Outcome of displaying the installed asset, reported by whoever renders it
    pub fn record_render(&self, outcome: &Result<()>) {
        let mut state = self.state();
        state.render = match outcome {
            Ok(()) => match self.current_asset() {
                Some(reference) => StageResult::Succeeded(reference.handle),
                None => StageResult::Idle,
            },
            Err(e) => StageResult::Failed(e.to_string()),
        };
    }

    pub fn current_asset(&self) -> Option<AssetReference> {
        self.assets().current().cloned()
    }

    pub fn can_download(&self) -> bool {
        self.assets().can_download()
    }

    pub fn save_current(&self, dir: &Path) -> Result<PathBuf> {
        download::save_current(&self.assets(), dir)
    }

    /// Revokes the installed reference and forgets every intermediate image
    pub fn clear(&self) {
        let mut state = self.state();
        let next_cycle = state.cycle + 1;
        *state = PipelineState {
            cycle: next_cycle,
            ..Default::default()
        };
        self.assets().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ContentKind;

    fn handle(byte: u8) -> BinaryHandle {
        BinaryHandle::new(vec![byte], ContentKind::GltfBinary)
    }

    #[test]
    fn test_stale_failure_is_not_recorded() {
        let ctx = PipelineContext::new(ObjectUrlRegistry::new());
        let cycle = ctx.cycle();
        ctx.state().cycle += 1;

        ctx.record_failure(Stage::Enhance, cycle, &Error::NoImageReturned);
        assert_eq!(ctx.stage_result(Stage::Enhance), StageResult::Idle);

        ctx.record_failure(Stage::Enhance, cycle + 1, &Error::NoImageReturned);
        assert!(matches!(ctx.stage_result(Stage::Enhance), StageResult::Failed(_)));
    }

    #[test]
    fn test_clear_revokes_installed_asset() {
        let registry = ObjectUrlRegistry::new();
        let ctx = PipelineContext::new(registry.clone());
        ctx.assets().install(handle(1), "a.glb");
        assert_eq!(registry.live_count(), 1);

        ctx.clear();
        assert_eq!(registry.live_count(), 0);
        assert!(!ctx.can_download());
    }

    #[test]
    fn test_render_outcome_is_recorded() {
        let ctx = PipelineContext::new(ObjectUrlRegistry::new());
        ctx.assets().install(handle(2), "b.glb");

        ctx.record_render(&Ok(()));
        assert!(matches!(ctx.stage_result(Stage::Render), StageResult::Succeeded(_)));

        ctx.record_render(&Err(Error::AssetHasNoScene));
        assert_eq!(
            ctx.stage_result(Stage::Render),
            StageResult::Failed("Asset has no displayable scene".into())
        );
    }
}
