//! Generation pipeline
//!
//! capture -> enhance -> 3D-generate -> render, one stage feeding the next.
//! Shared state lives in a [`PipelineContext`]; the stages themselves are run
//! by a [`GenerationPipeline`] which holds the remote services and the
//! per-stage in-flight guards.

pub mod context;
pub mod generation;
pub mod guard;

use std::fmt;

use crate::{
    assets::{AssetReference, BinaryHandle},
    error::Result,
};

pub use context::PipelineContext;
pub use generation::{Controls, GenerationPipeline};
pub use guard::StageGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Capture,
    Enhance,
    Generate3D,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Capture => "Capture",
            Stage::Enhance => "Enhancement",
            Stage::Generate3D => "3D generation",
            Stage::Render => "Rendering",
        })
    }
}

/// Outcome of the latest invocation of a stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageResult {
    #[default]
    Idle,
    Pending,
    Succeeded(BinaryHandle),
    Failed(String),
}

impl StageResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, StageResult::Pending)
    }

    /// Short status line for the window title or terminal
    pub fn status(&self, stage: Stage) -> String {
        match self {
            StageResult::Idle => format!("{stage}: idle"),
            StageResult::Pending => format!("{stage}: working"),
            StageResult::Succeeded(handle) => format!("{stage}: done ({} bytes)", handle.len()),
            StageResult::Failed(reason) => reason.clone(),
        }
    }
}

/// Receives a freshly installed asset for display
pub trait RenderHandoff: Send + Sync {
    fn render(&self, reference: &AssetReference) -> Result<()>;
}

/// Handoff used when nothing should be displayed
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRender;

impl RenderHandoff for NoRender {
    fn render(&self, reference: &AssetReference) -> Result<()> {
        log::debug!("Not rendering {}", reference.public_url);
        Ok(())
    }
}
