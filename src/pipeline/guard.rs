//! Per-stage in-flight guard

use std::sync::atomic::{AtomicBool, Ordering};

use super::Stage;
use crate::error::{Error, Result};

/// Marks a stage as in flight for as long as the guard lives. Dropping it, on
/// any exit path, clears the flag again.
#[derive(Debug)]
pub struct StageGuard<'a> {
    stage: Stage,
    flag: &'a AtomicBool,
}

impl<'a> StageGuard<'a> {
    /// Fails with `StageBusy` while another guard holds the same flag
    pub fn try_acquire(stage: Stage, flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::StageBusy(stage))?;
        Ok(Self { stage, flag })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_guard_is_rejected_until_first_drops() {
        let flag = AtomicBool::new(false);
        let first = StageGuard::try_acquire(Stage::Enhance, &flag).unwrap();
        assert!(matches!(
            StageGuard::try_acquire(Stage::Enhance, &flag),
            Err(Error::StageBusy(Stage::Enhance))
        ));

        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(StageGuard::try_acquire(Stage::Enhance, &flag).is_ok());
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn failing_stage(flag: &AtomicBool) -> Result<()> {
            let _guard = StageGuard::try_acquire(Stage::Generate3D, flag)?;
            Err(Error::NoImageReturned)
        }

        let flag = AtomicBool::new(false);
        assert!(failing_stage(&flag).is_err());
        assert!(!flag.load(Ordering::Acquire));
    }
}
