//! Elapsed-time overlay for long running stages
//!
//! A [`ProgressReporter`] owns at most one overlay at a time. The overlay text
//! is refreshed by a tokio task every [`TICK_INTERVAL`]; stopping the reporter
//! aborts that task, shows the outcome, and removes the overlay a little later
//! without waiting for it.

pub mod terminal;

use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

pub use terminal::TerminalOverlayHost;

pub const TICK_INTERVAL: Duration = Duration::from_millis(250);
pub const READY_LINGER: Duration = Duration::from_millis(900);
pub const FAILED_LINGER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Ready,
    Failed,
}

impl ProgressOutcome {
    pub fn label(self) -> &'static str {
        match self {
            ProgressOutcome::Ready => "ready",
            ProgressOutcome::Failed => "failed",
        }
    }

    fn linger(self) -> Duration {
        match self {
            ProgressOutcome::Ready => READY_LINGER,
            ProgressOutcome::Failed => FAILED_LINGER,
        }
    }
}

pub trait Overlay: Send + Sync {
    fn set_text(&self, text: &str);
    fn finish(&self, outcome: ProgressOutcome);
    fn remove(&self);
}

pub trait OverlayHost: Send + Sync {
    fn create(&self, label: &str) -> Arc<dyn Overlay>;
}

/// `mm:ss`, minutes keep counting past 59
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

struct ActiveOverlay {
    overlay: Arc<dyn Overlay>,
    ticker: JoinHandle<()>,
}

pub struct ProgressReporter {
    host: Arc<dyn OverlayHost>,
    runtime: Handle,
    active: Option<ActiveOverlay>,
}

impl ProgressReporter {
    pub fn new(host: Arc<dyn OverlayHost>, runtime: Handle) -> Self {
        Self {
            host,
            runtime,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, label: &str) {
        self.cancel();

        let overlay = self.host.create(label);
        overlay.set_text(&format_elapsed(Duration::ZERO));

        let started = Instant::now();
        let ticking = overlay.clone();
        let ticker = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                ticking.set_text(&format_elapsed(started.elapsed()));
            }
        });

        self.active = Some(ActiveOverlay { overlay, ticker });
    }

    /// Removes the overlay at once, showing no outcome
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            active.ticker.abort();
            active.overlay.remove();
        }
    }

    pub fn stop(&mut self, success: bool) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.ticker.abort();

        let outcome = if success {
            ProgressOutcome::Ready
        } else {
            ProgressOutcome::Failed
        };
        active.overlay.finish(outcome);

        let overlay = active.overlay;
        self.runtime.spawn(async move {
            tokio::time::sleep(outcome.linger()).await;
            overlay.remove();
        });
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.cancel();
    }
}
