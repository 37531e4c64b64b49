use std::{sync::Arc, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::{Overlay, OverlayHost, ProgressOutcome};

/// Draws each overlay as a spinner line on stderr
#[derive(Clone, Default)]
pub struct TerminalOverlayHost {
    bars: MultiProgress,
}

impl TerminalOverlayHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlayHost for TerminalOverlayHost {
    fn create(&self, label: &str) -> Arc<dyn Overlay> {
        let bar = self.bars.add(ProgressBar::new_spinner());
        let style = ProgressStyle::with_template("{spinner:.green} {prefix} [{msg}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_prefix(label.to_owned());
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(TerminalOverlay {
            bar,
            bars: self.bars.clone(),
        })
    }
}

struct TerminalOverlay {
    bar: ProgressBar,
    bars: MultiProgress,
}

impl Overlay for TerminalOverlay {
    fn set_text(&self, text: &str) {
        self.bar.set_message(text.to_owned());
    }

    fn finish(&self, outcome: ProgressOutcome) {
        self.bar.finish_with_message(outcome.label());
    }

    fn remove(&self) {
        self.bar.finish_and_clear();
        self.bars.remove(&self.bar);
    }
}
