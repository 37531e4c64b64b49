//! The surface a viewer draws into

use std::sync::{Arc, Weak};

use winit::{dpi::PhysicalSize, window::Window};

use crate::gfx::engine::SurfaceSize;

/// Keeps a render loop registered with its container for as long as it lives
#[derive(Debug)]
pub struct RenderLoop {
    _alive: Arc<()>,
    frames: u64,
}

impl RenderLoop {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn tick(&mut self) {
        self.frames += 1;
    }
}

/// A window (or a headless stand-in) hosting at most one render loop.
///
/// The container tracks which render loops and resize handlers are attached
/// to it so callers can verify a new display replaced, rather than stacked
/// on, the previous one.
#[derive(Debug)]
pub struct Container {
    window: Option<Arc<Window>>,
    width: u32,
    render_loops: Vec<Weak<()>>,
    resize_handlers: Vec<u64>,
}

impl Container {
    pub fn for_window(window: Arc<Window>) -> Self {
        let width = window.inner_size().width;
        Self {
            window: Some(window),
            width,
            render_loops: Vec::new(),
            resize_handlers: Vec::new(),
        }
    }

    pub fn headless(width: u32) -> Self {
        Self {
            window: None,
            width,
            render_loops: Vec::new(),
            resize_handlers: Vec::new(),
        }
    }

    pub fn window(&self) -> Option<Arc<Window>> {
        self.window.clone()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::for_container_width(self.width)
    }

    /// Asks the window manager for the heuristic height
    pub fn fit_window(&self, size: SurfaceSize) {
        if let Some(window) = &self.window {
            let current = window.inner_size();
            if current.width != size.width || current.height != size.height {
                let _ = window.request_inner_size(PhysicalSize::new(size.width, size.height));
            }
        }
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    pub fn attach_render_loop(&mut self) -> RenderLoop {
        self.render_loops.retain(|token| token.strong_count() > 0);
        let alive = Arc::new(());
        self.render_loops.push(Arc::downgrade(&alive));
        RenderLoop {
            _alive: alive,
            frames: 0,
        }
    }

    /// Render loops attached and not yet dropped
    pub fn active_render_loops(&self) -> usize {
        self.render_loops
            .iter()
            .filter(|token| token.strong_count() > 0)
            .count()
    }

    /// Registers `owner`'s resize handler; `false` if it was already present
    pub fn register_resize_handler(&mut self, owner: u64) -> bool {
        if self.resize_handlers.contains(&owner) {
            return false;
        }
        self.resize_handlers.push(owner);
        true
    }

    pub fn has_resize_handler(&self, owner: u64) -> bool {
        self.resize_handlers.contains(&owner)
    }

    pub fn resize_handler_count(&self) -> usize {
        self.resize_handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_loop_is_not_counted() {
        let mut container = Container::headless(800);
        let first = container.attach_render_loop();
        assert_eq!(container.active_render_loops(), 1);
        drop(first);
        assert_eq!(container.active_render_loops(), 0);
    }

    #[test]
    fn test_resize_handler_registration_is_idempotent() {
        let mut container = Container::headless(800);
        assert!(container.register_resize_handler(7));
        assert!(!container.register_resize_handler(7));
        assert_eq!(container.resize_handler_count(), 1);
    }

    #[test]
    fn test_surface_size_uses_width_heuristic() {
        let container = Container::headless(1000);
        assert_eq!(container.surface_size(), SurfaceSize::new(1000, 750));
    }
}
