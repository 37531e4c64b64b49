use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// Damping applied when none is configured
pub const DEFAULT_DAMPING: f32 = 0.08;

/// Below this a pending delta is considered settled
const SETTLE_EPSILON: f32 = 1e-5;

/// Orbit / zoom / pan navigation with damped motion.
///
/// Input only accumulates pending deltas. [`OrbitControls::update`] must run
/// once per rendered frame: it applies `damping_factor` of every pending delta
/// to the camera and keeps the rest for the following frames, which gives the
/// eased-out feel after the mouse is released.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    damping_factor: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
    pending_pan: (f32, f32),
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl OrbitControls {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            damping_factor: DEFAULT_DAMPING,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
            pending_pan: (0.0, 0.0),
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    /// Sets the damping factor, kept inside (0, 1] so motion always settles
    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.damping_factor = damping_factor.clamp(0.01, 1.0);
        self
    }

    pub fn damping_factor(&self) -> f32 {
        self.damping_factor
    }

    /// Mouse buttons and wheel arrive as window events
    pub fn process_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / 40.0
                    }
                };
                self.pending_zoom += scroll_amount * self.zoom_speed;
            }
            WindowEvent::Focused(false) => {
                self.is_mouse_pressed = false;
                self.is_shift_held = false;
            }
            _ => (),
        }
    }

    /// Raw mouse motion arrives as device events
    pub fn process_events(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if !self.is_mouse_pressed {
                return;
            }
            if self.is_shift_held {
                // SHIFT + DRAG = PAN (move focus point)
                self.pending_pan.0 += -delta.0 as f32 * self.pan_speed;
                self.pending_pan.1 += delta.1 as f32 * self.pan_speed;
            } else {
                // NORMAL DRAG = ROTATE (orbit around focus)
                self.pending_yaw += -delta.0 as f32 * self.rotate_speed;
                self.pending_pitch += delta.1 as f32 * self.rotate_speed;
            }
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight) = event.physical_key {
            self.is_shift_held = event.state == ElementState::Pressed;
        }
    }

    /// Queues a rotation as if the user dragged by `(dx, dy)` pixels
    pub fn queue_rotate(&mut self, dx: f32, dy: f32) {
        self.pending_yaw += -dx * self.rotate_speed;
        self.pending_pitch += dy * self.rotate_speed;
    }

    /// Queues a zoom as if the wheel moved by `lines`
    pub fn queue_zoom(&mut self, lines: f32) {
        self.pending_zoom += -lines * self.zoom_speed;
    }

    /// Applies one frame of damped motion to the camera
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        let step = self.damping_factor;

        if self.pending_yaw != 0.0 {
            camera.add_yaw(self.pending_yaw * step);
        }
        if self.pending_pitch != 0.0 {
            camera.add_pitch(self.pending_pitch * step);
        }
        if self.pending_zoom != 0.0 {
            camera.add_distance(self.pending_zoom * step);
        }
        if self.pending_pan != (0.0, 0.0) {
            camera.pan((self.pending_pan.0 * step, self.pending_pan.1 * step));
        }

        let keep = 1.0 - step;
        self.pending_yaw = settle(self.pending_yaw * keep);
        self.pending_pitch = settle(self.pending_pitch * keep);
        self.pending_zoom = settle(self.pending_zoom * keep);
        self.pending_pan = (
            settle(self.pending_pan.0 * keep),
            settle(self.pending_pan.1 * keep),
        );
    }

    /// Drops any pending motion and returns `camera` to its framing
    pub fn reset(&mut self, camera: &mut OrbitCamera) {
        log::debug!("Resetting camera to the normalized framing");
        self.stop_motion();
        camera.reset_to_default();
    }

    /// True while damped motion is still being applied
    pub fn is_moving(&self) -> bool {
        self.pending_yaw != 0.0
            || self.pending_pitch != 0.0
            || self.pending_zoom != 0.0
            || self.pending_pan != (0.0, 0.0)
    }

    fn stop_motion(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_zoom = 0.0;
        self.pending_pan = (0.0, 0.0);
    }

    pub fn is_panning(&self) -> bool {
        self.is_mouse_pressed && self.is_shift_held
    }

    pub fn is_rotating(&self) -> bool {
        self.is_mouse_pressed && !self.is_shift_held
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(0.005, 0.1)
    }
}

fn settle(value: f32) -> f32 {
    if value.abs() < SETTLE_EPSILON {
        0.0
    } else {
        value
    }
}
