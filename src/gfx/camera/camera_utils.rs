use cgmath::{Matrix4, SquareMatrix};
use winit::event::{DeviceEvent, KeyEvent};

use super::{orbit_camera::OrbitCamera, orbit_controls::OrbitControls};

/// A camera together with the navigation controller driving it
pub struct CameraManager {
    pub camera: OrbitCamera,
    pub controls: OrbitControls,
}

impl CameraManager {
    pub fn new(camera: OrbitCamera, controls: OrbitControls) -> Self {
        Self { camera, controls }
    }

    pub fn process_event(&mut self, event: &DeviceEvent) {
        self.controls.process_events(event);
    }

    pub fn process_keyboard_event(&mut self, event: &KeyEvent) {
        self.controls.process_keyed_events(event);
    }

    /// Advances damping by one frame and refreshes the uniform
    pub fn update(&mut self) {
        self.controls.update(&mut self.camera);
        self.camera.update_view_proj();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize_projection(width, height);
    }
}

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// The eye position of the camera in homogenous coordinates.
    ///
    /// Homogenous coordinates are used to fullfill the 16 byte alignment requirement.
    pub view_position: [f32; 4],

    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: convert_matrix4_to_array(Matrix4::identity()),
        }
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}
