//! Global uniform bindings for camera, model and lighting data
//!
//! One uniform buffer bound at group 0 holds everything the viewer shader
//! needs per frame: the camera, the normalization transform of the current
//! scene and the two scene lights.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    gfx::{camera::camera_utils::CameraUniform, engine::Light},
    wgpu_utils::{uniform_entry, UniformBuffer},
};

/// Global uniform buffer content.
///
/// MUST match the `Globals` struct in `shader.wgsl` exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    // xyz towards the light, w unused
    light_direction: [f32; 4],
    // rgb, a = intensity
    light_color: [f32; 4],
    ambient_color: [f32; 4],
    base_color: [f32; 4],
}
// Total: 16 + 64 + 64 + 4 * 16 = 208 bytes

/// Surface colour of untextured assets
const BASE_COLOR: [f32; 4] = [0.8, 0.8, 0.82, 1.0];

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Folds the installed lights into the uniform layout. The first directional
/// light wins; ambient contributions add up.
pub fn pack_lights(lights: &[Light]) -> ([f32; 4], [f32; 4], [f32; 4]) {
    let mut direction = [0.0, 1.0, 0.0, 0.0];
    let mut color = [0.0; 4];
    let mut ambient = [0.0, 0.0, 0.0, 1.0];
    let mut have_directional = false;

    for light in lights {
        match *light {
            Light::Directional {
                direction: d,
                color: c,
                intensity,
            } if !have_directional => {
                direction = [d[0], d[1], d[2], 0.0];
                color = [c[0], c[1], c[2], intensity];
                have_directional = true;
            }
            Light::Directional { .. } => {
                log::debug!("Ignoring additional directional light");
            }
            Light::Ambient { color: c, intensity } => {
                for i in 0..3 {
                    ambient[i] += c[i] * intensity;
                }
            }
        }
    }

    (direction, color, ambient)
}

pub fn global_content(
    camera: &CameraUniform,
    model: Matrix4<f32>,
    lights: &[Light],
) -> GlobalUBOContent {
    let (light_direction, light_color, ambient_color) = pack_lights(lights);
    GlobalUBOContent {
        view_position: camera.view_position,
        view_proj: camera.view_proj,
        model: model.into(),
        light_direction,
        light_color,
        ambient_color,
        base_color: BASE_COLOR,
    }
}

/// Updates the global uniform buffer for the next frame
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: &CameraUniform,
    model: Option<Matrix4<f32>>,
    lights: &[Light],
) {
    let content = global_content(camera, model.unwrap_or_else(Matrix4::identity), lights);
    ubo.update_content(queue, content);
}

/// Bind group layout and bind group for the global uniforms (slot 0)
pub struct GlobalBindings {
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        GlobalBindings { layout, bind_group }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ubo_layout_size() {
        assert_eq!(std::mem::size_of::<GlobalUBOContent>(), 208);
    }

    #[test]
    fn test_pack_key_and_fill_lights() {
        let (direction, color, ambient) = pack_lights(&[Light::key(), Light::fill()]);
        assert_relative_eq!(direction[1], 1.0);
        assert_relative_eq!(color[3], 0.9);
        assert_relative_eq!(ambient[0], 0.35);
    }

    #[test]
    fn test_ambient_contributions_add_up() {
        let fill = Light::Ambient {
            color: [1.0, 0.5, 0.0],
            intensity: 0.5,
        };
        let (_, color, ambient) = pack_lights(&[fill, fill]);
        assert_relative_eq!(ambient[0], 1.0);
        assert_relative_eq!(ambient[1], 0.5);
        // no directional light installed
        assert_relative_eq!(color[3], 0.0);
    }
}
