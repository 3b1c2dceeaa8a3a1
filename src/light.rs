//! Scene lights and the uniform buffer that carries them to the shaders.
//!
//! Two kinds are supported: a [`HemisphericLight`] that blends between a sky
//! and a ground colour depending on how much a surface faces its direction, and
//! an omnidirectional [`PointLight`]. Both start out white with intensity 1.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::scene::{NodeId, Scene};

/// Maximum number of lights the shaders evaluate per fragment.
pub const MAX_LIGHTS: usize = 4;

const KIND_POINT: f32 = 0.0;
const KIND_HEMISPHERIC: f32 = 1.0;

/// Common interface of all light kinds.
pub trait LightSource {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    fn intensity(&self) -> f32;

    /// Pack the light for the GPU.
    fn to_raw(&self) -> LightRaw;
}

#[derive(Clone, Debug)]
pub struct HemisphericLight {
    id: NodeId,
    name: String,
    /// Points towards the sky.
    pub direction: Vector3<f32>,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

impl HemisphericLight {
    pub fn create<'s>(
        name: &str,
        direction: Vector3<f32>,
        scene: &'s mut Scene,
    ) -> &'s mut HemisphericLight {
        scene.add_hemispheric_light(|id| HemisphericLight {
            id,
            name: name.to_string(),
            direction,
            diffuse: [1.0; 3],
            specular: [1.0; 3],
            ground_color: [0.0; 3],
            intensity: 1.0,
        })
    }
}

impl LightSource for HemisphericLight {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn intensity(&self) -> f32 {
        self.intensity
    }

    fn to_raw(&self) -> LightRaw {
        let direction = if self.direction.magnitude2() > 0.0 {
            self.direction.normalize()
        } else {
            Vector3::unit_y()
        };
        LightRaw {
            vector: [direction.x, direction.y, direction.z, KIND_HEMISPHERIC],
            diffuse: rgb_a(self.diffuse, self.intensity),
            specular: rgb_a(self.specular, 0.0),
            ground: rgb_a(self.ground_color, 0.0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PointLight {
    id: NodeId,
    name: String,
    pub position: Vector3<f32>,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub intensity: f32,
}

impl PointLight {
    pub fn create<'s>(
        name: &str,
        position: Vector3<f32>,
        scene: &'s mut Scene,
    ) -> &'s mut PointLight {
        scene.add_point_light(|id| PointLight {
            id,
            name: name.to_string(),
            position,
            diffuse: [1.0; 3],
            specular: [1.0; 3],
            intensity: 1.0,
        })
    }
}

impl LightSource for PointLight {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn intensity(&self) -> f32 {
        self.intensity
    }

    fn to_raw(&self) -> LightRaw {
        LightRaw {
            vector: [self.position.x, self.position.y, self.position.z, KIND_POINT],
            diffuse: rgb_a(self.diffuse, self.intensity),
            specular: rgb_a(self.specular, 0.0),
            ground: [0.0; 4],
        }
    }
}

fn rgb_a(rgb: [f32; 3], a: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], a]
}

/// One light as seen by the shader.
///
/// `vector.w` selects the kind, `diffuse.a` holds the intensity.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    vector: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    ground: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    items: [LightRaw; MAX_LIGHTS],
    // only x is read; uniforms need 16 byte alignment
    count: [u32; 4],
}

impl LightsUniform {
    pub fn from_lights<'a>(lights: impl Iterator<Item = &'a dyn LightSource>) -> Self {
        let mut uniform: LightsUniform = bytemuck::Zeroable::zeroed();
        let mut count = 0;
        for light in lights {
            if count == MAX_LIGHTS {
                log::warn!("only {} lights are supported, ignoring {}", MAX_LIGHTS, light.name());
                continue;
            }
            uniform.items[count] = light.to_raw();
            count += 1;
        }
        uniform.count[0] = count as u32;
        uniform
    }

    pub fn count(&self) -> u32 {
        self.count[0]
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightsUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform: LightsUniform = bytemuck::Zeroable::zeroed();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("light_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, scene: &Scene) {
        self.uniform = LightsUniform::from_lights(scene.lights());
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lights_start_with_library_defaults() {
        let mut scene = Scene::new();
        let hemi = HemisphericLight::create("light1", Vector3::new(1.0, 1.0, 0.0), &mut scene);
        assert_eq!(hemi.intensity, 1.0);
        assert_eq!(hemi.diffuse, [1.0; 3]);
        assert_eq!(hemi.ground_color, [0.0; 3]);
        let point = PointLight::create("light2", Vector3::new(0.0, 1.0, -1.0), &mut scene);
        assert_eq!(point.intensity, 1.0);
        assert_eq!(point.specular, [1.0; 3]);
    }

    #[test]
    fn hemispheric_direction_is_normalized_for_the_gpu() {
        let mut scene = Scene::new();
        let raw = HemisphericLight::create("sky", Vector3::new(1.0, 1.0, 0.0), &mut scene).to_raw();
        let h = std::f32::consts::FRAC_1_SQRT_2;
        assert!((raw.vector[0] - h).abs() < 1e-6);
        assert!((raw.vector[1] - h).abs() < 1e-6);
        assert_eq!(raw.vector[3], KIND_HEMISPHERIC);
        assert_eq!(raw.diffuse[3], 1.0);
    }

    #[test]
    fn point_light_keeps_its_position() {
        let mut scene = Scene::new();
        let raw = PointLight::create("bulb", Vector3::new(0.0, 1.0, -1.0), &mut scene).to_raw();
        assert_eq!(raw.vector, [0.0, 1.0, -1.0, KIND_POINT]);
    }

    #[test]
    fn uniform_packs_at_most_four_lights() {
        let mut scene = Scene::new();
        for i in 0..6 {
            PointLight::create(&format!("bulb{i}"), Vector3::new(i as f32, 0.0, 0.0), &mut scene);
        }
        let uniform = LightsUniform::from_lights(scene.lights());
        assert_eq!(uniform.count(), MAX_LIGHTS as u32);
        assert_eq!(uniform.items[3].vector[0], 3.0);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 4 * 64 + 16);
    }
}
