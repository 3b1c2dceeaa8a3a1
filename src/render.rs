//! Turning a [`Scene`] into draw calls.
//!
//! [`SceneRenderer`] owns everything on the GPU that depends on scene contents:
//! one vertex/index/instance buffer triple per mesh, the camera and light
//! uniforms and the two pipelines. Geometry is uploaded the first time a mesh is
//! seen; only the instance transforms and uniforms are rewritten each frame.

use std::collections::BTreeMap;

use wgpu::util::DeviceExt;

use crate::{
    camera::CameraResources,
    data_structures::mesh::{Mesh, Topology},
    light::LightResources,
    pipelines::{Targets, basic::mk_basic_pipeline, lines::mk_lines_pipeline},
    scene::{NodeId, Scene},
};

/// GPU buffers of one mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub instance_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub topology: Topology,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let geometry = mesh.geometry();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name())),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name())),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", mesh.name())),
            contents: bytemuck::cast_slice(&[mesh.instance().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            vertex_buffer,
            index_buffer,
            instance_buffer,
            index_count: geometry.index_count() as u32,
            topology: geometry.topology,
        }
    }

    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[derive(Debug)]
pub struct SceneRenderer {
    scene_id: Option<u32>,
    meshes: BTreeMap<NodeId, GpuMesh>,
    camera: CameraResources,
    lights: LightResources,
    basic: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    has_camera: bool,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, targets: Targets) -> Self {
        let camera = CameraResources::new(device);
        let lights = LightResources::new(device);
        let basic = mk_basic_pipeline(
            device,
            targets,
            &camera.bind_group_layout,
            &lights.bind_group_layout,
        );
        let lines = mk_lines_pipeline(device, targets, &camera.bind_group_layout);
        Self {
            scene_id: None,
            meshes: BTreeMap::new(),
            camera,
            lights,
            basic,
            lines,
            has_camera: false,
        }
    }

    /// Upload new geometry and write this frame's uniforms.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        aspect: f32,
    ) {
        if self.scene_id != Some(scene.id()) {
            log::debug!("switching renderer to scene {}", scene.id());
            self.meshes.clear();
            self.scene_id = Some(scene.id());
        }
        self.meshes.retain(|id, _| scene.mesh(*id).is_some());

        for mesh in scene.meshes() {
            match self.meshes.get(&mesh.id()) {
                Some(gpu) => {
                    queue.write_buffer(
                        &gpu.instance_buffer,
                        0,
                        bytemuck::cast_slice(&[mesh.instance().to_raw()]),
                    );
                }
                None => {
                    log::debug!("uploading mesh {}", mesh.name());
                    self.meshes.insert(mesh.id(), GpuMesh::upload(device, mesh));
                }
            }
        }

        match scene.active_camera() {
            Some(camera) => {
                self.camera.write(queue, camera, aspect);
                self.has_camera = true;
            }
            None => {
                if self.has_camera {
                    log::warn!("scene {} lost its active camera, only clearing", scene.id());
                }
                self.has_camera = false;
            }
        }
        self.lights.write(queue, scene);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if !self.has_camera {
            return;
        }
        let drawable = |topology: Topology| {
            self.meshes
                .values()
                .filter(move |gpu| gpu.topology == topology && gpu.index_count > 0)
        };

        render_pass.set_pipeline(&self.basic);
        render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &self.lights.bind_group, &[]);
        for gpu in drawable(Topology::Triangles) {
            gpu.draw(render_pass);
        }

        render_pass.set_pipeline(&self.lines);
        render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
        for gpu in drawable(Topology::LineStrip) {
            gpu.draw(render_pass);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
