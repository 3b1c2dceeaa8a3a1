//! Mesh nodes and the vertex data they are built from.
//!
//! A [`Mesh`] pairs immutable [`VertexData`] (produced by
//! [`MeshBuilder`](crate::mesh_builder::MeshBuilder)) with a mutable transform.
//! Only the transform is public; geometry is fixed once the mesh exists.

use cgmath::Vector3;

use crate::{data_structures::instance::Instance, mesh_builder::Shape, scene::NodeId};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl ModelVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
            normal,
        }
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// How the indices of a [`VertexData`] are assembled into primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    LineStrip,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl VertexData {
    pub fn new(topology: Topology) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Axis aligned bounds of all vertex positions, `None` if there are no vertices.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(mut min, mut max), v| {
            for axis in 0..3 {
                min[axis] = min[axis].min(v.position[axis]);
                max[axis] = max[axis].max(v.position[axis]);
            }
            (min, max)
        }))
    }
}

/// A mesh node: fixed geometry plus position, rotation (Euler angles in radians,
/// applied yaw/pitch/roll) and scaling.
#[derive(Clone, Debug)]
pub struct Mesh {
    id: NodeId,
    name: String,
    shape: Shape,
    geometry: VertexData,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scaling: Vector3<f32>,
}

impl Mesh {
    pub(crate) fn new(id: NodeId, name: &str, shape: Shape, geometry: VertexData) -> Self {
        Self {
            id,
            name: name.to_string(),
            shape,
            geometry,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scaling: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameters this mesh was built with.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn geometry(&self) -> &VertexData {
        &self.geometry
    }

    pub fn instance(&self) -> Instance {
        Instance::from_euler(self.position, self.rotation, self.scaling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_vertices() {
        let mut data = VertexData::new(Topology::LineStrip);
        assert_eq!(data.bounds(), None);
        data.vertices.push(ModelVertex::new([0.0, 1.0, -2.0], [0.0; 3], [0.0; 2]));
        data.vertices.push(ModelVertex::new([3.0, -1.0, 0.5], [0.0; 3], [0.0; 2]));
        assert_eq!(data.bounds(), Some(([0.0, -1.0, -2.0], [3.0, 1.0, 0.5])));
    }

    #[test]
    fn vertex_layout_matches_struct_size() {
        let layout = ModelVertex::desc();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
    }
}
