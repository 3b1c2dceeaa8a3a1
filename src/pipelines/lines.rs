use crate::{
    data_structures::{instance::InstanceRaw, mesh::{ModelVertex, Vertex}},
    pipelines::{Targets, mk_render_pipeline},
};

/// Unlit line strip pipeline. Strips are indexed, so the strip index format is fixed to u32.
pub fn mk_lines_pipeline(
    device: &wgpu::Device,
    targets: Targets,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lines Pipeline Layout"),
        bind_group_layouts: &[Some(camera_bind_group_layout)],
        ..Default::default()
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lines Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("lines.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "Lines Pipeline",
        &layout,
        targets,
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineStrip,
            strip_index_format: Some(wgpu::IndexFormat::Uint32),
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
