//! Render targets owned by the engine.
//!
//! [`Texture`] wraps a GPU texture with its default view. The engine keeps one
//! depth(-stencil) target, an optional multisampled colour target and an
//! optional persistent colour target that survives between frames.

/// A GPU texture with a view.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Depth format used when no stencil is requested.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    pub fn depth_format(stencil: bool) -> wgpu::TextureFormat {
        if stencil {
            Self::DEPTH_STENCIL_FORMAT
        } else {
            Self::DEPTH_FORMAT
        }
    }

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `sample_count` must match the colour attachment it is used with
    /// * `stencil` adds an 8-bit stencil aspect
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        stencil: bool,
        label: &str,
    ) -> Self {
        let format = Self::depth_format(stencil);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[format],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Colour target with the surface format.
    ///
    /// Multisampled targets are only ever resolved, single sampled ones can also
    /// be copied to the surface and read back.
    pub fn create_color_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: &str,
    ) -> Self {
        let usage = if sample_count > 1 {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

fn extent(size: [u32; 2]) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_selects_the_combined_format() {
        assert_eq!(Texture::depth_format(true), wgpu::TextureFormat::Depth24PlusStencil8);
        assert_eq!(Texture::depth_format(false), wgpu::TextureFormat::Depth32Float);
        assert!(Texture::depth_format(true).has_stencil_aspect());
    }

    #[test]
    fn zero_extent_is_clamped() {
        let e = extent([0, 7]);
        assert_eq!((e.width, e.height), (1, 7));
    }
}
