//! The render engine adapter.
//!
//! [`Engine`] owns the wgpu device and queue bound to a [`Surface`] (or to an
//! offscreen target when created headless), the render targets sized to the
//! viewport and the [`SceneRenderer`]. A frame is drawn with [`Engine::render`].
//!
//! Render targets per frame:
//!
//! ```text
//! msaa colour (4x, optional) --resolve--> preserved colour (optional) --copy--> surface texture
//!                                      \-> surface texture (when nothing is preserved)
//! ```

use anyhow::Context as _;
use instant::Duration;

use crate::{
    data_structures::texture::Texture,
    pipelines::Targets,
    render::SceneRenderer,
    scene::Scene,
    surface::Surface,
};

const MSAA_SAMPLES: u32 = 4;
const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Context creation options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// 4x multisampling when the adapter supports it.
    pub antialias: bool,
    /// Keep the last frame in an offscreen buffer so it can be read back.
    pub preserve_drawing_buffer: bool,
    /// Give the depth buffer an 8-bit stencil aspect.
    pub stencil: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            preserve_drawing_buffer: false,
            stencil: false,
        }
    }
}

/// Why a frame could not be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Acquiring the next surface texture timed out.
    Timeout,
    /// The window is hidden or minimised.
    Occluded,
    /// The surface configuration no longer matches the window.
    Outdated,
    /// The surface is gone.
    Lost,
    /// Acquiring the texture raised a validation error.
    Validation,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            FrameError::Timeout => "timed out",
            FrameError::Occluded => "occluded",
            FrameError::Outdated => "outdated",
            FrameError::Lost => "lost",
            FrameError::Validation => "failed validation",
        };
        write!(f, "surface texture {}", reason)
    }
}

impl std::error::Error for FrameError {}

enum Target {
    Window {
        surface: Surface,
        gpu_surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Headless,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Window { config, .. } => {
                f.debug_struct("Window").field("config", config).finish()
            }
            Target::Headless => f.write_str("Headless"),
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    target: Target,
    device: wgpu::Device,
    queue: wgpu::Queue,
    options: EngineOptions,
    format: wgpu::TextureFormat,
    size: [u32; 2],
    sample_count: u32,
    depth: Texture,
    msaa: Option<Texture>,
    preserved: Option<Texture>,
    renderer: SceneRenderer,
    frame_count: u64,
}

impl Engine {
    /// Create an engine drawing to `surface`.
    pub async fn new(surface: Surface, options: EngineOptions) -> anyhow::Result<Self> {
        let size = surface.size();
        let instance = mk_instance();
        let gpu_surface = instance
            .create_surface(surface.window().clone())
            .context("could not create a GPU surface for the window")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&gpu_surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter is compatible with the surface")?;
        let (device, queue) = request_device(&adapter).await?;

        let caps = gpu_surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("the surface reports no texture formats")?;

        let mut options = options;
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if options.preserve_drawing_buffer {
            if caps.usages.contains(wgpu::TextureUsages::COPY_DST) {
                usage |= wgpu::TextureUsages::COPY_DST;
            } else {
                log::warn!("surface cannot be copied to, the drawing buffer will not be preserved");
                options.preserve_drawing_buffer = false;
            }
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        gpu_surface.configure(&device, &config);

        let sample_count = pick_sample_count(&adapter, format, options);
        log::info!(
            "engine ready: {:?} {}x{}, {} sample(s), {:?}",
            format,
            config.width,
            config.height,
            sample_count,
            options
        );
        let size = [config.width, config.height];
        Ok(Self::from_parts(
            Target::Window {
                surface,
                gpu_surface,
                config,
            },
            device,
            queue,
            options,
            format,
            size,
            sample_count,
        ))
    }

    /// Create an engine rendering into an offscreen texture only.
    ///
    /// The drawing buffer is always preserved so frames can be read back.
    pub async fn headless(width: u32, height: u32, options: EngineOptions) -> anyhow::Result<Self> {
        let instance = mk_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter available")?;
        let (device, queue) = request_device(&adapter).await?;
        let options = EngineOptions {
            preserve_drawing_buffer: true,
            ..options
        };
        let sample_count = pick_sample_count(&adapter, HEADLESS_FORMAT, options);
        log::info!("headless engine ready: {}x{}, {} sample(s)", width, height, sample_count);
        Ok(Self::from_parts(
            Target::Headless,
            device,
            queue,
            options,
            HEADLESS_FORMAT,
            [width.max(1), height.max(1)],
            sample_count,
        ))
    }

    fn from_parts(
        target: Target,
        device: wgpu::Device,
        queue: wgpu::Queue,
        options: EngineOptions,
        format: wgpu::TextureFormat,
        size: [u32; 2],
        sample_count: u32,
    ) -> Self {
        let renderer = SceneRenderer::new(
            &device,
            Targets {
                color_format: format,
                depth_format: Texture::depth_format(options.stencil),
                sample_count,
            },
        );
        let (depth, msaa, preserved) = mk_targets(&device, format, size, sample_count, options);
        Self {
            target,
            device,
            queue,
            options,
            format,
            size,
            sample_count,
            depth,
            msaa,
            preserved,
            renderer,
            frame_count: 0,
        }
    }

    /// Reallocate the viewport. Zero sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {}x{}", width, height);
            return;
        }
        if self.size == [width, height] {
            return;
        }
        log::debug!("resizing viewport to {}x{}", width, height);
        self.size = [width, height];
        self.reconfigure();
    }

    /// Configure the surface and recreate the render targets at the current size.
    pub fn reconfigure(&mut self) {
        if let Target::Window {
            gpu_surface, config, ..
        } = &mut self.target
        {
            config.width = self.size[0];
            config.height = self.size[1];
            gpu_surface.configure(&self.device, config);
        }
        let (depth, msaa, preserved) = mk_targets(
            &self.device,
            self.format,
            self.size,
            self.sample_count,
            self.options,
        );
        self.depth = depth;
        self.msaa = msaa;
        self.preserved = preserved;
    }

    /// Draw `scene` once and present it.
    pub fn render(&mut self, scene: &Scene) -> Result<(), FrameError> {
        let (frame, suboptimal) = match &self.target {
            Target::Window { gpu_surface, .. } => match gpu_surface.get_current_texture() {
                wgpu::CurrentSurfaceTexture::Success(frame) => (Some(frame), false),
                wgpu::CurrentSurfaceTexture::Suboptimal(frame) => (Some(frame), true),
                wgpu::CurrentSurfaceTexture::Timeout => return Err(FrameError::Timeout),
                wgpu::CurrentSurfaceTexture::Occluded => return Err(FrameError::Occluded),
                wgpu::CurrentSurfaceTexture::Outdated => return Err(FrameError::Outdated),
                wgpu::CurrentSurfaceTexture::Lost => return Err(FrameError::Lost),
                wgpu::CurrentSurfaceTexture::Validation => return Err(FrameError::Validation),
            },
            Target::Headless => (None, false),
        };
        let frame_view = frame
            .as_ref()
            .map(|frame| frame.texture.create_view(&wgpu::TextureViewDescriptor::default()));

        let aspect = self.aspect_ratio();
        self.renderer.prepare(&self.device, &self.queue, scene, aspect);

        // preserved buffer if present, the surface texture otherwise
        let Some(output_view) = self.preserved.as_ref().map(|t| &t.view).or(frame_view.as_ref())
        else {
            log::error!("engine has neither a surface frame nor an offscreen target");
            return Err(FrameError::Lost);
        };
        let (view, resolve_target) = match &self.msaa {
            Some(msaa) => (&msaa.view, Some(output_view)),
            None => (output_view, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: self.options.stencil.then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            self.renderer.draw(&mut render_pass);
        }

        if let (Some(preserved), Some(frame)) = (&self.preserved, &frame) {
            encoder.copy_texture_to_texture(
                preserved.texture.as_image_copy(),
                frame.texture.as_image_copy(),
                wgpu::Extent3d {
                    width: self.size[0],
                    height: self.size[1],
                    depth_or_array_layers: 1,
                },
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }
        if suboptimal {
            log::debug!("surface texture is suboptimal, reconfiguring");
            self.reconfigure();
        }
        self.frame_count += 1;
        Ok(())
    }

    /// Read the last rendered frame back as RGBA.
    ///
    /// Fails unless the drawing buffer is preserved.
    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        let preserved = self
            .preserved
            .as_ref()
            .context("reading pixels requires preserve_drawing_buffer")?;
        let [width, height] = self.size;
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Read Pixels Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Pixels Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &preserved.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .context("waiting for the read back failed")?;
        rx.receive()
            .await
            .context("read back channel closed")?
            .context("could not map the read back buffer")?;

        let swap_red_blue = matches!(
            self.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        output_buffer.unmap();
        if swap_red_blue {
            for pixel in pixels.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }
        image::RgbaImage::from_raw(width, height, pixels)
            .context("read back buffer has the wrong size")
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size[0] as f32 / self.size[1].max(1) as f32
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Number of frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// The options in effect, after unsupported ones were turned off.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn surface(&self) -> Option<&Surface> {
        match &self.target {
            Target::Window { surface, .. } => Some(surface),
            Target::Headless => None,
        }
    }

    pub fn uploaded_mesh_count(&self) -> usize {
        self.renderer.mesh_count()
    }
}

fn mk_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::GL,
        ..wgpu::InstanceDescriptor::new_without_display_handle()
    })
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await
        .context("could not create a graphics device")
}

fn pick_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    options: EngineOptions,
) -> u32 {
    if !options.antialias {
        return 1;
    }
    let color = adapter.get_texture_format_features(format);
    let depth = adapter.get_texture_format_features(Texture::depth_format(options.stencil));
    if color.flags.sample_count_supported(MSAA_SAMPLES)
        && depth.flags.sample_count_supported(MSAA_SAMPLES)
    {
        MSAA_SAMPLES
    } else {
        log::info!(
            "{}x multisampling unsupported for {:?}, antialiasing off",
            MSAA_SAMPLES,
            format
        );
        1
    }
}

fn mk_targets(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: [u32; 2],
    sample_count: u32,
    options: EngineOptions,
) -> (Texture, Option<Texture>, Option<Texture>) {
    let depth =
        Texture::create_depth_texture(device, size, sample_count, options.stencil, "depth_texture");
    let msaa = (sample_count > 1)
        .then(|| Texture::create_color_target(device, size, format, sample_count, "msaa_texture"));
    let preserved = options
        .preserve_drawing_buffer
        .then(|| Texture::create_color_target(device, size, format, 1, "preserved_texture"));
    (depth, msaa, preserved)
}
