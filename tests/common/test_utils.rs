use primitive_scene::{
    Scene,
    app::{FrameTick, SceneDriver},
    demo::{SceneNodes, build_scene},
};

/// Records every call the host makes instead of drawing.
pub(crate) struct CountingDriver {
    pub(crate) scene: Scene,
    pub(crate) nodes: SceneNodes,
    render_invocations: u32,
    sizes: Vec<(u32, u32)>,
}

impl CountingDriver {
    pub fn new() -> Self {
        let mut scene = Scene::new();
        let nodes = build_scene(&mut scene);
        Self {
            scene,
            nodes,
            render_invocations: 0,
            sizes: Vec::new(),
        }
    }

    pub fn render_invocations(&self) -> u32 {
        self.render_invocations
    }

    pub fn sizes(&self) -> &[(u32, u32)] {
        &self.sizes
    }
}

impl SceneDriver for CountingDriver {
    fn resize(&mut self, width: u32, height: u32) {
        self.sizes.push((width, height));
    }

    fn render_frame(&mut self, _: &FrameTick) -> anyhow::Result<()> {
        self.scene.update();
        self.render_invocations += 1;
        Ok(())
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) fn f_to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Number of pixels that differ from `background`.
#[cfg(feature = "integration-tests")]
pub(crate) fn covered_pixels(image: &image::RgbaImage, background: image::Rgba<u8>) -> usize {
    image.pixels().filter(|pixel| **pixel != background).count()
}
