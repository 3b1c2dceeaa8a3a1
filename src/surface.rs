//! Locating the drawable surface.
//!
//! Natively a window is created. On the web the first `<canvas>` element of the
//! document is used; startup fails when the page has none.

use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalSize, event_loop::ActiveEventLoop, window::Window};

#[derive(Debug, Clone)]
pub struct Surface {
    window: Arc<Window>,
}

impl Surface {
    pub fn locate(
        event_loop: &ActiveEventLoop,
        title: &str,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = web_sys::window().context("no global window")?;
            let document = window.document().context("window has no document")?;
            let canvas = document
                .query_selector("canvas")
                .map_err(|e| anyhow::anyhow!("canvas lookup failed: {:?}", e))?
                .context("no <canvas> element found in the document")?;
            let canvas: web_sys::HtmlCanvasElement = canvas
                .dyn_into()
                .map_err(|_| anyhow::anyhow!("the first canvas is not an HtmlCanvasElement"))?;
            window_attributes = window_attributes.with_canvas(Some(canvas));
        }

        let window = event_loop
            .create_window(window_attributes)
            .context("could not create the drawable surface")?;
        log::info!("surface located, {:?}", window.inner_size());
        Ok(Self {
            window: Arc::new(window),
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Whether input events on the canvas have their browser default suppressed.
    /// Natively there is nothing to suppress.
    pub fn set_prevent_default(&self, prevent: bool) {
        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;
            self.window.set_prevent_default(prevent);
        }
        #[cfg(not(target_arch = "wasm32"))]
        let _ = prevent;
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
