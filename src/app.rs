//! Application event loop.
//!
//! The winit [`App`] turns host events into calls on a [`Host`]: window resizes
//! are dispatched to the resize handlers, redraw requests (one per display
//! refresh) to the frame-tick handlers. The demo registers one handler of each
//! kind through [`register_resize_listener`] and [`run_render_loop`].
//!
//! GPU initialisation is async. Natively it is driven to completion on a tokio
//! runtime inside `resumed`; on the web it is spawned and its result comes back
//! to the event loop as an [`AppEvent::Initialized`] user event.

use std::path::PathBuf;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
};

use crate::{
    demo::SceneContext,
    engine::{Engine, EngineOptions},
    events::{EventHub, Subscription},
    surface::Surface,
};

/// Passed to every frame-tick handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTick {
    /// Zero based frame number.
    pub frame: u64,
    /// Time since the previous tick.
    pub delta: Duration,
}

/// The host side of the application: resize and frame-tick subscriptions on a context `C`.
#[derive(Debug)]
pub struct Host<C> {
    resize: EventHub<C, PhysicalSize<u32>>,
    frame: EventHub<C, FrameTick>,
    frames: u64,
    last_frame: Option<Instant>,
}

impl<C> Host<C> {
    pub fn new() -> Self {
        Self {
            resize: EventHub::new(),
            frame: EventHub::new(),
            frames: 0,
            last_frame: None,
        }
    }

    pub fn on_resize(
        &mut self,
        handler: impl FnMut(&mut C, &PhysicalSize<u32>) -> anyhow::Result<()> + 'static,
    ) -> Subscription {
        self.resize.subscribe(handler)
    }

    pub fn on_frame_tick(
        &mut self,
        handler: impl FnMut(&mut C, &FrameTick) -> anyhow::Result<()> + 'static,
    ) -> Subscription {
        self.frame.subscribe(handler)
    }

    pub fn dispatch_resize(
        &mut self,
        ctx: &mut C,
        size: PhysicalSize<u32>,
    ) -> anyhow::Result<usize> {
        self.resize.emit(ctx, &size)
    }

    /// Emit one frame tick. Returns the number of handlers invoked.
    pub fn dispatch_frame(&mut self, ctx: &mut C) -> anyhow::Result<usize> {
        let now = Instant::now();
        let tick = FrameTick {
            frame: self.frames,
            delta: self.last_frame.map(|last| now - last).unwrap_or_default(),
        };
        self.last_frame = Some(now);
        self.frames += 1;
        self.frame.emit(ctx, &tick)
    }

    /// Number of frame ticks dispatched so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<C> Default for Host<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// What the resize and frame handlers drive.
pub trait SceneDriver {
    fn resize(&mut self, width: u32, height: u32);

    /// Render one frame. Only unrecoverable errors are returned.
    fn render_frame(&mut self, tick: &FrameTick) -> anyhow::Result<()>;

    /// Ask the host for the next refresh.
    fn request_redraw(&self) {}

    /// The driver has nothing more to do and the loop may stop.
    fn finished(&self) -> bool {
        false
    }
}

/// Forward host resizes to the driver's viewport.
pub fn register_resize_listener<C: SceneDriver + 'static>(host: &mut Host<C>) -> Subscription {
    host.on_resize(|ctx: &mut C, size: &PhysicalSize<u32>| {
        ctx.resize(size.width, size.height);
        Ok(())
    })
}

/// Render once per frame tick until the returned subscription is cancelled.
pub fn run_render_loop<C: SceneDriver + 'static>(host: &mut Host<C>) -> Subscription {
    host.on_frame_tick(|ctx: &mut C, tick: &FrameTick| ctx.render_frame(tick))
}

/// Startup parameters of the demo.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub engine: EngineOptions,
    /// Save the first rendered frame as PNG and exit.
    pub capture: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "primitive-scene".to_string(),
            width: 1280,
            height: 720,
            engine: EngineOptions {
                antialias: true,
                preserve_drawing_buffer: true,
                stencil: true,
            },
            capture: None,
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub enum AppEvent {
    Initialized(anyhow::Result<SceneContext>),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(Ok(_)) => f.write_str("Initialized(Ok)"),
            Self::Initialized(Err(e)) => write!(f, "Initialized(Err({}))", e),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<AppEvent>,
    config: DemoConfig,
    host: Host<SceneContext>,
    context: Option<SceneContext>,
    subscriptions: Vec<Subscription>,
    initializing: bool,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<AppEvent>, config: DemoConfig) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            host: Host::new(),
            context: None,
            subscriptions: Vec::new(),
            initializing: false,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        self.subscriptions.iter().for_each(Subscription::unsubscribe);
        event_loop.exit();
    }

    fn initialized(&mut self, event_loop: &ActiveEventLoop, result: anyhow::Result<SceneContext>) {
        self.initializing = false;
        let mut context = match result {
            Ok(context) => context,
            Err(e) => return self.fail(event_loop, e),
        };
        self.subscriptions.push(register_resize_listener(&mut self.host));
        self.subscriptions.push(run_render_loop(&mut self.host));

        // some platforms never send an initial Resized
        if let Some(size) = context.engine.surface().map(Surface::size) {
            if let Err(e) = self.host.dispatch_resize(&mut context, size) {
                return self.fail(event_loop, e);
            }
        }
        context.request_redraw();
        self.context = Some(context);
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() || self.initializing {
            return;
        }
        let DemoConfig {
            title,
            width,
            height,
            ..
        } = &self.config;
        let surface = match Surface::locate(event_loop, title, *width, *height) {
            Ok(surface) => surface,
            Err(e) => return self.fail(event_loop, e),
        };
        self.initializing = true;

        let options = self.config.engine;
        let capture = self.config.capture.clone();
        let init_future = async move {
            let engine = Engine::new(surface, options).await?;
            Ok(SceneContext::new(engine, capture))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let result = self.async_runtime.block_on(init_future);
            self.initialized(event_loop, result);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = init_future.await;
                if proxy.send_event(AppEvent::Initialized(result)).is_err() {
                    log::error!("event loop closed before the engine was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            AppEvent::Initialized(result) => self.initialized(event_loop, result),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(context) = &mut self.context else {
            return;
        };
        context.scene.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Err(e) = self.host.dispatch_resize(context, size) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::RedrawRequested => {
                // invoke main render loop
                context.request_redraw();
                let result = self.host.dispatch_frame(context);
                let finished = context.finished();
                match result {
                    Err(e) => self.fail(event_loop, e),
                    Ok(_) if finished => event_loop.exit(),
                    Ok(_) => (),
                }
            }
            _ => {}
        }
    }
}

/// Open the surface, build the demo scene and render until the window closes.
pub fn run(config: DemoConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
