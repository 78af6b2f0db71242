use std::ffi::CStr;
use std::num::NonZeroU32;

use anyhow::{Context, Result};
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::coords::Viewport;
use crate::gl::GlowDriver;
use crate::input::platform::EventTranslator;
use crate::input::{InputEvent, InputState, Key};
use crate::render::{ContextInfo, RenderContext};
use crate::time::{FrameClock, FrameTime};

/// Window and GL context configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub gl_major: u8,
    pub gl_minor: u8,
    pub vsync: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "kiln".to_string(),
            width: 640,
            height: 480,
            fullscreen: false,
            gl_major: 3,
            gl_minor: 3,
            vsync: true,
        }
    }
}

/// Per-callback view of the running window.
pub struct FrameCtx<'a> {
    pub gfx: &'a RenderContext,
    pub input: &'a InputState,
    pub time: FrameTime,
    /// Framebuffer size in physical pixels.
    pub size: (u32, u32),
    exit: &'a mut bool,
}

impl FrameCtx<'_> {
    /// Ends the event loop after the current callback.
    pub fn exit(&mut self) {
        *self.exit = true;
    }
}

type InitFn = Box<dyn FnOnce(&mut FrameCtx<'_>) -> Result<()>>;
type UpdateFn = Box<dyn FnMut(&mut FrameCtx<'_>, f64)>;
type RenderFn = Box<dyn FnMut(&mut FrameCtx<'_>)>;
type EventFn = Box<dyn FnMut(&mut FrameCtx<'_>, &InputEvent)>;

#[derive(Default)]
struct Handlers {
    init: Option<InitFn>,
    update: Vec<UpdateFn>,
    render: Vec<RenderFn>,
    event: Vec<EventFn>,
}

/// Window + GL runtime driven by closures.
///
/// Each frame runs every `on_update` handler with the frame delta, then every
/// `on_render` handler, then presents. Escape and the close button end the loop.
pub struct Runtime {
    config: RuntimeConfig,
    handlers: Handlers,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            handlers: Handlers::default(),
        }
    }

    /// Runs once, after the GL context exists and before the first frame.
    pub fn on_init(mut self, f: impl FnOnce(&mut FrameCtx<'_>) -> Result<()> + 'static) -> Self {
        self.handlers.init = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl FnMut(&mut FrameCtx<'_>, f64) + 'static) -> Self {
        self.handlers.update.push(Box::new(f));
        self
    }

    pub fn on_render(mut self, f: impl FnMut(&mut FrameCtx<'_>) + 'static) -> Self {
        self.handlers.render.push(Box::new(f));
        self
    }

    pub fn on_event(mut self, f: impl FnMut(&mut FrameCtx<'_>, &InputEvent) + 'static) -> Self {
        self.handlers.event.push(Box::new(f));
        self
    }

    /// Opens the window and blocks until the loop ends.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(self.config, self.handlers);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Window with its GL surface and context.
///
/// Field order is drop order: the render context goes before the GL context.
struct GlWindow {
    gfx: RenderContext,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

fn create_gl_window(event_loop: &ActiveEventLoop, config: &RuntimeConfig) -> Result<GlWindow> {
    let mut attrs = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width, config.height));
    if config.fullscreen {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    let window = event_loop
        .create_window(attrs)
        .context("failed to create window")?;

    let raw_display = window
        .display_handle()
        .context("window has no display handle")?
        .as_raw();
    let raw_window = window
        .window_handle()
        .context("window has no window handle")?
        .as_raw();

    #[cfg(target_os = "windows")]
    let preference = DisplayApiPreference::Wgl(Some(raw_window));
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let preference = DisplayApiPreference::Egl;

    // SAFETY: both handles belong to `window`, which outlives the display.
    let display = unsafe { Display::new(raw_display, preference) }
        .context("failed to open GL display")?;

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(24)
        .with_stencil_size(8)
        .build();
    let gl_config = unsafe { display.find_configs(template) }
        .context("failed to query GL configs")?
        .next()
        .context("no suitable GL config")?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window,
        non_zero(size.width),
        non_zero(size.height),
    );
    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .context("failed to create GL window surface")?;

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(
            config.gl_major,
            config.gl_minor,
        ))))
        .with_profile(GlProfile::Core)
        .build(Some(raw_window));
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .with_context(|| {
            format!(
                "failed to create OpenGL {}.{} core context",
                config.gl_major, config.gl_minor
            )
        })?
        .make_current(&surface)
        .context("failed to make GL context current")?;

    let interval = if config.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(e) = surface.set_swap_interval(&context, interval) {
        log::warn!("failed to set swap interval: {e}");
    }

    // SAFETY: the context was just made current on this thread and stays
    // current for the lifetime of the window.
    let gfx = unsafe {
        let gl = glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s));
        RenderContext::new(
            GlowDriver::new(gl),
            ContextInfo {
                width: size.width,
                height: size.height,
                fullscreen: config.fullscreen,
                gl_major: config.gl_major,
                gl_minor: config.gl_minor,
            },
        )
    };

    Ok(GlWindow {
        gfx,
        surface,
        context,
        window,
    })
}

/// Field order is drop order: handlers may own GPU resources, so they go
/// before the window and its GL context.
struct AppState {
    handlers: Handlers,
    window: Option<GlWindow>,

    config: RuntimeConfig,
    input: InputState,
    translator: EventTranslator,
    clock: FrameClock,
    time: FrameTime,
    pending: Vec<InputEvent>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, handlers: Handlers) -> Self {
        Self {
            handlers,
            window: None,
            config,
            input: InputState::default(),
            translator: EventTranslator::default(),
            clock: FrameClock::new(),
            time: FrameTime {
                delta: 0.0,
                elapsed: 0.0,
                frame_index: 0,
            },
            pending: Vec::new(),
            exit_requested: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Runs `f` with a `FrameCtx` over the live window; `None` before it exists.
    fn with_frame<R>(
        &mut self,
        f: impl FnOnce(&mut Handlers, &mut FrameCtx<'_>) -> R,
    ) -> Option<R> {
        let gl = self.window.as_ref()?;
        let size = gl.window.inner_size();
        let mut exit = false;
        let mut ctx = FrameCtx {
            gfx: &gl.gfx,
            input: &self.input,
            time: self.time,
            size: (size.width, size.height),
            exit: &mut exit,
        };
        let result = f(&mut self.handlers, &mut ctx);
        if exit {
            self.exit_requested = true;
        }
        Some(result)
    }

    fn dispatch(&mut self, event: InputEvent) {
        self.input.apply_event(&event);

        if matches!(
            event,
            InputEvent::KeyPressed { key: Key::Escape, .. } | InputEvent::CloseRequested
        ) {
            self.exit_requested = true;
        }

        self.with_frame(|handlers, ctx| {
            for handler in &mut handlers.event {
                handler(ctx, &event);
            }
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(gl) = self.window.as_ref() else {
            return;
        };
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return;
        }
        gl.surface.resize(&gl.context, non_zero(width), non_zero(height));
        gl.gfx.set_viewport(Viewport::full(width, height));
        gl.window.request_redraw();
    }

    fn frame(&mut self) -> Result<()> {
        self.time = self.clock.tick();
        let delta = self.time.delta;

        self.with_frame(|handlers, ctx| {
            for handler in &mut handlers.update {
                handler(ctx, delta);
            }
            for handler in &mut handlers.render {
                handler(ctx);
            }
        });

        if let Some(gl) = self.window.as_ref() {
            gl.surface
                .swap_buffers(&gl.context)
                .context("failed to swap buffers")?;
        }
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match create_gl_window(event_loop, &self.config) {
            Ok(gl) => {
                log::info!("window \"{}\" opened", self.config.title);
                gl.window.request_redraw();
                self.window = Some(gl);
            }
            Err(err) => {
                self.fail(event_loop, err.context("failed to create GL window"));
                return;
            }
        }

        self.clock.reset();
        if let Some(init) = self.handlers.init.take() {
            if let Some(Err(err)) = self.with_frame(|_, ctx| init(ctx)) {
                self.fail(event_loop, err.context("init handler failed"));
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(gl) = &self.window {
            gl.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if let Some(gl) = &self.window {
            self.translator
                .translate(&gl.window, &self.input, &event, &mut self.pending);
        }
        let mut pending = std::mem::take(&mut self.pending);
        for ev in pending.drain(..) {
            self.dispatch(ev);
        }
        self.pending = pending;

        match event {
            WindowEvent::Resized(size) => self.resize(size.width, size.height),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|gl| gl.window.inner_size()) {
                    self.resize(size.width, size.height);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.frame() {
                    self.fail(event_loop, err);
                    return;
                }
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Release GPU resources while the context still exists.
        self.handlers = Handlers::default();
        self.window = None;
        log::info!("window closed");
    }
}
