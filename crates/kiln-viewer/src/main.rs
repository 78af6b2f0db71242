use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use glam::Vec2;

use kiln_engine::blit::{TextureBlitter, unit_quad};
use kiln_engine::coords::{Color, UvRect, Viewport};
use kiln_engine::input::{InputEvent, Key};
use kiln_engine::logging::{LoggingConfig, init_logging};
use kiln_engine::render::{ClearMask, RenderContext};
use kiln_engine::resource::{
    Filter, Framebuffer, PrimitiveType, StaticGeometry, Texture, TextureDesc, TextureFormat,
    TextureLoader,
};
use kiln_engine::window::{FrameCtx, Runtime, RuntimeConfig};

const CANVAS_SIZE: u32 = 512;

/// Two-color checkerboard, `cells` x `cells` texels.
fn checkerboard(gfx: &RenderContext, cells: u32, a: [u8; 4], b: [u8; 4]) -> Rc<Texture> {
    let mut pixels = Vec::with_capacity((cells * cells * 4) as usize);
    for y in 0..cells {
        for x in 0..cells {
            pixels.extend_from_slice(if (x + y) % 2 == 0 { &a } else { &b });
        }
    }
    let desc = TextureDesc::new(cells, cells, TextureFormat::Rgba8).with_filter(Filter::Nearest);
    gfx.create_texture(desc, Some(&pixels))
}

/// Horizontal/vertical color ramp used when no image is given.
fn ramp(gfx: &RenderContext, size: u32) -> Rc<Texture> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let r = (x * 255 / (size - 1)) as u8;
            let g = (y * 255 / (size - 1)) as u8;
            pixels.extend_from_slice(&[r, g, 160, 255]);
        }
    }
    gfx.create_texture(TextureDesc::new(size, size, TextureFormat::Rgba8), Some(&pixels))
}

struct Viewer {
    blitter: TextureBlitter,
    back_buffer: Framebuffer,
    present_quad: StaticGeometry,
    background: Rc<Texture>,
    sprite: Rc<Texture>,
    canvas: Rc<Texture>,
    // Keeps the loaded image cached for the viewer's lifetime.
    _loader: TextureLoader,
    phase: f64,
}

impl Viewer {
    fn new(gfx: &RenderContext, image: Option<&Path>) -> Result<Self> {
        let mut loader = TextureLoader::default();
        let sprite = match image {
            Some(path) => loader.load_texture(gfx, path)?,
            None => ramp(gfx, 64),
        };

        let canvas = gfx.create_texture(
            TextureDesc::new(CANVAS_SIZE, CANVAS_SIZE, TextureFormat::Rgba8),
            None,
        );

        Ok(Self {
            blitter: TextureBlitter::new(gfx)?,
            back_buffer: Framebuffer::back_buffer(gfx),
            present_quad: gfx.create_static_geometry(&unit_quad(), PrimitiveType::Triangles),
            background: checkerboard(gfx, 8, [40, 40, 48, 255], [70, 70, 84, 255]),
            sprite,
            canvas,
            _loader: loader,
            phase: 0.0,
        })
    }

    fn update(&mut self, dt: f64) {
        self.phase = (self.phase + dt * 0.5) % std::f64::consts::TAU;
    }

    /// Sprite destination: a 0.4-wide square circling the canvas center.
    fn sprite_region(&self) -> UvRect {
        let half = Vec2::splat(0.2);
        let center = Vec2::splat(0.5)
            + 0.25 * Vec2::new(self.phase.cos() as f32, self.phase.sin() as f32);
        UvRect::new(center - half, center + half)
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_>) {
        let gfx = ctx.gfx;

        self.blitter.copy(&self.background, &self.canvas, None);
        self.blitter
            .copy_into(&self.sprite, self.sprite_region(), &self.canvas, None);

        // Picture-in-picture: the canvas's lower-left quarter, magnified.
        let zoom = UvRect::from_coords(0.0, 0.0, 0.5, 0.5);
        let inset = UvRect::from_coords(0.7, 0.7, 0.95, 0.95);
        self.blitter
            .copy_region(zoom, &self.background, inset, &self.canvas, None);

        self.back_buffer.bind();
        let (width, height) = ctx.size;
        gfx.set_viewport(Viewport::full(width, height));
        gfx.set_clear_color(Color::black());
        gfx.clear(ClearMask::COLOR | ClearMask::DEPTH);

        let shader = self.blitter.identity_shader();
        shader.bind();
        shader.set_uniform_by_name("vPosOffset", Vec2::ZERO);
        shader.set_uniform_by_name("vPosScale", Vec2::ONE);
        shader.set_uniform_by_name("vUVOffset", Vec2::ZERO);
        shader.set_uniform_by_name("vUVScale", Vec2::ONE);
        shader.set_uniform_by_name("sTexture", 0i32);
        self.canvas.bind(0);
        self.present_quad.draw();
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let image = std::env::args().nth(1).map(std::path::PathBuf::from);
    if let Some(path) = &image {
        log::info!("sprite image: {}", path.display());
    }

    // The last handler takes the first `Rc`, so nothing outside the
    // runtime keeps GPU resources alive past the GL context.
    let viewer: Rc<RefCell<Option<Viewer>>> = Rc::default();
    let init_viewer = Rc::clone(&viewer);
    let update_viewer = Rc::clone(&viewer);

    Runtime::new(RuntimeConfig {
        title: "kiln viewer".to_string(),
        width: 800,
        height: 800,
        ..RuntimeConfig::default()
    })
    .on_init(move |ctx| {
        *init_viewer.borrow_mut() = Some(Viewer::new(ctx.gfx, image.as_deref())?);
        Ok(())
    })
    .on_update(move |_, dt| {
        if let Some(v) = update_viewer.borrow_mut().as_mut() {
            v.update(dt);
        }
    })
    .on_event(|ctx, event| match event {
        InputEvent::KeyPressed { key: Key::Char('q'), .. } => ctx.exit(),
        InputEvent::FramebufferResized { width, height } => {
            log::debug!("framebuffer resized to {width}x{height}");
        }
        _ => {}
    })
    .on_render(move |ctx| {
        if let Some(v) = viewer.borrow_mut().as_mut() {
            v.render(ctx);
        }
    })
    .run()
}
