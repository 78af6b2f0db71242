//! Pixel-level checks of `TextureBlitter`.
//!
//! The recorded driver calls are replayed through a small software
//! rasterizer that understands the identity blit shader, so copies can be
//! verified without a GPU.

use std::collections::HashMap;
use std::rc::Rc;

use kiln_engine::blit::TextureBlitter;
use kiln_engine::coords::UvRect;
use kiln_engine::gl::{
    BufferId, Call, FramebufferId, GlDriver, ProgramId, RecordingDriver, TextureId, UniformData,
    UniformLocation, VertexArrayId,
};
use kiln_engine::render::{ContextInfo, RenderContext};
use kiln_engine::resource::{Filter, Texture, TextureDesc, TextureFormat};

type Rgba = [u8; 4];

const UNTOUCHED: Rgba = [1, 2, 3, 4];

// ── software GPU ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Image {
    fn get(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }

    /// Nearest texel, clamped to the edge.
    fn sample(&self, u: f32, v: f32) -> Rgba {
        let x = ((u * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((v * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.get(x as usize, y as usize)
    }
}

#[derive(Debug, Clone, Copy)]
struct Attrib {
    buffer: BufferId,
    components: usize,
    stride: usize,
    offset: usize,
}

#[derive(Debug, Default)]
struct Vao {
    ibo: Option<BufferId>,
    attribs: HashMap<u32, Attrib>,
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    x: f32,
    y: f32,
    u: f32,
    v: f32,
}

#[derive(Default)]
struct SoftGpu {
    textures: HashMap<TextureId, Image>,
    buffers: HashMap<BufferId, Vec<u8>>,
    vaos: HashMap<VertexArrayId, Vao>,
    fb_colors: HashMap<FramebufferId, TextureId>,
    uniforms: HashMap<(ProgramId, UniformLocation), UniformData>,
    units: HashMap<u32, TextureId>,
    active_unit: u32,
    array_buffer: Option<BufferId>,
    vao: Option<VertexArrayId>,
    framebuffer: Option<FramebufferId>,
    program: Option<ProgramId>,
    viewport: [i32; 4],
}

impl SoftGpu {
    fn replay(driver: &RecordingDriver) -> Self {
        let mut gpu = SoftGpu::default();
        for call in driver.calls() {
            gpu.execute(driver, call);
        }
        gpu
    }

    fn execute(&mut self, driver: &RecordingDriver, call: Call) {
        match call {
            Call::ActiveTexture(unit) => self.active_unit = unit,
            Call::BindTexture(Some(texture)) => {
                self.units.insert(self.active_unit, texture);
            }
            Call::BindTexture(None) => {
                self.units.remove(&self.active_unit);
            }
            Call::TexImage2d {
                width,
                height,
                pixels,
                ..
            } => {
                let texture = self.units[&self.active_unit];
                let pixels = pixels
                    .unwrap_or_else(|| vec![0; width as usize * height as usize * 4])
                    .chunks_exact(4)
                    .map(|p| [p[0], p[1], p[2], p[3]])
                    .collect();
                self.textures.insert(
                    texture,
                    Image {
                        width: width as usize,
                        height: height as usize,
                        pixels,
                    },
                );
            }

            Call::BindVertexArray(vao) => {
                if let Some(vao) = vao {
                    self.vaos.entry(vao).or_default();
                }
                self.vao = vao;
            }
            Call::BindBuffer { target, buffer } => {
                if target == glow::ARRAY_BUFFER {
                    self.array_buffer = buffer;
                } else if let Some(vao) = self.vao {
                    self.vaos.entry(vao).or_default().ibo = buffer;
                }
            }
            Call::BufferData { target, data, .. } => {
                let buffer = if target == glow::ARRAY_BUFFER {
                    self.array_buffer
                } else {
                    self.vao.and_then(|vao| self.vaos[&vao].ibo)
                };
                self.buffers.insert(buffer.expect("buffer bound for upload"), data);
            }
            Call::VertexAttribPointer {
                index,
                components,
                stride,
                offset,
                ..
            } => {
                let vao = self.vao.expect("vertex array bound for attribute setup");
                let attrib = Attrib {
                    buffer: self.array_buffer.expect("array buffer bound"),
                    components: components as usize,
                    stride: stride as usize,
                    offset: offset as usize,
                };
                self.vaos.entry(vao).or_default().attribs.insert(index, attrib);
            }

            Call::BindFramebuffer(fb) => self.framebuffer = fb,
            Call::FramebufferTexture2d {
                attachment,
                texture: Some(texture),
            } if attachment == glow::COLOR_ATTACHMENT0 => {
                let fb = self.framebuffer.expect("framebuffer bound for attachment");
                self.fb_colors.insert(fb, texture);
            }

            Call::UseProgram(program) => self.program = program,
            Call::Uniform { location, data } => {
                let program = self.program.expect("program bound for uniform upload");
                self.uniforms.insert((program, location), data);
            }
            Call::Viewport {
                x,
                y,
                width,
                height,
            } => self.viewport = [x, y, width, height],

            Call::DrawElements { count, offset, .. } => self.draw(driver, count, offset),
            _ => {}
        }
    }

    fn uniform(&self, driver: &RecordingDriver, name: &str) -> UniformData {
        let program = self.program.expect("program bound for draw");
        let location = driver
            .uniform_location(program, name)
            .unwrap_or_else(|| panic!("uniform {name} not declared"));
        self.uniforms[&(program, location)]
    }

    fn vec2(&self, driver: &RecordingDriver, name: &str) -> [f32; 2] {
        match self.uniform(driver, name) {
            UniformData::Vec2(v) => v,
            other => panic!("uniform {name} holds {other:?}"),
        }
    }

    fn read_attrib(&self, attrib: Attrib, vertex: usize) -> Vec<f32> {
        let data = &self.buffers[&attrib.buffer];
        let start = vertex * attrib.stride + attrib.offset;
        (0..attrib.components)
            .map(|i| {
                let at = start + i * 4;
                f32::from_ne_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
            })
            .collect()
    }

    /// Runs the identity blit shader over the bound geometry.
    fn draw(&mut self, driver: &RecordingDriver, count: i32, offset: i32) {
        let pos_offset = self.vec2(driver, "vPosOffset");
        let pos_scale = self.vec2(driver, "vPosScale");
        let uv_offset = self.vec2(driver, "vUVOffset");
        let uv_scale = self.vec2(driver, "vUVScale");
        let UniformData::I32(unit) = self.uniform(driver, "sTexture") else {
            panic!("sampler uniform is not an integer");
        };

        let vao = &self.vaos[&self.vao.expect("geometry bound for draw")];
        let indices: Vec<u32> = self.buffers[&vao.ibo.expect("index buffer")]
            .chunks_exact(4)
            .skip(offset as usize / 4)
            .take(count as usize)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let [vx, vy, vw, vh] = self.viewport.map(|v| v as f32);
        let vertices: Vec<Vertex> = indices
            .iter()
            .map(|&i| {
                let pos = self.read_attrib(vao.attribs[&0], i as usize);
                let uv = self.read_attrib(vao.attribs[&1], i as usize);
                let ndc_x = (pos_offset[0] + pos[0] * pos_scale[0]) * 2.0 - 1.0;
                let ndc_y = (pos_offset[1] + pos[1] * pos_scale[1]) * 2.0 - 1.0;
                Vertex {
                    x: vx + (ndc_x + 1.0) * 0.5 * vw,
                    y: vy + (ndc_y + 1.0) * 0.5 * vh,
                    u: uv_offset[0] + uv[0] * uv_scale[0],
                    v: uv_offset[1] + uv[1] * uv_scale[1],
                }
            })
            .collect();

        let source = self.textures[&self.units[&(unit as u32)]].clone();
        let target_id = self.fb_colors[&self.framebuffer.expect("off-screen target")];
        let target = self.textures.get_mut(&target_id).expect("target texture");

        for tri in vertices.chunks_exact(3) {
            rasterize(tri, &source, target);
        }
    }
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn rasterize(tri: &[Vertex], source: &Image, target: &mut Image) {
    let [a, b, c] = [tri[0], tri[1], tri[2]];
    let (pa, pb, pc) = ((a.x, a.y), (b.x, b.y), (c.x, c.y));
    let area = edge(pa, pb, pc);
    if area.abs() < f32::EPSILON {
        return;
    }

    for y in 0..target.height {
        for x in 0..target.width {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(pb, pc, p) / area;
            let w1 = edge(pc, pa, p) / area;
            let w2 = edge(pa, pb, p) / area;
            if w0 < -1e-5 || w1 < -1e-5 || w2 < -1e-5 {
                continue;
            }
            let u = w0 * a.u + w1 * b.u + w2 * c.u;
            let v = w0 * a.v + w1 * b.v + w2 * c.v;
            target.pixels[y * target.width + x] = source.sample(u, v);
        }
    }
}

// ── fixtures ──────────────────────────────────────────────────────────────

fn context() -> (RenderContext, RecordingDriver) {
    let driver = RecordingDriver::new();
    let ctx = RenderContext::new(driver.clone(), ContextInfo::default());
    (ctx, driver)
}

/// Texture whose texel `(x, y)` is `[x * 16, y * 16, 7, 255]`.
fn gradient(ctx: &RenderContext, size: u32) -> Rc<Texture> {
    let mut pixels = Vec::new();
    for y in 0..size {
        for x in 0..size {
            pixels.extend_from_slice(&[(x * 16) as u8, (y * 16) as u8, 7, 255]);
        }
    }
    let desc = TextureDesc::new(size, size, TextureFormat::Rgba8).with_filter(Filter::Nearest);
    ctx.create_texture(desc, Some(&pixels))
}

fn filled(ctx: &RenderContext, size: u32) -> Rc<Texture> {
    let pixels = UNTOUCHED.repeat((size * size) as usize);
    let desc = TextureDesc::new(size, size, TextureFormat::Rgba8).with_filter(Filter::Nearest);
    ctx.create_texture(desc, Some(&pixels))
}

fn gradient_texel(x: usize, y: usize) -> Rgba {
    [(x * 16) as u8, (y * 16) as u8, 7, 255]
}

// ── copies ────────────────────────────────────────────────────────────────

#[test]
fn full_copy_reproduces_source() {
    let (ctx, driver) = context();
    let mut blitter = TextureBlitter::new(&ctx).unwrap();
    let src = gradient(&ctx, 8);
    let dst = filled(&ctx, 8);

    blitter.copy(&src, &dst, None);

    let gpu = SoftGpu::replay(&driver);
    assert_eq!(gpu.textures[&dst.id()].pixels, gpu.textures[&src.id()].pixels);
}

#[test]
fn upscaling_copy_repeats_texels() {
    let (ctx, driver) = context();
    let mut blitter = TextureBlitter::new(&ctx).unwrap();
    let src = gradient(&ctx, 4);
    let dst = filled(&ctx, 8);

    blitter.copy(&src, &dst, None);

    let gpu = SoftGpu::replay(&driver);
    let out = &gpu.textures[&dst.id()];
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(out.get(x, y), gradient_texel(x / 2, y / 2), "texel ({x}, {y})");
        }
    }
}

#[test]
fn center_quarter_lands_in_lower_left_quarter() {
    let (ctx, driver) = context();
    let mut blitter = TextureBlitter::new(&ctx).unwrap();
    let src = gradient(&ctx, 8);
    let dst = filled(&ctx, 8);

    blitter.copy_region(
        UvRect::from_coords(0.25, 0.25, 0.75, 0.75),
        &src,
        UvRect::from_coords(0.0, 0.0, 0.5, 0.5),
        &dst,
        None,
    );

    let gpu = SoftGpu::replay(&driver);
    let out = &gpu.textures[&dst.id()];
    for y in 0..8 {
        for x in 0..8 {
            let expected = if x < 4 && y < 4 {
                gradient_texel(x + 2, y + 2)
            } else {
                UNTOUCHED
            };
            assert_eq!(out.get(x, y), expected, "texel ({x}, {y})");
        }
    }
}

#[test]
fn chained_copies_retarget_the_shared_framebuffer() {
    let (ctx, driver) = context();
    let mut blitter = TextureBlitter::new(&ctx).unwrap();
    let src = gradient(&ctx, 8);
    let middle = filled(&ctx, 8);
    let last = filled(&ctx, 8);

    blitter.copy(&src, &middle, None);
    blitter.copy(&middle, &last, None);

    let gpu = SoftGpu::replay(&driver);
    assert_eq!(gpu.textures[&last.id()].pixels, gpu.textures[&src.id()].pixels);
    assert_eq!(
        driver.count(|c| matches!(c, Call::CreateFramebuffer(_))),
        1
    );
}

#[test]
fn copy_into_leaves_the_rest_of_the_destination() {
    let (ctx, driver) = context();
    let mut blitter = TextureBlitter::new(&ctx).unwrap();
    let src = gradient(&ctx, 2);
    let dst = filled(&ctx, 8);

    blitter.copy_into(&src, UvRect::from_coords(0.5, 0.5, 1.0, 1.0), &dst, None);

    let gpu = SoftGpu::replay(&driver);
    let out = &gpu.textures[&dst.id()];
    assert_eq!(out.get(4, 4), gradient_texel(0, 0));
    assert_eq!(out.get(7, 7), gradient_texel(1, 1));
    assert_eq!(out.get(3, 3), UNTOUCHED);
    assert_eq!(out.get(0, 7), UNTOUCHED);
}
