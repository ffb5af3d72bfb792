use std::collections::HashMap;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::Vec2;
use crate::render::{RenderCtx, RenderTarget, Renderable};
use crate::text::{CELL_HEIGHT, CELL_WIDTH, GLYPH_SET, GlyphCell, GlyphRaster};

use super::common::{ScreenUniform, screen_ubo_min_binding_size, straight_alpha_blend};

/// One line of text anchored at a screen position.
///
/// `size` is the on-screen cell size of a single character; every character
/// of `text` advances by `size.x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontEntry {
    pub text: String,
    pub position: Vec2,
    pub size: Vec2,
}

impl FontEntry {
    /// Creates an entry whose character cell derives from `scale`.
    pub fn new(text: impl Into<String>, position: Vec2, scale: f32) -> Self {
        Self {
            text: text.into(),
            position,
            size: Vec2::new(10.0 * scale, 25.0 * scale),
        }
    }
}

/// Baked glyph on the GPU: its texture plus the bind group that samples it.
struct GlyphTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Renderable batch of fixed-glyph text labels.
///
/// Holds one pre-baked coverage texture per supported character and a quad
/// mesh covering every character of every entry. Entry edits are cheap:
/// [`put`]/[`clear_entries`] touch only the CPU list, and [`update`] marks
/// the mesh dirty so the next `render` rebuilds it in one pass. Entry sets
/// are assumed small and infrequently changed, so the rebuild is a full one.
///
/// Drawing issues one call per character (each binds that character's
/// texture); characters outside the glyph set are skipped.
///
/// [`put`]: Font::put
/// [`clear_entries`]: Font::clear_entries
/// [`update`]: Font::update
pub struct Font {
    raster: GlyphRaster,
    entries: Vec<FontEntry>,
    mesh_dirty: bool,

    pipeline: Option<wgpu::RenderPipeline>,
    sampler: Option<wgpu::Sampler>,
    ubo: Option<wgpu::Buffer>,
    glyphs: HashMap<char, GlyphTexture>,
    vbo: Option<wgpu::Buffer>,
    vertex_count: usize,

    warned_unsupported: bool,
}

impl Font {
    pub fn new(raster: GlyphRaster, entries: Vec<FontEntry>) -> Self {
        Self {
            raster,
            entries,
            mesh_dirty: false,
            pipeline: None,
            sampler: None,
            ubo: None,
            glyphs: HashMap::new(),
            vbo: None,
            vertex_count: 0,
            warned_unsupported: false,
        }
    }

    /// Appends an entry. Call [`update`](Font::update) once the batch of
    /// edits is complete.
    pub fn put(&mut self, entry: FontEntry) {
        self.entries.push(entry);
    }

    /// Empties the entry list.
    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    /// Marks the quad mesh stale. The rebuild happens lazily on the next
    /// `render`, so any number of edits cost one rebuild.
    pub fn update(&mut self) {
        self.mesh_dirty = true;
    }

    fn upload_mesh(&mut self, ctx: &RenderCtx<'_>) {
        let vertices = build_mesh(&self.entries);
        self.vertex_count = vertices.len();

        if let Some(old) = self.vbo.take() {
            old.destroy();
        }
        if !vertices.is_empty() {
            self.vbo = Some(ctx.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("wavescope text vbo"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                },
            ));
        }
    }

    fn create_glyph_texture(
        ctx: &RenderCtx<'_>,
        bgl: &wgpu::BindGroupLayout,
        ubo: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
        cell: &GlyphCell,
    ) -> GlyphTexture {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("wavescope glyph"),
            size: wgpu::Extent3d {
                width: cell.width,
                height: cell.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Rows are uploaded bottom-up so texcoord v grows upward in screen
        // space, matching the quad corner assignment.
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &flipped_rows(cell),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(cell.width),
                rows_per_image: Some(cell.height),
            },
            wgpu::Extent3d {
                width: cell.width,
                height: cell.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wavescope glyph bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        GlyphTexture { texture, bind_group }
    }
}

impl Renderable for Font {
    fn initialize(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        // Re-initialization (after a surface loss) releases the previous
        // resources first.
        self.clean_up(ctx);

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wavescope text shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("wavescope text bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(screen_ubo_min_binding_size()),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("wavescope text pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("wavescope text pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[TextVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(straight_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        // Glyph textures never tile and never mip: nearest + clamp-to-edge.
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("wavescope glyph sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wavescope text ubo"),
            size: std::mem::size_of::<ScreenUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        for ch in GLYPH_SET {
            let cell = self.raster.rasterize_cell(ch);
            debug_assert_eq!((cell.width, cell.height), (CELL_WIDTH, CELL_HEIGHT));
            let glyph = Self::create_glyph_texture(ctx, &bgl, &ubo, &sampler, &cell);
            self.glyphs.insert(ch, glyph);
        }

        self.pipeline = Some(pipeline);
        self.sampler = Some(sampler);
        self.ubo = Some(ubo);

        self.upload_mesh(ctx);
        self.mesh_dirty = false;

        Ok(())
    }

    fn clean_up(&mut self, _ctx: &RenderCtx<'_>) {
        for (_, glyph) in self.glyphs.drain() {
            glyph.texture.destroy();
        }
        if let Some(vbo) = self.vbo.take() {
            vbo.destroy();
        }
        if let Some(ubo) = self.ubo.take() {
            ubo.destroy();
        }
        self.sampler = None;
        self.pipeline = None;
        self.vertex_count = 0;
    }

    fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        if self.mesh_dirty {
            self.mesh_dirty = false;
            self.upload_mesh(ctx);
        }

        if self.entries.is_empty() || self.vertex_count == 0 {
            return;
        }

        if let Some(ubo) = self.ubo.as_ref() {
            ctx.queue.write_buffer(
                ubo,
                0,
                bytemuck::bytes_of(&ScreenUniform {
                    screen: [ctx.screen.width, ctx.screen.height],
                    _pad: [0.0; 2],
                }),
            );
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(vbo) = self.vbo.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wavescope text pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, vbo.slice(..));

        // One draw per character, binding that character's texture. The quad
        // index advances for every character so skipped ones keep the mesh
        // and the entry list aligned.
        let mut index = 0u32;
        for entry in &self.entries {
            for ch in entry.text.chars() {
                let quad_end = (index + 1) * 6;
                if quad_end as usize > self.vertex_count {
                    return;
                }

                if let Some(glyph) = self.glyphs.get(&ch) {
                    rpass.set_bind_group(0, &glyph.bind_group, &[]);
                    rpass.draw(index * 6..quad_end, 0..1);
                } else if !self.warned_unsupported {
                    log::warn!("Font: no glyph for {ch:?}, skipping");
                    self.warned_unsupported = true;
                }

                index += 1;
            }
        }
    }
}

// ── mesh ──────────────────────────────────────────────────────────────────

/// Builds the quad mesh: one unit quad (two triangles, 6 vertices) per
/// character of every entry, advanced by the entry's cell width, with fixed
/// corner texture coordinates.
///
/// Every character gets a quad, including unsupported ones, so the quad
/// index at draw time equals the character's position in the batch.
fn build_mesh(entries: &[FontEntry]) -> Vec<TextVertex> {
    let mut vertices = Vec::new();

    for entry in entries {
        let Vec2 { x, y } = entry.position;
        let Vec2 { x: w, y: h } = entry.size;

        for (i, _) in entry.text.chars().enumerate() {
            let left = x + i as f32 * w;
            let right = left + w;
            let top = y + h;

            vertices.push(TextVertex { pos: [left, y], uv: [0.0, 0.0] });
            vertices.push(TextVertex { pos: [right, y], uv: [1.0, 0.0] });
            vertices.push(TextVertex { pos: [left, top], uv: [0.0, 1.0] });

            vertices.push(TextVertex { pos: [left, top], uv: [0.0, 1.0] });
            vertices.push(TextVertex { pos: [right, y], uv: [1.0, 0.0] });
            vertices.push(TextVertex { pos: [right, top], uv: [1.0, 1.0] });
        }
    }

    vertices
}

/// Returns the cell's pixels with the row order reversed (bottom-up), the
/// orientation the quad texcoords expect.
fn flipped_rows(cell: &GlyphCell) -> Vec<u8> {
    let w = cell.width as usize;
    let mut out = Vec::with_capacity(cell.pixels.len());
    for row in cell.pixels.chunks_exact(w).rev() {
        out.extend_from_slice(row);
    }
    out
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Vertex layout (16 bytes): position + texcoord.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct TextVertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

impl TextVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, x: f32, y: f32, scale: f32) -> FontEntry {
        FontEntry::new(text, Vec2::new(x, y), scale)
    }

    // ── entry ─────────────────────────────────────────────────────────────

    #[test]
    fn entry_size_derives_from_scale() {
        let e = entry("abc", 0.0, 0.0, 2.0);
        assert_eq!(e.size, Vec2::new(20.0, 50.0));
    }

    // ── mesh ──────────────────────────────────────────────────────────────

    #[test]
    fn mesh_has_six_vertices_per_character() {
        let mesh = build_mesh(&[entry("ab", 0.0, 0.0, 1.0), entry("0", 5.0, 5.0, 1.0)]);
        assert_eq!(mesh.len(), 3 * 6);
    }

    #[test]
    fn empty_entries_build_empty_mesh() {
        assert!(build_mesh(&[]).is_empty());
        assert!(build_mesh(&[entry("", 0.0, 0.0, 1.0)]).is_empty());
    }

    #[test]
    fn quads_advance_by_cell_width() {
        let mesh = build_mesh(&[entry("ab", 3.0, 7.0, 1.0)]);

        // First quad starts at the entry position.
        assert_eq!(mesh[0].pos, [3.0, 7.0]);
        // Second character's quad is shifted one cell width (10 * scale).
        assert_eq!(mesh[6].pos, [13.0, 7.0]);
        assert_eq!(mesh[11].pos, [23.0, 32.0]);
    }

    #[test]
    fn quad_texcoords_are_fixed_corners() {
        let mesh = build_mesh(&[entry("a", 0.0, 0.0, 1.0)]);
        let uvs: Vec<[f32; 2]> = mesh.iter().map(|v| v.uv).collect();
        assert_eq!(
            uvs,
            vec![
                [0.0, 0.0],
                [1.0, 0.0],
                [0.0, 1.0],
                [0.0, 1.0],
                [1.0, 0.0],
                [1.0, 1.0],
            ]
        );
    }

    #[test]
    fn mesh_counts_unsupported_characters_too() {
        // Unsupported characters still occupy a quad; they are only skipped
        // at draw time, keeping later characters aligned with their quads.
        let mesh = build_mesh(&[entry("a!b", 0.0, 0.0, 1.0)]);
        assert_eq!(mesh.len(), 3 * 6);
        assert!(!crate::text::is_supported('!'));
    }

    // ── upload orientation ────────────────────────────────────────────────

    #[test]
    fn flipped_rows_reverses_row_order() {
        let cell = GlyphCell {
            width: 2,
            height: 3,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(flipped_rows(&cell), vec![5, 6, 3, 4, 1, 2]);
    }
}
