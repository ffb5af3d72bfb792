use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::{ColorRgba, Vec2};
use crate::render::{RenderCtx, RenderTarget, Renderable};

use super::common::straight_alpha_blend;

/// Renderable polyline, drawn as a connected line strip with one color.
///
/// The point sequence lives on the CPU; a position buffer mirrors it on the
/// GPU. Updates are tracked with a version counter: [`set_points`] bumps it,
/// and the next `render` reconciles the buffer:
///
/// - unchanged version: the buffer is left alone
/// - same point count: the buffer is rewritten in place (cheaper than
///   reallocation)
/// - different point count: the buffer is destroyed and reallocated, since a
///   GPU buffer cannot be resized in place
///
/// Taking ownership of the new point vector is what keeps the check cheap:
/// there is no way to mutate the sequence behind the counter's back.
///
/// [`set_points`]: Line::set_points
pub struct Line {
    points: Vec<Vec2>,
    color: ColorRgba,

    /// Bumped by every point-sequence replacement.
    version: u64,
    /// Version captured by the last buffer sync; equal to `version` after
    /// every `render`.
    uploaded_version: u64,
    /// Point count held by the GPU buffer.
    uploaded_len: usize,

    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    ubo: Option<wgpu::Buffer>,
    vbo: Option<wgpu::Buffer>,
}

/// Decision for the per-frame position-buffer reconciliation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum UpdatePlan {
    /// Points unchanged since the last sync.
    Keep,
    /// Same point count: in-place partial write.
    Rewrite,
    /// Point count changed: destroy and reallocate.
    Reallocate,
}

impl Line {
    pub fn new(points: Vec<Vec2>, color: ColorRgba) -> Self {
        Self {
            points,
            color,
            version: 1,
            uploaded_version: 0,
            uploaded_len: 0,
            pipeline: None,
            bind_group: None,
            ubo: None,
            vbo: None,
        }
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Replaces the point sequence. The GPU buffer is reconciled on the next
    /// `render`.
    pub fn set_points(&mut self, points: Vec<Vec2>) {
        self.points = points;
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    pub fn color(&self) -> ColorRgba {
        self.color
    }

    /// Replaces the color. Takes effect on the next `render` (the uniform is
    /// uploaded every frame).
    pub fn set_color(&mut self, color: ColorRgba) {
        self.color = color;
    }

    fn plan(&self) -> UpdatePlan {
        if self.version == self.uploaded_version {
            UpdatePlan::Keep
        } else if self.points.len() == self.uploaded_len {
            UpdatePlan::Rewrite
        } else {
            UpdatePlan::Reallocate
        }
    }

    /// Reconciles the GPU buffer with the current point sequence.
    fn sync_buffer(&mut self, ctx: &RenderCtx<'_>) {
        match self.plan() {
            UpdatePlan::Keep => {}
            UpdatePlan::Rewrite => {
                if let Some(vbo) = self.vbo.as_ref() {
                    ctx.queue
                        .write_buffer(vbo, 0, bytemuck::cast_slice(&pack_points(&self.points)));
                }
            }
            UpdatePlan::Reallocate => {
                if let Some(old) = self.vbo.take() {
                    old.destroy();
                }
                if !self.points.is_empty() {
                    self.vbo = Some(ctx.device.create_buffer_init(
                        &wgpu::util::BufferInitDescriptor {
                            label: Some("wavescope line vbo"),
                            contents: bytemuck::cast_slice(&pack_points(&self.points)),
                            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                        },
                    ));
                }
            }
        }

        self.mark_synced();
    }

    fn mark_synced(&mut self) {
        self.uploaded_version = self.version;
        self.uploaded_len = self.points.len();
    }
}

impl Renderable for Line {
    fn initialize(&mut self, ctx: &RenderCtx<'_>) -> Result<()> {
        // Re-initialization (after a surface loss) releases the previous
        // resources first.
        self.clean_up(ctx);

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("wavescope line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line.wgsl").into()),
        });

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("wavescope line bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(line_ubo_min_binding_size()),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("wavescope line pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("wavescope line pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[LineVertex::layout()],
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
                    topology: wgpu::PrimitiveTopology::LineStrip,
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

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("wavescope line ubo"),
            size: std::mem::size_of::<LineUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wavescope line bind group"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        if !self.points.is_empty() {
            self.vbo = Some(ctx.device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("wavescope line vbo"),
                    contents: bytemuck::cast_slice(&pack_points(&self.points)),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                },
            ));
        }
        self.mark_synced();

        self.pipeline = Some(pipeline);
        self.bind_group = Some(bind_group);
        self.ubo = Some(ubo);

        Ok(())
    }

    fn clean_up(&mut self, _ctx: &RenderCtx<'_>) {
        if let Some(vbo) = self.vbo.take() {
            vbo.destroy();
        }
        if let Some(ubo) = self.ubo.take() {
            ubo.destroy();
        }
        self.bind_group = None;
        self.pipeline = None;
        self.uploaded_version = 0;
        self.uploaded_len = 0;
    }

    fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.sync_buffer(ctx);

        if let Some(ubo) = self.ubo.as_ref() {
            ctx.queue.write_buffer(
                ubo,
                0,
                bytemuck::bytes_of(&LineUniform {
                    color: self.color.to_array(),
                    screen: [ctx.screen.width, ctx.screen.height],
                    _pad: [0.0; 2],
                }),
            );
        }

        // A strip needs at least two points.
        if self.points.len() < 2 {
            return;
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(vbo) = self.vbo.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wavescope line pass"),
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
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(0..self.points.len() as u32, 0..1);
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Uniform block for the line program (32 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LineUniform {
    color: [f32; 4],
    screen: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LineVertex {
    pos: [f32; 2],
}

impl LineVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

fn line_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<LineUniform>() as u64)
        .expect("LineUniform has non-zero size by construction")
}

fn pack_points(points: &[Vec2]) -> Vec<LineVertex> {
    points.iter().map(|p| LineVertex { pos: [p.x, p.y] }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(n: usize) -> Vec<Vec2> {
        (0..n).map(|i| Vec2::new(i as f32, i as f32 * 0.5)).collect()
    }

    fn red() -> ColorRgba {
        ColorRgba::new(1.0, 0.0, 0.0, 1.0)
    }

    // ── update plan ───────────────────────────────────────────────────────

    #[test]
    fn fresh_line_needs_allocation() {
        let line = Line::new(pts(3), red());
        assert_eq!(line.plan(), UpdatePlan::Reallocate);
    }

    #[test]
    fn synced_line_keeps_buffer() {
        let mut line = Line::new(pts(3), red());
        line.mark_synced();
        assert_eq!(line.plan(), UpdatePlan::Keep);
    }

    #[test]
    fn same_length_change_rewrites_in_place() {
        let mut line = Line::new(pts(3), red());
        line.mark_synced();
        line.set_points(pts(3));
        assert_eq!(line.plan(), UpdatePlan::Rewrite);
    }

    #[test]
    fn length_change_reallocates() {
        let mut line = Line::new(pts(3), red());
        line.mark_synced();
        line.set_points(pts(4));
        assert_eq!(line.plan(), UpdatePlan::Reallocate);
    }

    #[test]
    fn shrinking_also_reallocates() {
        let mut line = Line::new(pts(5), red());
        line.mark_synced();
        line.set_points(pts(2));
        assert_eq!(line.plan(), UpdatePlan::Reallocate);
    }

    // ── sync invariant ────────────────────────────────────────────────────

    #[test]
    fn sync_snapshot_tracks_version_and_length() {
        let mut line = Line::new(pts(3), red());
        line.mark_synced();
        assert_eq!(line.uploaded_version, line.version);
        assert_eq!(line.uploaded_len, 3);

        line.set_points(pts(4));
        assert_ne!(line.uploaded_version, line.version);

        line.mark_synced();
        assert_eq!(line.uploaded_version, line.version);
        assert_eq!(line.uploaded_len, 4);
        assert_eq!(line.plan(), UpdatePlan::Keep);
    }

    #[test]
    fn repeated_renders_without_changes_stay_keep() {
        let mut line = Line::new(pts(3), red());
        line.mark_synced();
        for _ in 0..3 {
            assert_eq!(line.plan(), UpdatePlan::Keep);
            line.mark_synced();
        }
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn pack_points_is_two_components_per_point() {
        let packed = pack_points(&pts(4));
        assert_eq!(packed.len(), 4);
        assert_eq!(packed[2].pos, [2.0, 1.0]);
        assert_eq!(
            std::mem::size_of_val(packed.as_slice()),
            4 * 2 * std::mem::size_of::<f32>()
        );
    }

    #[test]
    fn buffer_length_follows_current_points_after_any_transition() {
        // N → M leaves the packed element count at M, whether or not N == M.
        let mut line = Line::new(pts(3), red());
        line.mark_synced();

        line.set_points(pts(4));
        assert_eq!(line.plan(), UpdatePlan::Reallocate);
        assert_eq!(pack_points(line.points()).len(), 4);
        line.mark_synced();

        line.set_points(pts(4));
        assert_eq!(line.plan(), UpdatePlan::Rewrite);
        assert_eq!(pack_points(line.points()).len(), 4);
    }
}
