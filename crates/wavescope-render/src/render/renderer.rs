use glam::Mat4;
use winit::dpi::PhysicalSize;

use crate::coords::{Vec2, Viewport};
use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};

use super::{RenderCtx, RenderTarget, Renderable};

/// Outcome of `Renderer::pre_render` for one frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    /// A frame is in flight; `draw` calls will record into it.
    Ready,
    /// The surface was lost (or the frame timed out) and this frame is
    /// skipped; `draw` calls are no-ops until the next `pre_render`.
    Skipped,
    /// Unrecoverable surface error; the caller should shut down.
    Fatal,
}

/// Orchestrates the drawing surface.
///
/// Owns the logical screen size used for coordinate normalization and the
/// frame currently being recorded. The `Gpu` context handle is passed
/// explicitly to every operation.
///
/// Per-frame protocol:
///
/// ```text
/// renderer.pre_render(&mut gpu, window.inner_size());
/// renderer.draw(&gpu, &mut line);
/// renderer.draw(&gpu, &mut labels);
/// renderer.present(&gpu);
/// ```
///
/// On the frame in which surface-loss recovery happens, `pre_render` reports
/// `Skipped` and the `draw`/`present` calls do nothing; rendering resumes on
/// the following frame. Renderables are not re-initialized automatically.
pub struct Renderer {
    /// Logical screen size handed to renderables via `RenderCtx`.
    screen: Viewport,

    /// Orthographic projection matching the surface aspect ratio.
    ///
    /// Recomputed every `pre_render`; not yet consumed by any renderable
    /// (the line and text shaders normalize against `screen` instead).
    projection: Mat4,

    /// Frame currently being recorded, if any.
    frame: Option<GpuFrame>,
}

impl Renderer {
    pub fn new(screen_size: Vec2) -> Self {
        Self {
            screen: Viewport::new(screen_size.x, screen_size.y),
            projection: Mat4::IDENTITY,
            frame: None,
        }
    }

    /// Returns the logical screen size renderables normalize against.
    #[inline]
    pub fn screen(&self) -> Viewport {
        self.screen
    }

    /// Returns the projection computed by the last `pre_render`.
    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Delegates GPU resource creation to the renderable.
    ///
    /// Must be called once before the renderable is drawable, and again after
    /// a surface loss if the caller wants fresh resources.
    pub fn initialize(&self, gpu: &Gpu<'_>, renderable: &mut dyn Renderable) -> anyhow::Result<()> {
        renderable.initialize(&self.ctx(gpu))
    }

    /// Delegates GPU resource teardown to the renderable.
    pub fn remove(&self, gpu: &Gpu<'_>, renderable: &mut dyn Renderable) {
        renderable.clean_up(&self.ctx(gpu));
    }

    /// Begins a frame: resizes the backing surface to the display size when it
    /// changed, acquires the swapchain texture, and clears it to opaque black.
    ///
    /// Surface loss is recovered here (reconfigure + report `Skipped`); the
    /// recovery frame itself is never rendered.
    pub fn pre_render(&mut self, gpu: &mut Gpu<'_>, display_size: PhysicalSize<u32>) -> FrameStatus {
        debug_assert!(self.frame.is_none(), "pre_render called with a frame still in flight");
        self.frame = None;

        if display_size != gpu.size() {
            gpu.resize(display_size);
        }

        let mut frame = match gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => FrameStatus::Fatal,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        FrameStatus::Skipped
                    }
                };
            }
        };

        // Clear pass: full surface, opaque black. Dropped before any
        // renderable records into the encoder.
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("wavescope clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let size = gpu.size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        self.projection = ortho_for_aspect(aspect);

        self.frame = Some(frame);
        FrameStatus::Ready
    }

    /// Records the renderable into the in-flight frame.
    ///
    /// No-op while no frame is in flight (the skipped recovery frame, or a
    /// `pre_render` that was never called).
    pub fn draw(&mut self, gpu: &Gpu<'_>, renderable: &mut dyn Renderable) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let ctx = RenderCtx::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            self.screen,
        );

        let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
        renderable.render(&ctx, &mut target);
    }

    /// Submits the in-flight frame for presentation. No-op on skipped frames.
    pub fn present(&mut self, gpu: &Gpu<'_>) {
        if let Some(frame) = self.frame.take() {
            gpu.submit(frame);
        }
    }

    fn ctx<'a>(&self, gpu: &'a Gpu<'_>) -> RenderCtx<'a> {
        RenderCtx::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            self.screen,
        )
    }
}

/// Orthographic projection spanning `[-aspect, aspect] × [1, -1]` with a
/// `[-1, 1]` depth range, matching the surface aspect ratio.
fn ortho_for_aspect(aspect: f32) -> Mat4 {
    Mat4::orthographic_rh(-aspect, aspect, 1.0, -1.0, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn ortho_maps_horizontal_extent_to_ndc() {
        let m = ortho_for_aspect(2.0);
        let p = m.transform_point3(glam::Vec3::new(2.0, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-6);
        let q = m.transform_point3(glam::Vec3::new(-2.0, 0.0, 0.0));
        assert!((q.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn ortho_flips_vertical_axis() {
        // bottom = 1, top = -1: +Y in application space maps downward in NDC.
        let m = ortho_for_aspect(1.0);
        let p = m.transform_point3(glam::Vec3::new(0.0, 1.0, 0.0));
        assert!((p.y + 1.0).abs() < 1e-6);
    }

    // ── frame state ───────────────────────────────────────────────────────

    #[test]
    fn new_renderer_has_no_frame_in_flight() {
        let r = Renderer::new(Vec2::new(100.0, 1000.0));
        assert!(r.frame.is_none());
        assert_eq!(r.screen(), Viewport::new(100.0, 1000.0));
    }
}
