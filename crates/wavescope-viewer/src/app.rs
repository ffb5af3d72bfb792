use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use wavescope_render::coords::{ColorRgba, Vec2};
use wavescope_render::device::{Gpu, GpuInit};
use wavescope_render::render::primitives::{Font, FontEntry, Line};
use wavescope_render::render::{FrameStatus, Renderer};
use wavescope_render::text::GlyphRaster;
use wavescope_render::time::FrameClock;

use crate::capture::DeviceRegistry;

/// Logical drawing space the renderer normalizes against: one unit per
/// sample horizontally, sample value vertically.
const SCREEN_SIZE: Vec2 = Vec2::new(100.0, 1000.0);

/// Seconds between label refreshes.
const LABEL_INTERVAL: f32 = 0.5;

const TRACE_COLOR: ColorRgba = ColorRgba::new(0.3, 1.0, 0.45, 1.0);

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Single-window viewer: polls the active capture device each frame and
/// draws its sample window as a trace plus a couple of text labels.
pub struct ViewerApp {
    entry: Option<WindowEntry>,

    renderer: Renderer,
    line: Line,
    font: Font,

    devices: DeviceRegistry,
    clock: FrameClock,

    /// Seconds since the labels were last rebuilt.
    label_age: f32,
    /// Exponentially smoothed frame rate shown in the stats label.
    fps: f32,
}

impl ViewerApp {
    pub fn new(font_bytes: &[u8]) -> Result<Self> {
        let raster =
            GlyphRaster::from_bytes(font_bytes).context("failed to parse monospace font")?;

        Ok(Self {
            entry: None,
            renderer: Renderer::new(SCREEN_SIZE),
            line: Line::new(Vec::new(), TRACE_COLOR),
            font: Font::new(raster, Vec::new()),
            devices: DeviceRegistry::new(),
            clock: FrameClock::new(),
            label_age: LABEL_INTERVAL, // rebuild on the first frame
            fps: 0.0,
        })
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("wavescope")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = WindowEntryBuilder {
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, GpuInit::default()))
                    .expect("GPU initialization failed for window")
            },
        }
        .build();

        // Renderables become drawable once their GPU resources exist.
        let (renderer, line, font) = (&self.renderer, &mut self.line, &mut self.font);
        entry.with_gpu(|gpu| -> Result<()> {
            renderer.initialize(gpu, line)?;
            renderer.initialize(gpu, font)?;
            Ok(())
        })?;

        self.entry = Some(entry);
        Ok(())
    }

    /// Converts the sample window into trace points: one point per sample,
    /// sample index on the x axis, sample value on the y axis.
    fn trace_points(samples: &[f64]) -> Vec<Vec2> {
        samples
            .iter()
            .enumerate()
            .map(|(i, &s)| Vec2::new(i as f32, s as f32))
            .collect()
    }

    fn refresh_labels(&mut self) {
        let device = self.devices.current_name().unwrap_or("no device").to_string();

        self.font.clear_entries();
        self.font
            .put(FontEntry::new(device, Vec2::new(2.0, 920.0), 0.5));
        self.font.put(FontEntry::new(
            format!("{:.1} fps", self.fps),
            Vec2::new(2.0, 870.0),
            0.5,
        ));
        self.font.update();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let ft = self.clock.tick();
        if ft.dt > 0.0 {
            let instant_fps = 1.0 / ft.dt;
            self.fps = if self.fps > 0.0 {
                self.fps * 0.9 + instant_fps * 0.1
            } else {
                instant_fps
            };
        }

        self.line.set_points(Self::trace_points(&self.devices.data()));

        self.label_age += ft.dt;
        if self.label_age >= LABEL_INTERVAL {
            self.label_age = 0.0;
            self.refresh_labels();
        }

        let (renderer, line, font) = (&mut self.renderer, &mut self.line, &mut self.font);
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let mut fatal = false;
        entry.with_mut(|fields| {
            let display_size = fields.window.inner_size();

            match renderer.pre_render(fields.gpu, display_size) {
                FrameStatus::Fatal => {
                    fatal = true;
                    return;
                }
                FrameStatus::Skipped => {
                    // Recovery frame: draw calls below are no-ops by design
                    // of the renderer; fall through so present stays paired.
                }
                FrameStatus::Ready => {}
            }

            renderer.draw(fields.gpu, line);
            renderer.draw(fields.gpu, font);
            renderer.present(fields.gpu);
        });

        if fatal {
            log::error!("unrecoverable surface error, shutting down");
            self.shutdown(event_loop);
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.devices.stop_capture();

        if let Some(entry) = self.entry.as_mut() {
            let (renderer, line, font) = (&self.renderer, &mut self.line, &mut self.font);
            entry.with_gpu(|gpu| {
                renderer.remove(gpu, line);
                renderer.remove(gpu, font);
            });
        }
        self.entry = None;

        event_loop.exit();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create window: {e:#}");
            event_loop.exit();
            return;
        }

        let names = self.devices.device_names();
        log::info!("capture devices: {names:?}");
        if let Some(first) = names.first() {
            self.devices.start_capture(first);
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Continuous redraw: the capture device produces data all the time.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                // The next pre_render picks up the new display size.
                if let Some(entry) = self.entry.as_ref() {
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── trace mapping ─────────────────────────────────────────────────────

    #[test]
    fn trace_points_map_index_to_x_and_sample_to_y() {
        let points = ViewerApp::trace_points(&[500.0, 650.0, 700.0]);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Vec2::new(0.0, 500.0));
        assert_eq!(points[1], Vec2::new(1.0, 650.0));
        assert_eq!(points[2], Vec2::new(2.0, 700.0));
    }

    #[test]
    fn empty_sample_window_yields_no_points() {
        assert!(ViewerApp::trace_points(&[]).is_empty());
    }
}
