mod app;
mod capture;

use anyhow::{Context, Result};
use winit::event_loop::EventLoop;

use wavescope_render::logging::{LoggingConfig, init_logging};

use crate::app::ViewerApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let font_bytes = load_monospace_font()?;
    let mut app = ViewerApp::new(&font_bytes)?;

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    Ok(())
}

/// Reads the first monospace font found among common system locations.
fn load_monospace_font() -> Result<Vec<u8>> {
    const CANDIDATES: [&str; 6] = [
        "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
        "/usr/share/fonts/noto/NotoSansMono-Regular.ttf",
    ];

    CANDIDATES
        .iter()
        .find_map(|p| std::fs::read(p).ok())
        .context("no monospace font found; install DejaVu, Liberation, or Noto mono fonts")
}
