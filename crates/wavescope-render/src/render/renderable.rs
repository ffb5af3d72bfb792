use anyhow::Result;

use super::{RenderCtx, RenderTarget};

/// An object capable of initializing, drawing, and releasing its own
/// GPU-side resources.
///
/// Lifecycle: `initialize` once before the first `render`, `render` any
/// number of times, `clean_up` once at the end. After a surface loss all GPU
/// resources are considered stale; re-running `initialize` is the caller's
/// responsibility.
pub trait Renderable {
    /// Creates GPU resources (pipelines, buffers, textures).
    fn initialize(&mut self, ctx: &RenderCtx<'_>) -> Result<()>;

    /// Releases every GPU resource created by `initialize`.
    ///
    /// The object may be re-initialized afterwards.
    fn clean_up(&mut self, ctx: &RenderCtx<'_>);

    /// Records draw commands for the current frame.
    fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>);
}
