//! GPU rendering subsystem.
//!
//! Renderables issue GPU commands via wgpu and are responsible for their own
//! GPU resources (pipelines, buffers, textures). The `Renderer` orchestrates
//! the frame: surface resize, surface-loss recovery, clear, delegation.
//!
//! Convention:
//! - CPU geometry is in application units
//! - shaders convert to NDC using a screen-size uniform carried in `RenderCtx`

mod ctx;
mod renderable;
mod renderer;

pub mod primitives;

pub use ctx::{RenderCtx, RenderTarget};
pub use renderable::Renderable;
pub use renderer::{FrameStatus, Renderer};
