//! Wavescope rendering crate.
//!
//! A small rendering helper layer on top of wgpu: it draws line strips and
//! fixed-glyph text labels onto a window surface. The pieces:
//!
//! - [`device`]: GPU context + surface (swapchain) management
//! - [`render`]: the [`render::Renderer`] frame orchestrator, the
//!   [`render::Renderable`] capability trait, and the line/text primitives
//! - [`text`]: the fixed glyph set and offscreen glyph rasterization
//! - [`coords`], [`logging`], [`time`]: value types and shared utilities

pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod text;
pub mod time;
