//! Coordinate and color value types shared across renderables.
//!
//! Canonical CPU space:
//! - Logical units chosen by the application (the renderer normalizes against
//!   the screen size it was constructed with)
//! - +X right, +Y up
//!
//! Renderables convert to NDC in shaders using a screen-size uniform.

mod color;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use vec2::Vec2;
pub use viewport::Viewport;
