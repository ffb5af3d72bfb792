//! Fixed-glyph text support.
//!
//! The text renderable draws from a closed set of pre-baked glyph textures;
//! this module owns the set and the offscreen rasterization that produces
//! each glyph's coverage bitmap.

mod glyphs;

pub use glyphs::{FontLoadError, GLYPH_SET, GlyphCell, GlyphRaster, is_supported};
pub(crate) use glyphs::{CELL_HEIGHT, CELL_WIDTH};
