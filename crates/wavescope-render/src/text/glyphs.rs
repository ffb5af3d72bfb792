use std::fmt;

/// The closed set of characters the text renderable can draw.
///
/// Lowercase letters, digits, hyphen, space, period: 38 glyphs. Anything
/// outside this set is skipped at render time.
pub const GLYPH_SET: [char; 39] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '-', ' ', '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9', '.',
];

/// Returns whether `ch` has a pre-baked glyph texture.
#[inline]
pub fn is_supported(ch: char) -> bool {
    GLYPH_SET.contains(&ch)
}

// Glyph cell geometry. Every glyph is baked into a fixed-size cell at a
// fixed rasterization scale; the quad mesh stretches cells to entry size.
const BAKE_SCALE: u32 = 10;
pub(crate) const CELL_WIDTH: u32 = 13 * BAKE_SCALE + 2; // 132
pub(crate) const CELL_HEIGHT: u32 = 26 * BAKE_SCALE; // 260
const BAKE_PX: f32 = 20.0 * BAKE_SCALE as f32; // 200

/// Error returned by [`GlyphRaster::from_bytes`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// One baked glyph: an 8-bit coverage bitmap filling a fixed-size cell.
#[derive(Debug, Clone)]
pub struct GlyphCell {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage, `width * height` bytes.
    pub pixels: Vec<u8>,
}

/// Offscreen glyph rasterizer.
///
/// Wraps a parsed monospace font and bakes single characters into
/// fixed-size coverage cells, centered the way a canvas with centered
/// alignment and middle baseline would place them.
pub struct GlyphRaster {
    font: fontdue::Font,
}

impl GlyphRaster {
    /// Parses a TrueType or OpenType font from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        Ok(Self { font })
    }

    /// Bakes `ch` into a coverage cell.
    ///
    /// The cell is always `CELL_WIDTH x CELL_HEIGHT`; unsupported or blank
    /// characters produce an empty (all-zero) cell.
    pub fn rasterize_cell(&self, ch: char) -> GlyphCell {
        let mut cell = GlyphCell {
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
            pixels: vec![0u8; (CELL_WIDTH * CELL_HEIGHT) as usize],
        };

        let (metrics, bitmap) = self.font.rasterize(ch, BAKE_PX);
        if metrics.width == 0 || metrics.height == 0 {
            return cell;
        }

        let (ascent, descent) = self
            .font
            .horizontal_line_metrics(BAKE_PX)
            .map(|m| (m.ascent, m.descent))
            .unwrap_or((BAKE_PX * 0.8, -(BAKE_PX * 0.2)));

        let (x0, y0) = glyph_origin(
            metrics.width as i32,
            metrics.height as i32,
            metrics.ymin,
            ascent,
            descent,
        );

        blit(
            &mut cell.pixels,
            CELL_WIDTH as i32,
            CELL_HEIGHT as i32,
            &bitmap,
            metrics.width as i32,
            metrics.height as i32,
            x0,
            y0,
        );

        cell
    }
}

/// Cell-space origin of a glyph bitmap.
///
/// Horizontally centered on the cell midline (shifted one pixel right, the
/// same bias the cell width carries). Vertically placed so the baseline sits
/// where a middle-anchored baseline would: the em midpoint at the cell
/// center, the baseline `(ascent + descent) / 2` below it.
fn glyph_origin(w: i32, h: i32, ymin: i32, ascent: f32, descent: f32) -> (i32, i32) {
    let cx = (CELL_WIDTH / 2) as i32 + 1;
    let cy = (CELL_HEIGHT / 2) as i32;

    let baseline = cy + ((ascent + descent) * 0.5) as i32;

    let x0 = cx - w / 2;
    let y0 = baseline - (h + ymin);
    (x0, y0)
}

/// Copies a glyph bitmap into a cell, clipping at the cell edges.
#[allow(clippy::too_many_arguments)]
fn blit(
    cell: &mut [u8],
    cell_w: i32,
    cell_h: i32,
    glyph: &[u8],
    glyph_w: i32,
    glyph_h: i32,
    x0: i32,
    y0: i32,
) {
    for gy in 0..glyph_h {
        let cy = y0 + gy;
        if cy < 0 || cy >= cell_h {
            continue;
        }
        for gx in 0..glyph_w {
            let cx = x0 + gx;
            if cx < 0 || cx >= cell_w {
                continue;
            }
            cell[(cy * cell_w + cx) as usize] = glyph[(gy * glyph_w + gx) as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── glyph set ─────────────────────────────────────────────────────────

    #[test]
    fn glyph_set_has_38_entries() {
        assert_eq!(GLYPH_SET.len(), 38);
    }

    #[test]
    fn glyph_set_has_no_duplicates() {
        for (i, a) in GLYPH_SET.iter().enumerate() {
            for b in &GLYPH_SET[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn supported_covers_letters_digits_punctuation() {
        assert!(is_supported('a'));
        assert!(is_supported('z'));
        assert!(is_supported('0'));
        assert!(is_supported('9'));
        assert!(is_supported(' '));
        assert!(is_supported('-'));
        assert!(is_supported('.'));
        assert!(!is_supported('A'));
        assert!(!is_supported('!'));
    }

    // ── cell geometry ─────────────────────────────────────────────────────

    #[test]
    fn cell_dimensions() {
        assert_eq!(CELL_WIDTH, 132);
        assert_eq!(CELL_HEIGHT, 260);
    }

    #[test]
    fn glyph_origin_centers_horizontally() {
        // 100 px wide glyph in a 132 px cell: left edge at 67 - 50 = 17.
        let (x0, _) = glyph_origin(100, 150, 0, 160.0, -40.0);
        assert_eq!(x0, 17);
    }

    #[test]
    fn glyph_origin_places_baseline_below_cell_center() {
        // ascent 160, descent -40: baseline 60 px below the cell midline.
        // A glyph sitting on the baseline (ymin = 0) has its top at
        // baseline - height.
        let (_, y0) = glyph_origin(10, 150, 0, 160.0, -40.0);
        assert_eq!(y0, 130 + 60 - 150);
    }

    // ── blit ──────────────────────────────────────────────────────────────

    #[test]
    fn blit_copies_in_bounds() {
        let mut cell = vec![0u8; 16];
        let glyph = vec![7u8; 4];
        blit(&mut cell, 4, 4, &glyph, 2, 2, 1, 1);
        assert_eq!(cell[5], 7);
        assert_eq!(cell[6], 7);
        assert_eq!(cell[9], 7);
        assert_eq!(cell[10], 7);
        assert_eq!(cell.iter().filter(|&&p| p == 7).count(), 4);
    }

    #[test]
    fn blit_clips_at_cell_edges() {
        let mut cell = vec![0u8; 16];
        let glyph = vec![9u8; 9];
        // 3x3 glyph placed at (-1, -1): only the bottom-right 2x2 lands.
        blit(&mut cell, 4, 4, &glyph, 3, 3, -1, -1);
        assert_eq!(cell.iter().filter(|&&p| p == 9).count(), 4);
        assert_eq!(cell[0], 9);
        assert_eq!(cell[1], 9);
        assert_eq!(cell[4], 9);
        assert_eq!(cell[5], 9);
    }
}
