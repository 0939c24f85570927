//! Drawing backend wrapper that renders text with a built-in 5x7 bitmap font
//!
//! plotters is built without a font engine so charts render the same on a
//! headless server as on a desktop. Every text call (titles, tick labels,
//! axis descriptions) is routed through the glyph table below, and text
//! extents are reported from the same metrics so plotters' layout matches
//! what is drawn.

use plotters_backend::{
    text_anchor::{HPos, VPos},
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};

const GLYPH_HEIGHT: i32 = 7;
const SPACE_ADVANCE: i32 = 3;

/// (char, width in columns, rows top to bottom, MSB is the leftmost column)
const GLYPHS: &[(char, u8, [u8; 7])] = &[
    ('A', 5, [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('B', 5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('C', 5, [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
    ('D', 5, [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100]),
    ('E', 5, [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', 5, [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', 5, [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
    ('H', 5, [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', 3, [0b111, 0b010, 0b010, 0b010, 0b010, 0b010, 0b111]),
    ('J', 5, [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
    ('K', 5, [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
    ('L', 5, [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', 5, [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('N', 5, [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001]),
    ('O', 5, [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', 5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('Q', 5, [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
    ('R', 5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
    ('S', 5, [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110]),
    ('T', 5, [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('U', 5, [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('V', 5, [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
    ('W', 5, [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
    ('X', 5, [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
    ('Y', 5, [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('Z', 5, [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
    ('0', 5, [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', 3, [0b010, 0b110, 0b010, 0b010, 0b010, 0b010, 0b111]),
    ('2', 5, [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', 5, [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110]),
    ('4', 5, [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', 5, [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
    ('6', 5, [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', 5, [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
    ('8', 5, [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', 5, [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
    ('.', 1, [0, 0, 0, 0, 0, 0, 1]),
    (',', 2, [0, 0, 0, 0, 0, 0b01, 0b10]),
    (':', 1, [0, 0, 1, 0, 0, 1, 0]),
    ('-', 3, [0, 0, 0, 0b111, 0, 0, 0]),
    ('+', 5, [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0]),
    ('=', 4, [0, 0, 0b1111, 0, 0b1111, 0, 0]),
    ('_', 4, [0, 0, 0, 0, 0, 0, 0b1111]),
    ('/', 5, [0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000]),
    ('%', 5, [0b11001, 0b11010, 0b00010, 0b00100, 0b01000, 0b01011, 0b10011]),
    ('(', 3, [0b001, 0b010, 0b100, 0b100, 0b100, 0b010, 0b001]),
    (')', 3, [0b100, 0b010, 0b001, 0b001, 0b001, 0b010, 0b100]),
    ('[', 3, [0b111, 0b100, 0b100, 0b100, 0b100, 0b100, 0b111]),
    (']', 3, [0b111, 0b001, 0b001, 0b001, 0b001, 0b001, 0b111]),
];

fn glyph(ch: char) -> Option<(u8, &'static [u8; 7])> {
    let upper = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(c, _, _)| *c == upper)
        .map(|(_, width, rows)| (*width, rows))
}

/// Integer pixel scale for a requested font size
fn scale_for(size: f64) -> i32 {
    ((size / 9.0).round() as i32).max(1)
}

/// Unscaled advance of a string in glyph columns, without the trailing gap
fn text_columns(text: &str) -> i32 {
    let total: i32 = text
        .chars()
        .map(|ch| match glyph(ch) {
            Some((width, _)) => width as i32 + 1,
            None => SPACE_ADVANCE,
        })
        .sum();
    (total - 1).max(0)
}

/// Text extent in pixels at a font size, before any rotation
pub fn text_extent(text: &str, size: f64) -> (u32, u32) {
    let scale = scale_for(size);
    ((text_columns(text) * scale) as u32, (GLYPH_HEIGHT * scale) as u32)
}

/// Forwards all drawing to `inner`, except text which uses the glyph table
pub struct GlyphBackend<DB> {
    inner: DB,
}

impl<DB> GlyphBackend<DB> {
    pub fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> GlyphBackend<DB> {
    fn fill_block(
        &mut self,
        x: i32,
        y: i32,
        scale: i32,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        for dx in 0..scale {
            for dy in 0..scale {
                self.inner.draw_pixel((x + dx, y + dy), color)?;
            }
        }
        Ok(())
    }
}

impl<DB: DrawingBackend> DrawingBackend for GlyphBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }

        let scale = scale_for(style.size());
        let width = text_columns(text) * scale;
        let height = GLYPH_HEIGHT * scale;
        let anchor = style.anchor();
        let dx = match anchor.h_pos {
            HPos::Left => 0,
            HPos::Center => -width / 2,
            HPos::Right => -width,
        };
        let dy = match anchor.v_pos {
            VPos::Top => 0,
            VPos::Center => -height / 2,
            VPos::Bottom => -height,
        };
        let transform = style.transform();

        let mut cursor = 0;
        for ch in text.chars() {
            let Some((width, rows)) = glyph(ch) else {
                cursor += SPACE_ADVANCE * scale;
                continue;
            };
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..width {
                    if bits & (1 << (width - 1 - col)) == 0 {
                        continue;
                    }
                    // Offset in the text's own frame, then rotated onto the canvas
                    let u = dx + cursor + col as i32 * scale;
                    let v = dy + row as i32 * scale;
                    let (tx, ty) = transform.transform(u, v);
                    self.fill_block(pos.0 + tx, pos.1 + ty, scale, color)?;
                }
            }
            cursor += (width as i32 + 1) * scale;
        }
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        Ok(text_extent(text, style.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_glyph_fits_its_width() {
        for (ch, width, rows) in GLYPHS {
            assert!(*width >= 1 && *width <= 5, "{ch}");
            for bits in rows {
                assert!((*bits as u32) < (1 << *width), "{ch} row overflows");
            }
        }
    }

    #[test]
    fn test_lowercase_maps_to_uppercase() {
        assert_eq!(glyph('g'), glyph('G'));
        assert!(glyph('~').is_none());
    }

    #[test]
    fn test_text_extent_scales() {
        // "A" is five columns, "-" three, one gap between
        assert_eq!(text_extent("A-", 9.0), (9, 7));
        assert_eq!(text_extent("A-", 18.0), (18, 14));
        assert_eq!(text_extent("", 12.0), (0, 7));
    }

    #[test]
    fn test_unknown_chars_advance_like_spaces() {
        assert_eq!(text_columns("A B"), text_columns("A~B"));
    }
}
