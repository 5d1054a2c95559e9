//! Bitmap font subsystem.
//!
//! Glyph data ships as a compact run-length stream (generated by
//! `build.rs` and embedded at compile time): each byte's high bit marks a
//! run of opaque 255 versus transparent 0, and the low seven bits give
//! the run length. Run-length data cannot be randomly addressed per
//! glyph, so every family is expanded exactly once at startup into one
//! alpha byte per source pixel; drawing then indexes the expanded bitmap
//! directly.
//!
//! A family's bitmap holds the 96 printable-ASCII glyphs side by side.
//! When the asset carries a distinct bold band below the regular one,
//! bold text selects that second region; otherwise the bold flag is
//! silently ignored.

use log::info;
use thiserror::Error;

use crate::fb::canvas::Canvas;
use crate::fb::pixel::Color;

/// Number of glyph-backed characters: printable ASCII from code 32.
pub const GLYPH_COUNT: usize = 96;
const FIRST_GLYPH: u8 = 0x20;

/// The fixed-size font families shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFamily {
    Font8x14,
    #[default]
    Font10x18,
    Font12x22,
    Font18x32,
}

impl FontFamily {
    /// All families, in ascending cell size.
    pub const ALL: [FontFamily; 4] = [
        FontFamily::Font8x14,
        FontFamily::Font10x18,
        FontFamily::Font12x22,
        FontFamily::Font18x32,
    ];

    const fn index(self) -> usize {
        match self {
            FontFamily::Font8x14 => 0,
            FontFamily::Font10x18 => 1,
            FontFamily::Font12x22 => 2,
            FontFamily::Font18x32 => 3,
        }
    }
}

/// Font loading errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FontError {
    #[error("glyph stream expands to {got} bytes, bitmap needs {want}")]
    LengthMismatch { got: usize, want: usize },
}

/// Expand a run-length glyph stream into one alpha byte per pixel.
///
/// High bit set: a run of 255s. High bit clear: a run of 0s. The low
/// seven bits give the run length; runs longer than 127 are split across
/// consecutive bytes by the encoder, which this side handles for free.
pub fn rle_expand(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for &byte in packed {
        let value = if byte & 0x80 != 0 { 255 } else { 0 };
        let run = (byte & 0x7F) as usize;
        out.resize(out.len() + run, value);
    }
    out
}

/// One decompressed fixed-width font.
#[derive(Debug, Clone)]
pub struct Font {
    /// Cursor advance per glyph, in pixels at scale 1.
    advance_width: i32,
    advance_height: i32,
    /// Source bitmap cell per glyph. Matches the advance for the
    /// shipped families; kept separate because drawing addresses cells
    /// while layout steps by advances.
    cell_width: i32,
    cell_height: i32,
    /// Row offset of the bold band, when the asset has one.
    bold_band: Option<usize>,
    /// Expanded alpha bytes, stride = GLYPH_COUNT * cell_width.
    alpha: Vec<u8>,
}

impl Font {
    /// Expand a packed glyph stream for a `cell_width x cell_height`
    /// family. The stream must expand to either one band (regular only)
    /// or two stacked bands (regular + bold).
    pub fn from_rle(packed: &[u8], cell_width: i32, cell_height: i32) -> Result<Self, FontError> {
        let alpha = rle_expand(packed);
        let band = GLYPH_COUNT * cell_width as usize * cell_height as usize;
        let bold_band = match alpha.len() {
            n if n == band => None,
            n if n == band * 2 => Some(cell_height as usize),
            got => {
                return Err(FontError::LengthMismatch { got, want: band * 2 });
            }
        };
        Ok(Self {
            advance_width: cell_width,
            advance_height: cell_height,
            cell_width,
            cell_height,
            bold_band,
            alpha,
        })
    }

    /// Build a font directly from expanded alpha bytes. Used by tests to
    /// exercise intermediate-alpha blending, which the shipped binary
    /// assets never produce.
    pub fn from_alpha(
        alpha: Vec<u8>,
        cell_width: i32,
        cell_height: i32,
        bold: bool,
    ) -> Result<Self, FontError> {
        let band = GLYPH_COUNT * cell_width as usize * cell_height as usize;
        let want = if bold { band * 2 } else { band };
        if alpha.len() != want {
            return Err(FontError::LengthMismatch {
                got: alpha.len(),
                want,
            });
        }
        Ok(Self {
            advance_width: cell_width,
            advance_height: cell_height,
            cell_width,
            cell_height,
            bold_band: bold.then_some(cell_height as usize),
            alpha,
        })
    }

    /// Horizontal cursor advance at scale 1.
    pub const fn width(&self) -> i32 {
        self.advance_width
    }

    /// Line advance at scale 1.
    pub const fn height(&self) -> i32 {
        self.advance_height
    }

    /// Whether the asset carries a distinct bold band.
    pub const fn has_bold(&self) -> bool {
        self.bold_band.is_some()
    }

    /// Blend `text` onto the canvas with its top-left corner at (x, y).
    ///
    /// Each glyph covers a `cell_width*scale x cell_height*scale` region,
    /// replicating every source pixel `scale x scale` times (nearest
    /// neighbor, no interpolation). Fully opaque source pixels write
    /// `color` as-is; partial alpha writes `color` with the transparency
    /// field replaced by the alpha value (the engine never composites
    /// against existing pixels); zero alpha leaves the destination
    /// untouched. Characters without glyphs are skipped, consuming their
    /// advance. Drawing stops before the first glyph whose cell would
    /// cross the buffer bounds.
    pub fn draw_text(
        &self,
        canvas: &mut Canvas,
        x: i32,
        y: i32,
        text: &str,
        color: Color,
        bold: bool,
        scale: i32,
    ) {
        assert!(scale >= 1, "text scale must be at least 1");
        let band = if bold { self.bold_band.unwrap_or(0) } else { 0 };
        let glyph_w = self.cell_width * scale;
        let glyph_h = self.cell_height * scale;
        let stride = GLYPH_COUNT * self.cell_width as usize;
        let format = canvas.format();

        let mut pen = x;
        for byte in text.bytes() {
            if pen < 0 || y < 0 || pen + glyph_w > canvas.width() || y + glyph_h > canvas.height() {
                break;
            }
            if !(FIRST_GLYPH..0x80).contains(&byte) {
                pen += self.advance_width * scale;
                continue;
            }
            let glyph = (byte - FIRST_GLYPH) as usize;
            let col0 = glyph * self.cell_width as usize;
            for dy in 0..glyph_h {
                let sy = band + (dy / scale) as usize;
                for dx in 0..glyph_w {
                    let sx = col0 + (dx / scale) as usize;
                    match self.alpha[sy * stride + sx] {
                        0 => {}
                        255 => canvas.draw_point(pen + dx, y + dy, color),
                        a => canvas.draw_point(pen + dx, y + dy, format.with_alpha(color, a)),
                    }
                }
            }
            pen += self.advance_width * scale;
        }
    }
}

/// All font families, decompressed once at startup.
#[derive(Debug)]
pub struct FontStore {
    fonts: [Font; 4],
}

static FONT_08X14: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/font_08x14.rle"));
static FONT_10X18: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/font_10x18.rle"));
static FONT_12X22: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/font_12x22.rle"));
static FONT_18X32: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/font_18x32.rle"));

impl FontStore {
    /// Expand every embedded family.
    ///
    /// The assets are generated by this crate's own build script, so a
    /// malformed stream is a build bug, not a runtime condition; loading
    /// therefore panics instead of surfacing a result.
    pub fn load() -> Self {
        let fonts = [
            Font::from_rle(FONT_08X14, 8, 14),
            Font::from_rle(FONT_10X18, 10, 18),
            Font::from_rle(FONT_12X22, 12, 22),
            Font::from_rle(FONT_18X32, 18, 32),
        ]
        .map(|f| f.expect("embedded font asset malformed"));
        info!("expanded {} embedded font families", fonts.len());
        Self { fonts }
    }

    /// Look up one family.
    pub fn get(&self, family: FontFamily) -> &Font {
        &self.fonts[family.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fb::pixel::PixelFormat;

    #[test]
    fn rle_expand_mixed_runs() {
        assert_eq!(rle_expand(&[0x83, 0x02]), vec![255, 255, 255, 0, 0]);
        assert_eq!(rle_expand(&[0x01, 0x81]), vec![0, 255]);
        assert_eq!(rle_expand(&[]), Vec::<u8>::new());
    }

    #[test]
    fn rle_expand_split_long_runs() {
        // 200 opaque pixels arrive as 127 + 73.
        let expanded = rle_expand(&[0xFF, 0x80 | 73]);
        assert_eq!(expanded.len(), 200);
        assert!(expanded.iter().all(|&a| a == 255));
    }

    #[test]
    fn embedded_assets_expand_to_two_bands() {
        let store = FontStore::load();
        for family in FontFamily::ALL {
            let font = store.get(family);
            assert!(font.has_bold(), "{family:?} should carry a bold band");
            assert_eq!(
                font.alpha.len(),
                GLYPH_COUNT * (font.cell_width * font.cell_height * 2) as usize
            );
        }
    }

    #[test]
    fn embedded_metrics() {
        let store = FontStore::load();
        assert_eq!(store.get(FontFamily::Font8x14).width(), 8);
        assert_eq!(store.get(FontFamily::Font8x14).height(), 14);
        assert_eq!(store.get(FontFamily::Font18x32).width(), 18);
        assert_eq!(store.get(FontFamily::Font18x32).height(), 32);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let err = Font::from_rle(&[0x85], 10, 18).unwrap_err();
        assert!(matches!(err, FontError::LengthMismatch { got: 5, .. }));
    }

    /// A 1x1-cell font whose '!' glyph has the given alpha, everything
    /// else transparent.
    fn one_pixel_font(alpha_value: u8) -> Font {
        let mut alpha = vec![0u8; GLYPH_COUNT];
        alpha[1] = alpha_value; // '!'
        Font::from_alpha(alpha, 1, 1, false).unwrap()
    }

    #[test]
    fn opaque_alpha_writes_color_verbatim() {
        let fmt = PixelFormat::argb8888();
        let mut canvas = Canvas::new(10, 10, fmt);
        let red = fmt.pack(0xFF, 0, 0);
        one_pixel_font(255).draw_text(&mut canvas, 3, 4, "!", red, false, 1);
        assert_eq!(canvas.pixel(3, 4), red);
    }

    #[test]
    fn partial_alpha_lands_in_transparency_field() {
        let fmt = PixelFormat::argb8888();
        let mut canvas = Canvas::new(10, 10, fmt);
        let red = fmt.pack(0xFF, 0, 0);
        one_pixel_font(0x40).draw_text(&mut canvas, 3, 4, "!", red, false, 1);
        assert_eq!(canvas.pixel(3, 4).raw(), 0x40FF0000);
    }

    #[test]
    fn zero_alpha_leaves_destination_untouched() {
        let fmt = PixelFormat::argb8888();
        let mut canvas = Canvas::new(10, 10, fmt);
        canvas.fill_rect(0, 0, 10, 10, fmt.pack(0, 0xFF, 0));
        one_pixel_font(0).draw_text(&mut canvas, 3, 4, "!", fmt.pack(0xFF, 0, 0), false, 1);
        assert_eq!(canvas.pixel(3, 4), fmt.pack(0, 0xFF, 0));
    }

    #[test]
    fn text_fully_outside_draws_nothing() {
        let fmt = PixelFormat::argb8888();
        let store = FontStore::load();
        let mut canvas = Canvas::new(30, 30, fmt);
        let font = store.get(FontFamily::Font10x18);
        font.draw_text(&mut canvas, 40, 40, "HI", fmt.pack(0xFF, 0xFF, 0xFF), false, 1);
        font.draw_text(&mut canvas, -5, 2, "HI", fmt.pack(0xFF, 0xFF, 0xFF), false, 1);
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn text_stops_before_crossing_the_edge() {
        let fmt = PixelFormat::argb8888();
        let store = FontStore::load();
        let font = store.get(FontFamily::Font10x18);
        // Width 25 fits two 10-pixel cells, not three.
        let mut canvas = Canvas::new(25, 20, fmt);
        let white = fmt.pack(0xFF, 0xFF, 0xFF);
        font.draw_text(&mut canvas, 0, 0, "HHH", white, false, 1);
        let third_cell_painted = (20..25)
            .any(|x| (0..20).any(|y| canvas.pixel(x, y) == white));
        assert!(!third_cell_painted, "third glyph crossed the bound");
        // The first two glyphs did land.
        assert!((0..20).any(|x| (0..18).any(|y| canvas.pixel(x, y) == white)));
    }

    #[test]
    fn scale_replicates_source_pixels() {
        let fmt = PixelFormat::argb8888();
        let mut canvas = Canvas::new(10, 10, fmt);
        let red = fmt.pack(0xFF, 0, 0);
        one_pixel_font(255).draw_text(&mut canvas, 2, 2, "!", red, false, 3);
        for y in 2..5 {
            for x in 2..5 {
                assert_eq!(canvas.pixel(x, y), red, "({x},{y})");
            }
        }
        assert_eq!(canvas.pixel(5, 2), Color(0));
    }

    #[test]
    fn bold_falls_back_when_asset_has_no_bold_band() {
        let fmt = PixelFormat::argb8888();
        let mut plain = Canvas::new(10, 10, fmt);
        let mut bolded = Canvas::new(10, 10, fmt);
        let font = one_pixel_font(255);
        assert!(!font.has_bold());
        let red = fmt.pack(0xFF, 0, 0);
        font.draw_text(&mut plain, 0, 0, "!", red, false, 1);
        font.draw_text(&mut bolded, 0, 0, "!", red, true, 1);
        assert_eq!(plain.data(), bolded.data());
    }

    #[test]
    fn bold_band_is_distinct_in_embedded_assets() {
        let fmt = PixelFormat::argb8888();
        let store = FontStore::load();
        let font = store.get(FontFamily::Font12x22);
        let white = fmt.pack(0xFF, 0xFF, 0xFF);
        let mut plain = Canvas::new(40, 40, fmt);
        let mut bolded = Canvas::new(40, 40, fmt);
        font.draw_text(&mut plain, 0, 0, "I", white, false, 1);
        font.draw_text(&mut bolded, 0, 0, "I", white, true, 1);
        let count = |c: &Canvas| c.data().iter().filter(|&&b| b != 0).count();
        assert!(count(&bolded) > count(&plain), "bold should cover more pixels");
    }

    #[test]
    fn unprintable_characters_consume_their_advance() {
        let fmt = PixelFormat::argb8888();
        let mut with_tab = Canvas::new(10, 10, fmt);
        let mut spaced = Canvas::new(10, 10, fmt);
        let font = one_pixel_font(255);
        let red = fmt.pack(0xFF, 0, 0);
        font.draw_text(&mut with_tab, 0, 0, "\t!", red, false, 1);
        font.draw_text(&mut spaced, 0, 0, " !", red, false, 1);
        assert_eq!(with_tab.data(), spaced.data());
    }
}
