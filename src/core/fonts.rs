//! Banner fonts: a TrueType/OpenType face when one can be found, otherwise
//! the built-in 8x8 bitmap font scaled to the requested pixel size.

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use std::path::Path;

/// Tried in order when no font path is configured.
const SYSTEM_FONT_CANDIDATES: [&str; 8] = [
    "arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

const BITMAP_GLYPH_SIZE: u32 = 8;

#[derive(Clone)]
pub enum BannerFont {
    Outline(FontArc),
    Bitmap,
}

impl std::fmt::Debug for BannerFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BannerFont::Outline(_) => f.write_str("BannerFont::Outline"),
            BannerFont::Bitmap => f.write_str("BannerFont::Bitmap"),
        }
    }
}

impl BannerFont {
    /// Load `configured` if given, else the first system font that parses,
    /// else fall back to the bitmap font.
    pub fn load(configured: Option<&str>) -> Self {
        if let Some(path) = configured {
            match read_font(Path::new(path)) {
                Some(font) => {
                    tracing::info!("Using font {}", path);
                    return BannerFont::Outline(font);
                }
                None => tracing::warn!("Configured font {} could not be loaded", path),
            }
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            if let Some(font) = read_font(Path::new(candidate)) {
                tracing::info!("Using font {}", candidate);
                return BannerFont::Outline(font);
            }
        }

        tracing::warn!("No TrueType font found, falling back to the built-in bitmap font");
        BannerFont::Bitmap
    }

    /// Width and height in pixels of `text` at `size`.
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            BannerFont::Outline(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                let mut width = 0.0f32;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                let height = scaled.ascent() - scaled.descent();
                (width.ceil().max(0.0) as u32, height.ceil().max(0.0) as u32)
            }
            BannerFont::Bitmap => {
                let cell = bitmap_scale(size) * BITMAP_GLYPH_SIZE;
                (cell * text.chars().count() as u32, cell)
            }
        }
    }

    /// Draw `text` with its bounding box centred on (`cx`, `cy`).
    /// Pixels falling outside the canvas are clipped.
    pub fn draw_centered(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        cx: i32,
        cy: i32,
        size: f32,
        color: Rgb<u8>,
    ) {
        let (width, height) = self.measure(text, size);
        let left = cx - width as i32 / 2;
        let top = cy - height as i32 / 2;

        match self {
            BannerFont::Outline(font) => draw_outline(canvas, font, text, left, top, size, color),
            BannerFont::Bitmap => draw_bitmap(canvas, text, left, top, size, color),
        }
    }
}

fn read_font(path: &Path) -> Option<FontArc> {
    let data = std::fs::read(path).ok()?;
    FontArc::try_from_vec(data).ok()
}

fn bitmap_scale(size: f32) -> u32 {
    ((size / BITMAP_GLYPH_SIZE as f32).round() as u32).max(1)
}

fn draw_outline(
    canvas: &mut RgbImage,
    font: &FontArc,
    text: &str,
    left: i32,
    top: i32,
    size: f32,
    color: Rgb<u8>,
) {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);
    let baseline = top as f32 + scaled.ascent();
    let mut caret = left as f32;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            blend(canvas, x, y, color, coverage);
        });
    }
}

fn draw_bitmap(canvas: &mut RgbImage, text: &str, left: i32, top: i32, size: f32, color: Rgb<u8>) {
    let scale = bitmap_scale(size) as i32;
    let cell = scale * BITMAP_GLYPH_SIZE as i32;

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = BASIC_FONTS.get(c).or_else(|| LATIN_FONTS.get(c)) else {
            continue;
        };
        let origin_x = left + cell * i as i32;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..BITMAP_GLYPH_SIZE as i32 {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = top + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend(canvas, x0 + dx, y0 + dy, color, 1.0);
                    }
                }
            }
        }
    }
}

fn blend(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color.0) {
        let mixed = *channel as f32 * (1.0 - coverage) + target as f32 * coverage;
        *channel = mixed.round() as u8;
    }
}
