//! Offscreen caption rendering.

use fontdue::Font;

use crate::config::FontSpec;

/// Blank margin around the caption text, in pixels.
pub const CAPTION_PADDING: u32 = 10;
/// Line height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.2;

/// Single-colour caption bitmap ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Coverage mask of one glyph with its placement relative to the pen.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphImage {
    pub left: i32,
    pub bottom: i32,
    pub width: usize,
    pub height: usize,
    pub advance: f32,
    pub coverage: Vec<u8>,
}

/// Rasterises `text` with `font` at the size given by `spec` scaled by
/// `scale`, centred in a padded canvas.
pub fn render_caption(
    font: &Font,
    text: &str,
    spec: &FontSpec,
    scale: f32,
    color: [u8; 4],
) -> CaptionBitmap {
    let size = spec.size_px * scale;
    let glyphs: Vec<GlyphImage> = text
        .chars()
        .map(|ch| {
            let (metrics, coverage) = font.rasterize(ch, size);
            GlyphImage {
                left: metrics.xmin,
                bottom: metrics.ymin,
                width: metrics.width,
                height: metrics.height,
                advance: metrics.advance_width,
                coverage,
            }
        })
        .collect();
    let (ascent, descent) = font
        .horizontal_line_metrics(size)
        .map(|line| (line.ascent, line.descent))
        .unwrap_or((size * 0.8, -size * 0.2));
    compose_caption(&glyphs, size, ascent, descent, spec.bold, color)
}

/// Lays out pre-rasterised glyphs on one line and tints them.
pub fn compose_caption(
    glyphs: &[GlyphImage],
    size: f32,
    ascent: f32,
    descent: f32,
    bold: bool,
    color: [u8; 4],
) -> CaptionBitmap {
    let text_width = glyphs.iter().map(|glyph| glyph.advance).sum::<f32>().ceil() as u32;
    let text_height = (size * LINE_HEIGHT).ceil() as u32;
    let width = text_width + CAPTION_PADDING * 2;
    let height = text_height + CAPTION_PADDING * 2;

    let mut alpha = vec![0u8; (width * height) as usize];
    let baseline = height as f32 / 2.0 + (ascent + descent) / 2.0;
    let mut pen = CAPTION_PADDING as f32;
    for glyph in glyphs {
        let origin_x = (pen + glyph.left as f32).round() as i32;
        let origin_y = (baseline - (glyph.bottom as f32 + glyph.height as f32)).round() as i32;
        blit(&mut alpha, width, height, glyph, origin_x, origin_y);
        pen += glyph.advance;
    }
    if bold {
        embolden(&mut alpha, width as usize);
    }

    let mut rgba = Vec::with_capacity(alpha.len() * 4);
    for coverage in alpha {
        let a = (coverage as u16 * color[3] as u16 / 255) as u8;
        rgba.extend_from_slice(&[color[0], color[1], color[2], a]);
    }
    CaptionBitmap {
        width,
        height,
        rgba,
    }
}

fn blit(target: &mut [u8], width: u32, height: u32, glyph: &GlyphImage, x0: i32, y0: i32) {
    for row in 0..glyph.height {
        let y = y0 + row as i32;
        if y < 0 || y >= height as i32 {
            continue;
        }
        for column in 0..glyph.width {
            let x = x0 + column as i32;
            if x < 0 || x >= width as i32 {
                continue;
            }
            let index = y as usize * width as usize + x as usize;
            let value = glyph.coverage[row * glyph.width + column];
            target[index] = target[index].max(value);
        }
    }
}

/// Widens strokes by one pixel to the right. Used when the caption asks for
/// a bold weight that the loaded font face does not carry.
fn embolden(alpha: &mut [u8], width: usize) {
    if width == 0 {
        return;
    }
    for row in alpha.chunks_mut(width) {
        for x in (1..row.len()).rev() {
            row[x] = row[x].max(row[x - 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(advance: f32) -> GlyphImage {
        GlyphImage {
            left: 0,
            bottom: 0,
            width: 2,
            height: 3,
            advance,
            coverage: vec![255; 6],
        }
    }

    #[test]
    fn canvas_is_padded_text_box() {
        let caption = compose_caption(&[block(5.0), block(5.5)], 24.0, 18.0, -6.0, false, [255; 4]);
        assert_eq!(caption.width, 11 + CAPTION_PADDING * 2);
        assert_eq!(caption.height, 29 + CAPTION_PADDING * 2);
        assert_eq!(caption.rgba.len(), (caption.width * caption.height * 4) as usize);
    }

    #[test]
    fn glyphs_are_tinted_with_the_text_color() {
        let caption = compose_caption(&[block(4.0)], 10.0, 8.0, -2.0, false, [10, 20, 30, 255]);
        let lit: Vec<&[u8]> = caption
            .rgba
            .chunks(4)
            .filter(|px| px[3] > 0)
            .collect();
        assert_eq!(lit.len(), 6);
        assert!(lit.iter().all(|px| **px == [10, 20, 30, 255]));
        let dark = caption.rgba.chunks(4).find(|px| px[3] == 0).unwrap();
        assert_eq!(&dark[..3], &[10, 20, 30]);
    }

    #[test]
    fn bold_widens_strokes() {
        let regular = compose_caption(&[block(4.0)], 10.0, 8.0, -2.0, false, [255; 4]);
        let bold = compose_caption(&[block(4.0)], 10.0, 8.0, -2.0, true, [255; 4]);
        let count = |c: &CaptionBitmap| c.rgba.chunks(4).filter(|px| px[3] > 0).count();
        assert_eq!(count(&regular), 6);
        assert_eq!(count(&bold), 9);
    }

    #[test]
    fn glyphs_outside_the_canvas_are_clipped() {
        let mut wide = block(1.0);
        wide.left = -50;
        let caption = compose_caption(&[wide], 10.0, 8.0, -2.0, false, [255; 4]);
        assert!(caption.rgba.chunks(4).all(|px| px[3] == 0));
    }
}
