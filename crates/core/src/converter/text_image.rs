//! Plain text rendered onto a PNG canvas with a built-in 8x8 bitmap font.
//!
//! No layout is attempted: one input line is one row of glyphs.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use super::adapter::Converted;
use super::document::extract_docx_text;
use super::error::AdapterError;

pub const PNG_MIME: &str = "image/png";

const GLYPH: u32 = 8;
const LINE_HEIGHT: u32 = GLYPH + 6;
const MARGIN_X: u32 = 12;
const MARGIN_Y: u32 = 10;
const MIN_WIDTH: u32 = 200;
const MIN_HEIGHT: u32 = 80;

/// Lines past this are dropped.
const MAX_LINES: usize = 500;
/// Characters per line past this are dropped.
const MAX_COLUMNS: usize = 240;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// txt -> png
pub fn txt_to_png(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = String::from_utf8_lossy(content);
    Ok(Converted::new(render_text_png(&text)?, PNG_MIME))
}

/// docx -> png, text only.
pub fn docx_to_png(content: &[u8], _hint: &str) -> Result<Converted, AdapterError> {
    let text = extract_docx_text(content)?;
    Ok(Converted::new(render_text_png(&text)?, PNG_MIME))
}

pub(crate) fn render_text_png(text: &str) -> Result<Vec<u8>, AdapterError> {
    let lines: Vec<Vec<char>> = text
        .lines()
        .take(MAX_LINES)
        .map(|line| {
            line.replace('\t', "    ")
                .chars()
                .take(MAX_COLUMNS)
                .collect()
        })
        .collect();

    let rows = lines.len().max(1) as u32;
    let columns = lines.iter().map(Vec::len).max().unwrap_or(0) as u32;
    let width = (columns * GLYPH + 2 * MARGIN_X).max(MIN_WIDTH);
    let height = (rows * LINE_HEIGHT + 2 * MARGIN_Y).max(MIN_HEIGHT);

    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    for (row, line) in lines.iter().enumerate() {
        let y = MARGIN_Y + row as u32 * LINE_HEIGHT;
        for (column, &c) in line.iter().enumerate() {
            draw_glyph(&mut canvas, MARGIN_X + column as u32 * GLYPH, y, c);
        }
    }

    let mut buf = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| AdapterError::encode("png", e))?;
    Ok(buf.into_inner())
}

fn draw_glyph(canvas: &mut RgbImage, x: u32, y: u32, c: char) {
    for (dy, bits) in glyph(c).iter().enumerate() {
        for dx in 0..GLYPH {
            if bits & (1 << dx) != 0 {
                canvas.put_pixel(x + dx, y + dy as u32, BLACK);
            }
        }
    }
}

/// Rows of `c`, least significant bit leftmost. Unprintable and non-ASCII
/// characters render as `?`.
fn glyph(c: char) -> &'static [u8; 8] {
    let code = c as u32;
    let index = if (0x20..0x7f).contains(&code) {
        code - 0x20
    } else {
        u32::from(b'?') - 0x20
    };
    &FONT[index as usize]
}

/// Printable ASCII, 0x20 through 0x7e (public domain font8x8 basic set).
static FONT: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x18, 0x3C, 0x3C, 0x18, 0x18, 0x00, 0x18, 0x00], // !
    [0x36, 0x36, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x36, 0x36, 0x7F, 0x36, 0x7F, 0x36, 0x36, 0x00], // #
    [0x0C, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x0C, 0x00], // $
    [0x00, 0x63, 0x33, 0x18, 0x0C, 0x66, 0x63, 0x00], // %
    [0x1C, 0x36, 0x1C, 0x6E, 0x3B, 0x33, 0x6E, 0x00], // &
    [0x06, 0x06, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x18, 0x0C, 0x06, 0x06, 0x06, 0x0C, 0x18, 0x00], // (
    [0x06, 0x0C, 0x18, 0x18, 0x18, 0x0C, 0x06, 0x00], // )
    [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // *
    [0x00, 0x0C, 0x0C, 0x3F, 0x0C, 0x0C, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ,
    [0x00, 0x00, 0x00, 0x3F, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C, 0x00], // .
    [0x60, 0x30, 0x18, 0x0C, 0x06, 0x03, 0x01, 0x00], // /
    [0x3E, 0x63, 0x73, 0x7B, 0x6F, 0x67, 0x3E, 0x00], // 0
    [0x0C, 0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x3F, 0x00], // 1
    [0x1E, 0x33, 0x30, 0x1C, 0x06, 0x33, 0x3F, 0x00], // 2
    [0x1E, 0x33, 0x30, 0x1C, 0x30, 0x33, 0x1E, 0x00], // 3
    [0x38, 0x3C, 0x36, 0x33, 0x7F, 0x30, 0x78, 0x00], // 4
    [0x3F, 0x03, 0x1F, 0x30, 0x30, 0x33, 0x1E, 0x00], // 5
    [0x1C, 0x06, 0x03, 0x1F, 0x33, 0x33, 0x1E, 0x00], // 6
    [0x3F, 0x33, 0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x00], // 7
    [0x1E, 0x33, 0x33, 0x1E, 0x33, 0x33, 0x1E, 0x00], // 8
    [0x1E, 0x33, 0x33, 0x3E, 0x30, 0x18, 0x0E, 0x00], // 9
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x00], // :
    [0x00, 0x0C, 0x0C, 0x00, 0x00, 0x0C, 0x0C, 0x06], // ;
    [0x18, 0x0C, 0x06, 0x03, 0x06, 0x0C, 0x18, 0x00], // <
    [0x00, 0x00, 0x3F, 0x00, 0x00, 0x3F, 0x00, 0x00], // =
    [0x06, 0x0C, 0x18, 0x30, 0x18, 0x0C, 0x06, 0x00], // >
    [0x1E, 0x33, 0x30, 0x18, 0x0C, 0x00, 0x0C, 0x00], // ?
    [0x3E, 0x63, 0x7B, 0x7B, 0x7B, 0x03, 0x1E, 0x00], // @
    [0x0C, 0x1E, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x00], // A
    [0x3F, 0x66, 0x66, 0x3E, 0x66, 0x66, 0x3F, 0x00], // B
    [0x3C, 0x66, 0x03, 0x03, 0x03, 0x66, 0x3C, 0x00], // C
    [0x1F, 0x36, 0x66, 0x66, 0x66, 0x36, 0x1F, 0x00], // D
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x46, 0x7F, 0x00], // E
    [0x7F, 0x46, 0x16, 0x1E, 0x16, 0x06, 0x0F, 0x00], // F
    [0x3C, 0x66, 0x03, 0x03, 0x73, 0x66, 0x7C, 0x00], // G
    [0x33, 0x33, 0x33, 0x3F, 0x33, 0x33, 0x33, 0x00], // H
    [0x1E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // I
    [0x78, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E, 0x00], // J
    [0x67, 0x66, 0x36, 0x1E, 0x36, 0x66, 0x67, 0x00], // K
    [0x0F, 0x06, 0x06, 0x06, 0x46, 0x66, 0x7F, 0x00], // L
    [0x63, 0x77, 0x7F, 0x7F, 0x6B, 0x63, 0x63, 0x00], // M
    [0x63, 0x67, 0x6F, 0x7B, 0x73, 0x63, 0x63, 0x00], // N
    [0x1C, 0x36, 0x63, 0x63, 0x63, 0x36, 0x1C, 0x00], // O
    [0x3F, 0x66, 0x66, 0x3E, 0x06, 0x06, 0x0F, 0x00], // P
    [0x1E, 0x33, 0x33, 0x33, 0x3B, 0x1E, 0x38, 0x00], // Q
    [0x3F, 0x66, 0x66, 0x3E, 0x36, 0x66, 0x67, 0x00], // R
    [0x1E, 0x33, 0x07, 0x0E, 0x38, 0x33, 0x1E, 0x00], // S
    [0x3F, 0x2D, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // T
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x3F, 0x00], // U
    [0x33, 0x33, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // V
    [0x63, 0x63, 0x63, 0x6B, 0x7F, 0x77, 0x63, 0x00], // W
    [0x63, 0x63, 0x36, 0x1C, 0x1C, 0x36, 0x63, 0x00], // X
    [0x33, 0x33, 0x33, 0x1E, 0x0C, 0x0C, 0x1E, 0x00], // Y
    [0x7F, 0x63, 0x31, 0x18, 0x4C, 0x66, 0x7F, 0x00], // Z
    [0x1E, 0x06, 0x06, 0x06, 0x06, 0x06, 0x1E, 0x00], // [
    [0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x40, 0x00], // backslash
    [0x1E, 0x18, 0x18, 0x18, 0x18, 0x18, 0x1E, 0x00], // ]
    [0x08, 0x1C, 0x36, 0x63, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF], // _
    [0x0C, 0x0C, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x1E, 0x30, 0x3E, 0x33, 0x6E, 0x00], // a
    [0x07, 0x06, 0x06, 0x3E, 0x66, 0x66, 0x3B, 0x00], // b
    [0x00, 0x00, 0x1E, 0x33, 0x03, 0x33, 0x1E, 0x00], // c
    [0x38, 0x30, 0x30, 0x3E, 0x33, 0x33, 0x6E, 0x00], // d
    [0x00, 0x00, 0x1E, 0x33, 0x3F, 0x03, 0x1E, 0x00], // e
    [0x1C, 0x36, 0x06, 0x0F, 0x06, 0x06, 0x0F, 0x00], // f
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x1F], // g
    [0x07, 0x06, 0x36, 0x6E, 0x66, 0x66, 0x67, 0x00], // h
    [0x0C, 0x00, 0x0E, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // i
    [0x30, 0x00, 0x30, 0x30, 0x30, 0x33, 0x33, 0x1E], // j
    [0x07, 0x06, 0x66, 0x36, 0x1E, 0x36, 0x67, 0x00], // k
    [0x0E, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x1E, 0x00], // l
    [0x00, 0x00, 0x33, 0x7F, 0x7F, 0x6B, 0x63, 0x00], // m
    [0x00, 0x00, 0x1F, 0x33, 0x33, 0x33, 0x33, 0x00], // n
    [0x00, 0x00, 0x1E, 0x33, 0x33, 0x33, 0x1E, 0x00], // o
    [0x00, 0x00, 0x3B, 0x66, 0x66, 0x3E, 0x06, 0x0F], // p
    [0x00, 0x00, 0x6E, 0x33, 0x33, 0x3E, 0x30, 0x78], // q
    [0x00, 0x00, 0x3B, 0x6E, 0x66, 0x06, 0x0F, 0x00], // r
    [0x00, 0x00, 0x3E, 0x03, 0x1E, 0x30, 0x1F, 0x00], // s
    [0x08, 0x0C, 0x3E, 0x0C, 0x0C, 0x2C, 0x18, 0x00], // t
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x33, 0x6E, 0x00], // u
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x1E, 0x0C, 0x00], // v
    [0x00, 0x00, 0x63, 0x6B, 0x7F, 0x7F, 0x36, 0x00], // w
    [0x00, 0x00, 0x63, 0x36, 0x1C, 0x36, 0x63, 0x00], // x
    [0x00, 0x00, 0x33, 0x33, 0x33, 0x3E, 0x30, 0x1F], // y
    [0x00, 0x00, 0x3F, 0x19, 0x0C, 0x26, 0x3F, 0x00], // z
    [0x38, 0x0C, 0x0C, 0x07, 0x0C, 0x0C, 0x38, 0x00], // {
    [0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00], // |
    [0x07, 0x0C, 0x0C, 0x38, 0x0C, 0x0C, 0x07, 0x00], // }
    [0x6E, 0x3B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ~
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::document::txt_to_docx;

    fn decode(png: &[u8]) -> RgbImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    fn ink(img: &RgbImage) -> usize {
        img.pixels().filter(|p| **p == BLACK).count()
    }

    #[test]
    fn test_txt_to_png_draws_text() {
        let result = txt_to_png(b"Hello, PNG", "png").unwrap();
        assert_eq!(result.mime_type, PNG_MIME);

        let img = decode(&result.content);
        assert_eq!(img.dimensions(), (MIN_WIDTH, MIN_HEIGHT));
        assert!(ink(&img) > 0);
    }

    #[test]
    fn test_empty_text_is_blank_minimum_canvas() {
        let img = decode(&txt_to_png(b"", "png").unwrap().content);
        assert_eq!(img.dimensions(), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(ink(&img), 0);
    }

    #[test]
    fn test_canvas_grows_with_text() {
        let text: String = (0..20)
            .map(|i| format!("{:02} {}\n", i, "x".repeat(60)))
            .collect();
        let img = decode(&txt_to_png(text.as_bytes(), "png").unwrap().content);

        assert_eq!(img.width(), 63 * GLYPH + 2 * MARGIN_X);
        assert_eq!(img.height(), 20 * LINE_HEIGHT + 2 * MARGIN_Y);
    }

    #[test]
    fn test_long_lines_are_clipped() {
        let text = "y".repeat(MAX_COLUMNS * 4);
        let img = decode(&txt_to_png(text.as_bytes(), "png").unwrap().content);

        assert_eq!(img.width(), MAX_COLUMNS as u32 * GLYPH + 2 * MARGIN_X);
        assert_eq!(img.height(), MIN_HEIGHT);
    }

    #[test]
    fn test_extra_lines_are_dropped() {
        let text = "y\n".repeat(MAX_LINES * 2);
        let img = decode(&txt_to_png(text.as_bytes(), "png").unwrap().content);

        assert_eq!(img.width(), MIN_WIDTH);
        assert_eq!(img.height(), MAX_LINES as u32 * LINE_HEIGHT + 2 * MARGIN_Y);
    }

    #[test]
    fn test_non_ascii_renders_placeholder() {
        assert_eq!(glyph('\u{e9}'), glyph('?'));
        assert_eq!(glyph('A'), &FONT[33]);
    }

    #[test]
    fn test_docx_to_png() {
        let docx = txt_to_docx(b"Quarterly report", "docx").unwrap();
        let result = docx_to_png(&docx.content, "png").unwrap();

        assert!(ink(&decode(&result.content)) > 0);
    }

    #[test]
    fn test_docx_to_png_rejects_non_zip() {
        assert!(matches!(
            docx_to_png(b"plain", "png"),
            Err(AdapterError::Decode { .. })
        ));
    }
}
