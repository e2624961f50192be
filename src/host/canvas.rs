//! Offscreen 2-D drawing surfaces and their content-addressed serialization

use sha2::{Digest, Sha256};

/// Fill color with straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Minimal 2-D drawing context
pub trait Canvas2d: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// CSS-like font shorthand; only the pixel size is honoured
    fn set_font(&mut self, font: &str);
    fn set_fill_style(&mut self, color: Rgba);
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Draw text with its alphabetic baseline at `y`
    fn fill_text(&mut self, text: &str, x: i32, y: i32);
    /// `sha256:<hex>` over the dimensions and pixel buffer
    fn serialize(&self) -> String;
}

const GLYPH_COLUMNS: i32 = 5;
const GLYPH_ROWS: i32 = 7;
const DEFAULT_FONT_PX: u32 = 10;

/// Software RGBA surface, initially fully transparent
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    fill: Rgba,
    font_px: u32,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            fill: Rgba::opaque(0, 0, 0),
            font_px: DEFAULT_FONT_PX,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Source-over composite of the current fill onto one pixel
    fn blend(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        let src_a = self.fill.a.clamp(0.0, 1.0);
        let dst_a = self.pixels[idx + 3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);

        if out_a <= 0.0 {
            self.pixels[idx..idx + 4].fill(0);
            return;
        }

        let source = [self.fill.r, self.fill.g, self.fill.b];
        for (channel, src) in source.iter().enumerate() {
            let dst = self.pixels[idx + channel] as f32;
            let value = (*src as f32 * src_a + dst * dst_a * (1.0 - src_a)) / out_a;
            self.pixels[idx + channel] = value.round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[idx + 3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// 5x7 cell pattern for a character, stable across runs
    fn glyph(ch: char) -> u64 {
        if ch.is_whitespace() {
            return 0;
        }
        (ch as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 29
    }
}

impl Canvas2d for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_font(&mut self, font: &str) {
        if let Some(px) = font
            .split_whitespace()
            .find_map(|token| token.strip_suffix("px")?.parse::<u32>().ok())
        {
            self.font_px = px.max(1);
        }
    }

    fn set_fill_style(&mut self, color: Rgba) {
        self.fill = color;
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                self.blend(x + dx, y + dy);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32) {
        let scale = (self.font_px as i32 / GLYPH_ROWS).max(1);
        let advance = (GLYPH_COLUMNS + 1) * scale;
        let top = y - GLYPH_ROWS * scale;

        for (position, ch) in text.chars().enumerate() {
            let pattern = Self::glyph(ch);
            let origin = x + position as i32 * advance;
            for row in 0..GLYPH_ROWS {
                for column in 0..GLYPH_COLUMNS {
                    if pattern & (1 << (row * GLYPH_COLUMNS + column)) == 0 {
                        continue;
                    }
                    self.fill_rect(origin + column * scale, top + row * scale, scale as u32, scale as u32);
                }
            }
        }
    }

    fn serialize(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_be_bytes());
        hasher.update(self.height.to_be_bytes());
        hasher.update(&self.pixels);
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

/// Surface of a host that blanks canvas readback
#[derive(Debug, Clone)]
pub struct BlockedCanvas {
    width: u32,
    height: u32,
}

impl BlockedCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Canvas2d for BlockedCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_font(&mut self, _font: &str) {}

    fn set_fill_style(&mut self, _color: Rgba) {}

    fn fill_rect(&mut self, _x: i32, _y: i32, _width: u32, _height: u32) {}

    fn fill_text(&mut self, _text: &str, _x: i32, _y: i32) {}

    fn serialize(&self) -> String {
        blank_baseline()
    }
}

/// Serialization of an empty 1x1 surface
pub fn blank_baseline() -> String {
    Bitmap::new(1, 1).serialize()
}
