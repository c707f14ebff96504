//! RGB frame buffer with grid blitting and bitmap text.

use crate::schema::{ColorScheme, Rgb};

use super::font::{ADVANCE, GLYPH_H, GLYPH_W, glyph, glyph_pixel, text_width};

/// Number of discrete gradient levels.
pub const GRADIENT_LEVELS: usize = 256;

/// Two-color gradient sampled into [`GRADIENT_LEVELS`] entries.
#[derive(Debug, Clone)]
pub struct Gradient {
    lut: Vec<Rgb>,
}

impl Gradient {
    /// Dead color at intensity 0.0, alive color at 1.0, linear in between.
    pub fn from_scheme(scheme: &ColorScheme) -> Self {
        let dead = scheme.dead_rgb();
        let alive = scheme.alive_rgb();
        let last = (GRADIENT_LEVELS - 1) as f32;
        let lut = (0..GRADIENT_LEVELS)
            .map(|i| dead.lerp(alive, i as f32 / last))
            .collect();
        Self { lut }
    }

    /// Color for an intensity; values outside [0, 1] are clamped.
    #[inline]
    pub fn color(&self, intensity: f32) -> Rgb {
        let level = (intensity.clamp(0.0, 1.0) * GRADIENT_LEVELS as f32) as usize;
        self.lut[level.min(GRADIENT_LEVELS - 1)]
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    /// Largest rectangle with the aspect ratio of `w`x`h` centered in `self`.
    pub fn fit(&self, w: usize, h: usize) -> Rect {
        if w == 0 || h == 0 || self.width == 0 || self.height == 0 {
            return Rect { width: 0, height: 0, ..*self };
        }
        // Compare width/height ratios without floats: w * H vs h * W.
        let (width, height) = if w * self.height >= h * self.width {
            (self.width, (h * self.width / w).max(1))
        } else {
            ((w * self.height / h).max(1), self.height)
        };
        Rect {
            x: self.x + (self.width - width) / 2,
            y: self.y + (self.height - height) / 2,
            width,
            height,
        }
    }
}

/// RGB24 frame, row-major, 3 bytes per pixel.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    buf: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            buf: vec![0u8; width * height * 3],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGB24 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let i = (y * self.width + x) * 3;
        Rgb([self.buf[i], self.buf[i + 1], self.buf[i + 2]])
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.buf[i..i + 3].copy_from_slice(&color.0);
        }
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.buf.chunks_exact_mut(3) {
            px.copy_from_slice(&color.0);
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        for y in rect.y..(rect.y + rect.height).min(self.height) {
            for x in rect.x..(rect.x + rect.width).min(self.width) {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Draw a `grid_w`x`grid_h` intensity grid scaled (nearest neighbour)
    /// into `target`.
    pub fn blit_grid(
        &mut self,
        grid: &[f32],
        grid_w: usize,
        grid_h: usize,
        target: Rect,
        gradient: &Gradient,
    ) {
        if target.width == 0 || target.height == 0 || grid.len() < grid_w * grid_h {
            return;
        }
        let x_end = (target.x + target.width).min(self.width);
        let y_end = (target.y + target.height).min(self.height);

        for py in target.y..y_end {
            let gy = (py - target.y) * grid_h / target.height;
            let row = &grid[gy * grid_w..(gy + 1) * grid_w];
            let line = py * self.width;
            for px in target.x..x_end {
                let gx = (px - target.x) * grid_w / target.width;
                let i = (line + px) * 3;
                self.buf[i..i + 3].copy_from_slice(&gradient.color(row[gx]).0);
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`), each font pixel
    /// `scale` canvas pixels wide. Characters without a glyph are skipped
    /// and take no space.
    pub fn draw_text(&mut self, x: usize, y: usize, text: &str, scale: usize, color: Rgb) {
        for (i, rows) in text.chars().filter_map(glyph).enumerate() {
            let ox = x + i * ADVANCE * scale;
            for row in 0..GLYPH_H {
                for col in 0..GLYPH_W {
                    if glyph_pixel(rows, col, row) {
                        self.fill_rect(
                            Rect {
                                x: ox + col * scale,
                                y: y + row * scale,
                                width: scale,
                                height: scale,
                            },
                            color,
                        );
                    }
                }
            }
        }
    }

    /// Draw `text` horizontally centered on the canvas at row `y`.
    pub fn draw_text_centered(&mut self, y: usize, text: &str, scale: usize, color: Rgb) {
        let w = text_width(text) * scale;
        let x = self.width.saturating_sub(w) / 2;
        self.draw_text(x, y, text, scale, color);
    }

    /// Centered text thickened by drawing it twice, one pixel apart.
    pub fn draw_text_centered_bold(&mut self, y: usize, text: &str, scale: usize, color: Rgb) {
        let w = text_width(text) * scale + 1;
        let x = self.width.saturating_sub(w) / 2;
        self.draw_text(x, y, text, scale, color);
        self.draw_text(x + 1, y, text, scale, color);
    }
}

/// Height in canvas pixels of one text line at `scale`.
pub fn line_height(scale: usize) -> usize {
    GLYPH_H * scale
}

/// Largest scale up to `preferred` at which `text` fits in `width`
/// pixels. Never below 1.
pub fn fit_scale(text: &str, preferred: usize, width: usize) -> usize {
    match text_width(text) {
        0 => preferred.max(1),
        w => preferred.min(width / w).max(1),
    }
}
