//! CPU RGBA render target for headless runs.
//!
//! Draws with straight-alpha source-over blending into a transparent
//! buffer. The background color is only applied when the frame is
//! flattened for output, so text rasterized for sampling reads back with
//! meaningful alpha.

use particle_fx_core::color::Rgba;
use particle_fx_core::error::EngineError;
use particle_fx_core::render::{Bounds, RenderError, RenderTarget, TextAlign, TextStyle};
use particle_fx_core::source::PixelMask;
use particle_fx_core::vector::Vector2;

use crate::font;

/// In-memory RGBA canvas.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pixels: PixelMask,
    background: Rgba,
}

fn lost(e: EngineError) -> RenderError {
    RenderError::Lost(e.to_string())
}

impl RasterCanvas {
    pub fn new(width: usize, height: usize, background: Rgba) -> Result<Self, EngineError> {
        Ok(Self {
            pixels: PixelMask::new(width, height)?,
            background,
        })
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn set_background(&mut self, background: Rgba) {
        self.background = background;
    }

    /// Drawn pixels over a transparent backdrop.
    pub fn pixels(&self) -> &PixelMask {
        &self.pixels
    }

    /// Drawn pixels composited over the background.
    pub fn flattened(&self) -> PixelMask {
        let mut out = self.pixels.clone();
        for y in 0..out.height() {
            for x in 0..out.width() {
                if let Some(px) = self.pixels.pixel(x, y) {
                    out.set_pixel(x, y, px.over(self.background));
                }
            }
        }
        out
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if let Some(dst) = self.pixels.pixel(x, y) {
            self.pixels.set_pixel(x, y, color.over(dst));
        }
    }

    /// Inclusive pixel range covering `[lo, hi]`, clipped to `0..len`.
    fn span(lo: f64, hi: f64, len: usize) -> std::ops::Range<i64> {
        let start = lo.floor().max(0.0) as i64;
        let end = (hi.ceil() as i64).min(len as i64);
        start..end.max(start)
    }
}

impl RenderTarget for RasterCanvas {
    fn bounds(&self) -> Bounds {
        Bounds {
            width: self.pixels.width() as f64,
            height: self.pixels.height() as f64,
        }
    }

    fn resize(&mut self, bounds: Bounds) -> Result<(), RenderError> {
        let width = bounds.width.round().max(1.0) as usize;
        let height = bounds.height.round().max(1.0) as usize;
        self.pixels = PixelMask::new(width, height).map_err(lost)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.pixels = PixelMask::new(self.pixels.width(), self.pixels.height()).map_err(lost)?;
        Ok(())
    }

    fn draw_circle(
        &mut self,
        center: Vector2,
        radius: f64,
        color: Rgba,
    ) -> Result<(), RenderError> {
        if !center.is_finite() || !radius.is_finite() || color.a == 0 {
            return Ok(());
        }
        // sub-pixel dots still cover the pixel they sit in
        if radius < 1.0 {
            self.blend(center.x.floor() as i64, center.y.floor() as i64, color);
            return Ok(());
        }
        let r2 = radius * radius;
        let w = self.pixels.width();
        let h = self.pixels.height();
        for y in Self::span(center.y - radius, center.y + radius, h) {
            for x in Self::span(center.x - radius, center.x + radius, w) {
                let d = Vector2::new(x as f64 + 0.5, y as f64 + 0.5) - center;
                if d.length_squared() <= r2 {
                    self.blend(x, y, color);
                }
            }
        }
        Ok(())
    }

    /// Draws `text` with the bitmap font, rotated about `at` by
    /// `style.angle`. Each destination pixel is mapped back into text space
    /// and lit if it falls on a glyph cell.
    fn draw_text(&mut self, text: &str, at: Vector2, style: TextStyle) -> Result<(), RenderError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty()
            || style.size.is_nan()
            || style.size <= 0.0
            || !at.is_finite()
            || style.color.a == 0
        {
            return Ok(());
        }
        let unit = style.size / font::GLYPH_HEIGHT as f64;
        let width = font::text_width(text, style.size);
        let anchor = Vector2::new(
            match style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => width / 2.0,
            },
            style.size / 2.0,
        );
        let rotation = Vector2::from_angle(style.angle);
        let inverse = Vector2::new(rotation.x, -rotation.y);

        let corners = [
            Vector2::ZERO,
            Vector2::new(width, 0.0),
            Vector2::new(0.0, style.size),
            Vector2::new(width, style.size),
        ]
        .map(|c| at + rotation.rotate(c - anchor));
        let min = corners.iter().copied().fold(Vector2::splat(f64::INFINITY), Vector2::min);
        let max = corners
            .iter()
            .copied()
            .fold(Vector2::splat(f64::NEG_INFINITY), Vector2::max);

        for y in Self::span(min.y, max.y, self.pixels.height()) {
            for x in Self::span(min.x, max.x, self.pixels.width()) {
                let world = Vector2::new(x as f64 + 0.5, y as f64 + 0.5);
                let local = inverse.rotate(world - at) + anchor;
                if local.x < 0.0 || local.y < 0.0 || local.x >= width || local.y >= style.size {
                    continue;
                }
                let column = (local.x / unit) as usize;
                let row = (local.y / unit) as usize;
                let Some(&c) = chars.get(column / font::ADVANCE) else {
                    continue;
                };
                if font::lit(c, column % font::ADVANCE, row) {
                    self.blend(x, y, style.color);
                }
            }
        }
        Ok(())
    }

    fn read_pixels(&self) -> Result<PixelMask, RenderError> {
        Ok(self.pixels.clone())
    }
}
