//! Particle sources and sampling strategies.
//!
//! A [`Source`] describes where particle targets come from:
//!
//! - [`TextSource`]: text drawn through the [`RenderTarget`] and read back
//!   as a pixel mask;
//! - [`ImageSource`]: a decoded image mask, scaled to fit and centered;
//! - [`GridSource`]: a regular lattice covering the surface, with some
//!   points drawn as digit glyphs instead of dots.
//!
//! Mask sources are sampled on a square grid whose spacing comes from a
//! [`Density`]; only samples whose alpha exceeds the configured threshold
//! become particles.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::error::EngineError;
use crate::prng::Xorshift64;
use crate::render::{Bounds, RenderTarget, TextStyle};
use crate::vector::Vector2;

/// Upper bound on the samples one lattice may produce.
pub const MAX_SAMPLES: usize = 1_000_000;

/// RGBA8 pixel buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelMask {
    /// Fully transparent mask.
    ///
    /// Returns `EngineError::InvalidDimensions` if either dimension is zero
    /// or the byte length overflows.
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        let len = Self::byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Mask where every pixel is `color`.
    pub fn filled(width: usize, height: usize, color: Rgba) -> Result<Self, EngineError> {
        let mut mask = Self::new(width, height)?;
        mask.data
            .chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&[color.r, color.g, color.b, color.a]));
        Ok(mask)
    }

    /// Wraps an existing RGBA8 buffer, validating its length.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self, EngineError> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(EngineError::SourceUnreadable(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    fn byte_len(width: usize, height: usize) -> Result<usize, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(EngineError::InvalidDimensions)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`, or `None` outside the mask.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some(Rgba::new(
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ))
    }

    /// Overwrites the pixel at `(x, y)`; ignored outside the mask.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 4;
        self.data[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Number of pixels whose alpha exceeds `threshold`.
    pub fn coverage(&self, threshold: u8) -> usize {
        self.data
            .chunks_exact(4)
            .filter(|px| px[3] > threshold)
            .count()
    }

    /// Nearest-neighbour resample to `width x height`.
    pub fn resized(&self, width: usize, height: usize) -> Result<PixelMask, EngineError> {
        let mut out = PixelMask::new(width, height)?;
        for y in 0..height {
            let sy = (y * self.height / height).min(self.height - 1);
            for x in 0..width {
                let sx = (x * self.width / width).min(self.width - 1);
                if let Some(px) = self.pixel(sx, sy) {
                    out.set_pixel(x, y, px);
                }
            }
        }
        Ok(out)
    }
}

/// How densely a source is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    /// Aim for roughly this many samples over the sampled area.
    Count(usize),
    /// Fixed spacing in pixels.
    Step(f64),
    /// Spacing of `width / n`, so the surface is `n` samples across.
    Columns(usize),
}

impl Default for Density {
    fn default() -> Self {
        Density::Count(4000)
    }
}

impl Density {
    /// Checks that the density can produce a positive spacing.
    pub fn validate(&self) -> Result<(), EngineError> {
        match *self {
            Density::Count(0) => Err(EngineError::InvalidDensity(
                "particle count must be positive".to_string(),
            )),
            Density::Columns(0) => Err(EngineError::InvalidDensity(
                "column count must be positive".to_string(),
            )),
            Density::Step(s) if !(s.is_finite() && s >= 1.0) => Err(EngineError::InvalidDensity(
                format!("sampling step must be finite and at least 1 pixel, got {s}"),
            )),
            _ => Ok(()),
        }
    }

    /// Sampling spacing for a `width x height` area.
    ///
    /// `Count` yields `max(1, floor(sqrt(area / n)))`; `Columns` yields
    /// `max(1, round(width / n))`.
    pub fn spacing(&self, width: f64, height: f64) -> Result<f64, EngineError> {
        self.validate()?;
        let spacing = match *self {
            Density::Count(n) => (width * height / n as f64).sqrt().floor().max(1.0),
            Density::Step(s) => s,
            Density::Columns(n) => (width / n as f64).round().max(1.0),
        };
        Ok(spacing)
    }
}

/// One kept sample: a future particle target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vector2,
    /// Source pixel at the sample (opaque white for lattice points).
    pub color: Rgba,
    /// Glyph to draw instead of a dot.
    pub glyph: Option<char>,
}

/// Samples `mask` every `step` pixels, keeping pixels with alpha above
/// `threshold`. Sample positions are offset by `origin`.
pub fn sample_mask(mask: &PixelMask, step: usize, threshold: u8, origin: Vector2) -> Vec<Sample> {
    let step = step.max(1);
    let mut samples = Vec::new();
    for y in (0..mask.height()).step_by(step) {
        for x in (0..mask.width()).step_by(step) {
            let Some(px) = mask.pixel(x, y) else { continue };
            if px.a > threshold {
                samples.push(Sample {
                    position: origin + Vector2::new(x as f64, y as f64),
                    color: px,
                    glyph: None,
                });
            }
        }
    }
    samples
}

/// Text rasterized through the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSource {
    pub text: String,
    /// Glyph height as a fraction of surface width.
    pub size_ratio: f64,
    /// Vertical anchor as a fraction of surface height.
    pub baseline_ratio: f64,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size_ratio: 0.14,
            baseline_ratio: 1.0 / 1.6,
        }
    }

    /// Draws the text centered on `target`, reads the pixels back, then
    /// clears the surface again.
    pub fn rasterize(
        &self,
        bounds: Bounds,
        target: &mut dyn RenderTarget,
    ) -> Result<PixelMask, EngineError> {
        let at = Vector2::new(bounds.width / 2.0, bounds.height * self.baseline_ratio);
        let style = TextStyle::new(bounds.width * self.size_ratio, Rgba::WHITE);
        target.clear()?;
        target.draw_text(&self.text, at, style)?;
        let mask = target
            .read_pixels()
            .map_err(|e| EngineError::SourceUnreadable(e.to_string()))?;
        target.clear()?;
        Ok(mask)
    }
}

/// A decoded image used as a particle mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub mask: PixelMask,
    /// Largest side after scaling; images are only ever scaled down.
    pub max_size: Option<usize>,
}

impl ImageSource {
    pub fn new(mask: PixelMask) -> Self {
        Self {
            mask,
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Scales the image down to fit both `max_size` and `bounds`.
    /// Returns the scaled mask and the offset that centers it.
    pub fn fit(&self, bounds: Bounds) -> Result<(PixelMask, Vector2), EngineError> {
        let w = self.mask.width() as f64;
        let h = self.mask.height() as f64;
        let mut scale = (bounds.width / w).min(bounds.height / h);
        if let Some(max) = self.max_size {
            scale = scale.min(max as f64 / w).min(max as f64 / h);
        }
        let mask = if scale < 1.0 {
            let sw = ((w * scale).floor() as usize).max(1);
            let sh = ((h * scale).floor() as usize).max(1);
            self.mask.resized(sw, sh)?
        } else {
            self.mask.clone()
        };
        let offset = Vector2::new(
            ((bounds.width - mask.width() as f64) / 2.0).max(0.0).floor(),
            ((bounds.height - mask.height() as f64) / 2.0).max(0.0).floor(),
        );
        Ok((mask, offset))
    }
}

/// A regular lattice covering the whole surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSource {
    /// Glyphs chosen uniformly for glyph points.
    pub glyphs: Vec<char>,
}

impl Default for GridSource {
    fn default() -> Self {
        Self {
            glyphs: vec!['0', '1'],
        }
    }
}

impl GridSource {
    /// Every lattice point in `[0, width] x [0, height]` at `spacing`. Each
    /// point becomes a glyph with probability `glyph_ratio`.
    ///
    /// Fails with `InvalidDensity` when the lattice would exceed
    /// [`MAX_SAMPLES`] points.
    pub fn lattice(
        &self,
        bounds: Bounds,
        spacing: f64,
        glyph_ratio: f64,
        rng: &mut Xorshift64,
    ) -> Result<Vec<Sample>, EngineError> {
        let columns = (bounds.width / spacing).floor() as usize + 1;
        let rows = (bounds.height / spacing).floor() as usize + 1;
        let count = columns
            .checked_mul(rows)
            .filter(|&n| n <= MAX_SAMPLES)
            .ok_or_else(|| {
                EngineError::InvalidDensity(format!(
                    "spacing {spacing} gives a {columns}x{rows} lattice, \
                     more than {MAX_SAMPLES} points"
                ))
            })?;
        let mut samples = Vec::with_capacity(count);
        for row in 0..rows {
            for col in 0..columns {
                let glyph = if !self.glyphs.is_empty() && rng.chance(glyph_ratio) {
                    Some(self.glyphs[rng.next_usize(self.glyphs.len())])
                } else {
                    None
                };
                samples.push(Sample {
                    position: Vector2::new(col as f64 * spacing, row as f64 * spacing),
                    color: Rgba::WHITE,
                    glyph,
                });
            }
        }
        Ok(samples)
    }
}

/// Sampling knobs shared by every source kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub density: Density,
    /// Mask pixels must have alpha strictly above this.
    pub alpha_threshold: u8,
    /// Share of lattice points drawn as glyphs.
    pub glyph_ratio: f64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            density: Density::default(),
            alpha_threshold: 50,
            glyph_ratio: 0.0,
        }
    }
}

/// Where particle targets come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Text(TextSource),
    Image(ImageSource),
    Grid(GridSource),
}

impl Source {
    /// Short name of the sampling strategy (`text`, `image`, `grid`).
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Text(_) => "text",
            Source::Image(_) => "image",
            Source::Grid(_) => "grid",
        }
    }

    /// Produces the samples for a surface of `bounds`.
    ///
    /// Text sources draw through `target` and need pixel readback; image and
    /// grid sources leave the target untouched.
    pub fn samples(
        &self,
        bounds: Bounds,
        sampling: &Sampling,
        target: &mut dyn RenderTarget,
        rng: &mut Xorshift64,
    ) -> Result<Vec<Sample>, EngineError> {
        let Sampling {
            density,
            alpha_threshold,
            glyph_ratio,
        } = *sampling;
        match self {
            Source::Text(text) => {
                let mask = text.rasterize(bounds, target)?;
                let step = density.spacing(mask.width() as f64, mask.height() as f64)?;
                Ok(sample_mask(&mask, step as usize, alpha_threshold, Vector2::ZERO))
            }
            Source::Image(image) => {
                let (mask, offset) = image.fit(bounds)?;
                let step = density.spacing(mask.width() as f64, mask.height() as f64)?;
                Ok(sample_mask(&mask, step as usize, alpha_threshold, offset))
            }
            Source::Grid(grid) => {
                let spacing = density.spacing(bounds.width, bounds.height)?;
                grid.lattice(bounds, spacing, glyph_ratio, rng)
            }
        }
    }
}
