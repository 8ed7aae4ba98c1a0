//! Drawing-surface capability.
//!
//! Fields and effects never touch a concrete drawing API: they draw through
//! [`RenderTarget`], which the host implements over a browser canvas, a GPU
//! surface, or (for headless runs and tests) a CPU buffer.

use thiserror::Error;

use crate::color::Rgba;
use crate::error::EngineError;
use crate::source::PixelMask;
use crate::vector::Vector2;

/// Size of a drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Creates bounds, rejecting zero, negative or non-finite sizes.
    pub fn new(width: f64, height: f64) -> Result<Self, EngineError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(EngineError::InvalidDimensions);
        }
        Ok(Self { width, height })
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, p: Vector2) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

/// Horizontal anchoring of drawn text relative to its position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
}

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Glyph height in pixels.
    pub size: f64,
    pub color: Rgba,
    /// Rotation about the anchor, in radians.
    pub angle: f64,
    pub align: TextAlign,
}

impl TextStyle {
    pub fn new(size: f64, color: Rgba) -> Self {
        Self {
            size,
            color,
            angle: 0.0,
            align: TextAlign::Center,
        }
    }

    pub fn rotated(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }
}

/// Failures reported by a drawing surface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// The surface is temporarily unusable; the next frame may succeed.
    #[error("surface unavailable: {0}")]
    Unavailable(String),

    /// Pixel readback is not permitted (e.g. a tainted canvas).
    #[error("pixel readback denied: {0}")]
    ReadbackDenied(String),

    /// The surface is gone for good.
    #[error("surface lost: {0}")]
    Lost(String),
}

impl RenderError {
    /// Whether skipping the current frame is enough to recover.
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::Unavailable(_))
    }
}

/// A 2D drawing surface supplied by the host.
pub trait RenderTarget {
    /// Current surface size.
    fn bounds(&self) -> Bounds;

    /// Resizes the surface, discarding its contents.
    fn resize(&mut self, bounds: Bounds) -> Result<(), RenderError>;

    /// Erases everything drawn since the last clear.
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Fills a circle.
    fn draw_circle(&mut self, center: Vector2, radius: f64, color: Rgba)
        -> Result<(), RenderError>;

    /// Draws a run of text anchored at `at` (vertical center of the glyphs).
    fn draw_text(&mut self, text: &str, at: Vector2, style: TextStyle) -> Result<(), RenderError>;

    /// Reads the current surface contents back as RGBA pixels.
    fn read_pixels(&self) -> Result<PixelMask, RenderError>;
}

impl<T: RenderTarget + ?Sized> RenderTarget for Box<T> {
    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }

    fn resize(&mut self, bounds: Bounds) -> Result<(), RenderError> {
        (**self).resize(bounds)
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        (**self).clear()
    }

    fn draw_circle(
        &mut self,
        center: Vector2,
        radius: f64,
        color: Rgba,
    ) -> Result<(), RenderError> {
        (**self).draw_circle(center, radius, color)
    }

    fn draw_text(&mut self, text: &str, at: Vector2, style: TextStyle) -> Result<(), RenderError> {
        (**self).draw_text(text, at, style)
    }

    fn read_pixels(&self) -> Result<PixelMask, RenderError> {
        (**self).read_pixels()
    }
}

/// In-memory target that records draw calls, for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One recorded draw call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Clear,
        Circle(Vector2, f64, Rgba),
        Text(String, Vector2, TextStyle),
    }

    /// Records calls; can be told to fail in specific ways.
    #[derive(Debug)]
    pub struct RecordingTarget {
        pub bounds: Bounds,
        pub calls: Vec<Call>,
        pub fail_draws: Option<RenderError>,
        pub deny_readback: bool,
        /// Pixels returned by `read_pixels`; transparent when `None`.
        pub readback: Option<PixelMask>,
    }

    impl RecordingTarget {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                bounds: Bounds::new(width, height).unwrap(),
                calls: Vec::new(),
                fail_draws: None,
                deny_readback: false,
                readback: None,
            }
        }

        pub fn circles(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Circle(..)))
                .count()
        }

        pub fn texts(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Text(..)))
                .count()
        }
    }

    impl RenderTarget for RecordingTarget {
        fn bounds(&self) -> Bounds {
            self.bounds
        }

        fn resize(&mut self, bounds: Bounds) -> Result<(), RenderError> {
            self.bounds = bounds;
            Ok(())
        }

        fn clear(&mut self) -> Result<(), RenderError> {
            if let Some(err) = &self.fail_draws {
                return Err(err.clone());
            }
            self.calls.clear();
            self.calls.push(Call::Clear);
            Ok(())
        }

        fn draw_circle(
            &mut self,
            center: Vector2,
            radius: f64,
            color: Rgba,
        ) -> Result<(), RenderError> {
            if let Some(err) = &self.fail_draws {
                return Err(err.clone());
            }
            self.calls.push(Call::Circle(center, radius, color));
            Ok(())
        }

        fn draw_text(
            &mut self,
            text: &str,
            at: Vector2,
            style: TextStyle,
        ) -> Result<(), RenderError> {
            if let Some(err) = &self.fail_draws {
                return Err(err.clone());
            }
            self.calls.push(Call::Text(text.to_string(), at, style));
            Ok(())
        }

        fn read_pixels(&self) -> Result<PixelMask, RenderError> {
            if self.deny_readback {
                return Err(RenderError::ReadbackDenied("test".into()));
            }
            match &self.readback {
                Some(mask) => Ok(mask.clone()),
                None => {
                    let w = self.bounds.width as usize;
                    let h = self.bounds.height as usize;
                    PixelMask::new(w, h).map_err(|e| RenderError::Lost(e.to_string()))
                }
            }
        }
    }
}
