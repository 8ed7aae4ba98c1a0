//! Ordered color palettes and the rules that assign them to particles.
//!
//! A [`Palette`] is a non-empty ordered list of [`Rgba`] colors. How a
//! particle picks its color from the palette is a [`Coloring`] rule chosen by
//! configuration: luminance bands of the sampled source pixel, cycling in
//! sample order, random choice, the source pixel itself, or by particle shape.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::error::EngineError;
use crate::prng::Xorshift64;

/// Names accepted by [`Palette::from_name`].
const PALETTE_NAMES: &[&str] = &["gold", "neon", "pastel", "matrix", "mono"];

/// A non-empty ordered sequence of colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rgba>", into = "Vec<Rgba>")]
pub struct Palette {
    colors: Vec<Rgba>,
}

impl Palette {
    /// Creates a palette. Requires at least one color.
    pub fn new(colors: Vec<Rgba>) -> Result<Self, EngineError> {
        if colors.is_empty() {
            return Err(EngineError::InvalidPalette(
                "palette requires at least 1 color".to_string(),
            ));
        }
        Ok(Self { colors })
    }

    /// Creates a palette by parsing hex strings (`#rrggbb` or `#rrggbbaa`).
    pub fn from_hex(hexes: &[&str]) -> Result<Self, EngineError> {
        let colors: Result<Vec<Rgba>, EngineError> =
            hexes.iter().map(|h| Rgba::from_hex(h)).collect();
        Self::new(colors?)
    }

    /// Number of colors in the palette.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false for a constructed palette.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// All colors in order.
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Color at `index`, wrapping around the palette length.
    pub fn cycle(&self, index: usize) -> Rgba {
        self.colors[index % self.colors.len()]
    }

    /// Uniformly random color.
    pub fn pick(&self, rng: &mut Xorshift64) -> Rgba {
        self.colors[rng.next_usize(self.colors.len())]
    }

    /// Maps a luminance value onto a palette color through descending
    /// `thresholds`: the first threshold the value exceeds selects the color
    /// at the same index; values exceeding none get the last color.
    pub fn band(&self, luminance: f64, thresholds: &[f64]) -> Rgba {
        let idx = thresholds
            .iter()
            .position(|&t| luminance > t)
            .unwrap_or(thresholds.len());
        self.cycle(idx)
    }

    // -- Built-in palettes --

    /// Background slate plus two golds: bright source areas disappear into
    /// the background, mid tones go bright gold, darks go deep gold.
    pub fn gold() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(31, 36, 45),
                Rgba::rgb(218, 165, 32),
                Rgba::rgb(184, 134, 11),
            ],
        }
    }

    /// Translucent red, yellow, blue, ice and lilac.
    pub fn neon() -> Self {
        Self {
            colors: vec![
                Rgba::new(239, 51, 51, 217),
                Rgba::new(239, 219, 51, 191),
                Rgba::new(51, 51, 239, 217),
                Rgba::new(192, 213, 255, 217),
                Rgba::new(244, 223, 254, 191),
            ],
        }
    }

    /// Soft purple, peach, green, yellow and sky for word tags.
    pub fn pastel() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(184, 144, 240),
                Rgba::rgb(244, 166, 130),
                Rgba::rgb(177, 216, 128),
                Rgba::rgb(249, 241, 141),
                Rgba::rgb(201, 225, 236),
            ],
        }
    }

    /// Gold dots and grey digits.
    pub fn matrix() -> Self {
        Self {
            colors: vec![Rgba::rgb(184, 134, 11), Rgba::rgb(100, 100, 100)],
        }
    }

    /// Single white color.
    pub fn mono() -> Self {
        Self {
            colors: vec![Rgba::WHITE],
        }
    }

    /// Looks up a built-in palette by name.
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name {
            "gold" => Ok(Self::gold()),
            "neon" => Ok(Self::neon()),
            "pastel" => Ok(Self::pastel()),
            "matrix" => Ok(Self::matrix()),
            "mono" => Ok(Self::mono()),
            other => Err(EngineError::InvalidPalette(format!(
                "unknown palette '{other}' (expected one of: {})",
                PALETTE_NAMES.join(", ")
            ))),
        }
    }

    /// Names of all built-in palettes.
    pub fn list_names() -> &'static [&'static str] {
        PALETTE_NAMES
    }
}

impl TryFrom<Vec<Rgba>> for Palette {
    type Error = EngineError;

    fn try_from(colors: Vec<Rgba>) -> Result<Self, Self::Error> {
        Self::new(colors)
    }
}

impl From<Palette> for Vec<Rgba> {
    fn from(p: Palette) -> Self {
        p.colors
    }
}

/// Rule assigning a palette color to each sampled particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coloring {
    /// Luminance of the sampled pixel banded by descending thresholds.
    /// Requires `thresholds.len() + 1 == palette.len()`.
    Bands { thresholds: Vec<f64> },
    /// Palette colors in sample order, wrapping around.
    Cycle,
    /// Uniformly random palette color per particle.
    Random,
    /// The sampled source pixel, ignoring the palette.
    Source,
    /// Dots take the first palette color, glyphs the second.
    ByShape,
}

impl Default for Coloring {
    fn default() -> Self {
        Coloring::Bands {
            thresholds: vec![220.0, 80.0],
        }
    }
}

impl Coloring {
    /// Checks the rule against the palette it will be applied to.
    pub fn validate(&self, palette: &Palette) -> Result<(), EngineError> {
        match self {
            Coloring::Bands { thresholds } => {
                if thresholds.len() + 1 != palette.len() {
                    return Err(EngineError::InvalidPalette(format!(
                        "{} luminance thresholds need {} palette colors, got {}",
                        thresholds.len(),
                        thresholds.len() + 1,
                        palette.len()
                    )));
                }
                if thresholds.windows(2).any(|w| w[0] < w[1]) {
                    return Err(EngineError::InvalidConfig(
                        "luminance thresholds must be descending".to_string(),
                    ));
                }
                Ok(())
            }
            Coloring::ByShape if palette.len() < 2 => Err(EngineError::InvalidPalette(
                "by-shape coloring needs a dot color and a glyph color".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Resolves the color of the `index`-th sample.
    pub fn resolve(
        &self,
        palette: &Palette,
        index: usize,
        source: Rgba,
        glyph: bool,
        rng: &mut Xorshift64,
    ) -> Rgba {
        match self {
            Coloring::Bands { thresholds } => palette.band(source.luminance(), thresholds),
            Coloring::Cycle => palette.cycle(index),
            Coloring::Random => palette.pick(rng),
            Coloring::Source => source,
            Coloring::ByShape => palette.cycle(usize::from(glyph)),
        }
    }
}
