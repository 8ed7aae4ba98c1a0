//! Immutable field configuration.
//!
//! A [`FieldConfig`] is plain serde data. Effects start from a preset and
//! merge JSON overrides onto it with [`FieldConfig::with_overrides`]; every
//! path into a running field goes through [`FieldConfig::validate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::field::Scatter;
use crate::palette::{Coloring, Palette};
use crate::params;
use crate::particle::{Dynamics, Mode};
use crate::pointer::PointerStart;
use crate::prng::Xorshift64;
use crate::source::Density;
use crate::trigger::TriggerPolicy;

/// Inclusive range of particle radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: f64,
    pub max: f64,
}

impl RadiusRange {
    pub fn fixed(radius: f64) -> Self {
        Self {
            min: radius,
            max: radius,
        }
    }

    /// A radius in the range; fixed ranges consume no randomness.
    pub fn pick(&self, rng: &mut Xorshift64) -> f64 {
        if self.max > self.min {
            rng.next_range(self.min, self.max)
        } else {
            self.min
        }
    }
}

impl Default for RadiusRange {
    fn default() -> Self {
        Self::fixed(1.0)
    }
}

/// Everything that shapes a field apart from its source and surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldConfig {
    pub density: Density,
    /// Mode before the trigger fires.
    pub mode: Mode,
    pub trigger: TriggerPolicy,
    pub pointer_radius: f64,
    pub pointer_strength: f64,
    pub convergence_factor: f64,
    pub friction: f64,
    pub jitter: f64,
    pub alpha_threshold: u8,
    pub palette: Palette,
    pub coloring: Coloring,
    pub radius: RadiusRange,
    pub scatter: Scatter,
    /// Fade particles with distance to the pointer and hide those outside
    /// the pointer radius.
    pub glow: bool,
    /// Share of grid points drawn as glyphs.
    pub glyph_ratio: f64,
    pub glyph_size: f64,
    pub pointer_start: PointerStart,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            density: Density::default(),
            mode: Mode::Scattered,
            trigger: TriggerPolicy::Immediate,
            pointer_radius: 80.0,
            pointer_strength: 3.0,
            convergence_factor: 0.05,
            friction: 0.0,
            jitter: 1.0,
            alpha_threshold: 50,
            palette: Palette::gold(),
            coloring: Coloring::default(),
            radius: RadiusRange::default(),
            scatter: Scatter::Canvas,
            glow: false,
            glyph_ratio: 0.3,
            glyph_size: 18.0,
            pointer_start: PointerStart::Inactive,
        }
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), EngineError> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(msg()))
    }
}

impl FieldConfig {
    /// Parses a full config from JSON; missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with `overrides` (a JSON object) merged on top.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, EngineError> {
        if overrides.is_null() {
            return Ok(self.clone());
        }
        if !overrides.is_object() {
            return Err(EngineError::InvalidConfig(
                "overrides must be a JSON object".to_string(),
            ));
        }
        let mut merged = serde_json::to_value(self)?;
        params::merge(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.density.validate()?;
        self.coloring.validate(&self.palette)?;

        let r = self.pointer_radius;
        check(r.is_finite() && r >= 0.0, || {
            format!("pointer_radius must be finite and >= 0, got {r}")
        })?;
        let s = self.pointer_strength;
        check(s.is_finite(), || {
            format!("pointer_strength must be finite, got {s}")
        })?;
        let k = self.convergence_factor;
        check((0.0..=1.0).contains(&k), || {
            format!("convergence_factor must be in [0, 1], got {k}")
        })?;
        let f = self.friction;
        check((0.0..1.0).contains(&f), || {
            format!("friction must be in [0, 1), got {f}")
        })?;
        let j = self.jitter;
        check(j.is_finite() && j >= 0.0, || {
            format!("jitter must be finite and >= 0, got {j}")
        })?;
        let RadiusRange { min, max } = self.radius;
        check(min.is_finite() && max.is_finite() && min > 0.0 && max >= min, || {
            format!("radius range must satisfy 0 < min <= max, got {min}..{max}")
        })?;
        let g = self.glyph_ratio;
        check((0.0..=1.0).contains(&g), || {
            format!("glyph_ratio must be in [0, 1], got {g}")
        })?;
        let gs = self.glyph_size;
        check(gs.is_finite() && gs > 0.0, || {
            format!("glyph_size must be positive, got {gs}")
        })?;
        if let TriggerPolicy::Visibility { threshold, .. } = self.trigger {
            check((0.0..=1.0).contains(&threshold), || {
                format!("visibility threshold must be in [0, 1], got {threshold}")
            })?;
        }
        self.scatter.validate()
    }

    /// Update-rule constants for this config.
    pub fn dynamics(&self) -> Dynamics {
        Dynamics {
            convergence: self.convergence_factor,
            pointer_radius: self.pointer_radius,
            pointer_strength: self.pointer_strength,
            friction: self.friction,
            jitter: self.jitter,
        }
    }
}
