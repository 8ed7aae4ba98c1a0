//! A single animated point and its per-frame update rule.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::pointer::Pointer;
use crate::prng::Xorshift64;
use crate::vector::{self, Vector2};

/// Reference frame duration: per-frame constants are tuned for 60 Hz.
pub const FRAME_SECONDS: f64 = 1.0 / 60.0;

/// Longest step a single update will integrate. Frames delivered after a
/// long pause (background tab, debugger) are clamped to this.
pub const MAX_DT: f64 = 0.25;

/// Shared motion mode of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Diffuse, not yet formed: particles jitter in place.
    #[default]
    Scattered,
    /// Particles ease toward their targets.
    Converging,
}

/// Numeric constants of the update rule, shared by every particle in a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dynamics {
    /// Fraction of the remaining distance covered per 60 Hz frame.
    pub convergence: f64,
    /// Pointer influence radius R.
    pub pointer_radius: f64,
    /// Impulse at zero distance; falls off linearly to 0 at R.
    pub pointer_strength: f64,
    /// Velocity retained per 60 Hz frame, in [0, 1).
    pub friction: f64,
    /// Per-axis jitter magnitude in scattered mode.
    pub jitter: f64,
}

impl Default for Dynamics {
    fn default() -> Self {
        Self {
            convergence: 0.05,
            pointer_radius: 80.0,
            pointer_strength: 3.0,
            friction: 0.0,
            jitter: 1.0,
        }
    }
}

/// A single particle. Pure data; behavior lives in [`Particle::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vector2,
    pub target: Vector2,
    pub velocity: Vector2,
    pub color: Rgba,
    pub radius: f64,
    pub glyph: Option<char>,
}

impl Particle {
    /// A dot at rest on its target.
    pub fn new(target: Vector2, color: Rgba, radius: f64) -> Self {
        Self {
            position: target,
            target,
            velocity: Vector2::ZERO,
            color,
            radius,
            glyph: None,
        }
    }

    pub fn with_glyph(mut self, glyph: Option<char>) -> Self {
        self.glyph = glyph;
        self
    }

    pub fn at(mut self, position: Vector2) -> Self {
        self.position = position;
        self
    }

    /// Distance from the current position to the target.
    pub fn distance_to_target(&self) -> f64 {
        self.position.distance(self.target)
    }

    /// Repulsion impulse the pointer applies to this particle.
    ///
    /// Zero when the pointer is inactive or at least `R` away. Otherwise
    /// `(1 - d / R) * strength`, directed from the pointer to the particle.
    pub fn repulsion(&self, pointer: Pointer, dynamics: &Dynamics) -> Vector2 {
        let radius = dynamics.pointer_radius;
        if !pointer.active || radius <= 0.0 || dynamics.pointer_strength == 0.0 {
            return Vector2::ZERO;
        }
        let d = self.position.distance(pointer.position);
        if !(d < radius) {
            return Vector2::ZERO;
        }
        let magnitude = (1.0 - d / radius) * dynamics.pointer_strength;
        vector::direction(pointer.position, self.position) * magnitude
    }

    /// Advances the particle by `dt` seconds.
    ///
    /// Order: pointer impulse into velocity, mode rule on position,
    /// velocity integration, friction. A step that would leave the position
    /// non-finite is discarded.
    pub fn update(
        &mut self,
        dt: f64,
        pointer: Pointer,
        mode: Mode,
        dynamics: &Dynamics,
        rng: &mut Xorshift64,
    ) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_DT)
        } else {
            0.0
        };
        let frames = dt / FRAME_SECONDS;

        let velocity = self.velocity + self.repulsion(pointer, dynamics);

        let mut position = match mode {
            Mode::Scattered => self.position + rng.jitter(dynamics.jitter),
            Mode::Converging => {
                let k = dynamics.convergence.clamp(0.0, 1.0);
                let eased = 1.0 - (1.0 - k).powf(frames);
                vector::approach(self.position, self.target, eased)
            }
        };
        position += velocity * frames;

        self.position = vector::finite_or(position, self.position);
        self.velocity = vector::finite_or(
            velocity * dynamics.friction.clamp(0.0, 1.0).powf(frames),
            Vector2::ZERO,
        );
    }
}
