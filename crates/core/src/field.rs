//! A managed collection of particles sampled from a visual source.
//!
//! A [`Field`] is built in one batch from a [`Source`]: every kept sample
//! becomes a particle whose target is the sample position and whose color
//! comes from the configured [`Coloring`](crate::palette::Coloring) rule.
//! The field owns a seeded PRNG, so building and ticking with the same
//! inputs always produces the same particle positions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Rgba;
use crate::config::FieldConfig;
use crate::error::EngineError;
use crate::particle::{Dynamics, Mode, Particle};
use crate::pointer::Pointer;
use crate::prng::Xorshift64;
use crate::render::{Bounds, RenderError, RenderTarget, TextStyle};
use crate::source::{Sample, Sampling, Source};
use crate::vector::Vector2;

/// Where particles start before they converge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scatter {
    /// On their targets.
    None,
    /// Uniformly over the surface.
    #[default]
    Canvas,
    /// Near a randomly chosen target, offset by up to `spread / 2` per axis.
    Targets { spread: f64 },
}

impl Scatter {
    pub fn validate(&self) -> Result<(), EngineError> {
        match *self {
            Scatter::Targets { spread } if !(spread.is_finite() && spread >= 0.0) => {
                Err(EngineError::InvalidConfig(format!(
                    "scatter spread must be finite and >= 0, got {spread}"
                )))
            }
            _ => Ok(()),
        }
    }

    fn place(
        &self,
        target: Vector2,
        samples: &[Sample],
        bounds: Bounds,
        rng: &mut Xorshift64,
    ) -> Vector2 {
        match *self {
            Scatter::None => target,
            Scatter::Canvas => rng.point_in(bounds.width, bounds.height),
            Scatter::Targets { spread } => {
                let anchor = samples[rng.next_usize(samples.len())].position;
                anchor + rng.jitter(spread / 2.0)
            }
        }
    }
}

/// Per-field drawing options.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Style {
    glow: bool,
    glyph_size: f64,
}

/// Particles plus the shared state that drives them.
#[derive(Debug, Clone)]
pub struct Field {
    particles: Vec<Particle>,
    mode: Mode,
    bounds: Bounds,
    dynamics: Dynamics,
    style: Style,
    rng: Xorshift64,
}

impl Field {
    /// Samples `source` on a surface of `bounds` and creates one particle
    /// per kept sample.
    ///
    /// Text sources are rasterized through `target`, which is left cleared.
    /// Configuration problems are reported before any sampling happens.
    pub fn build(
        source: &Source,
        config: &FieldConfig,
        bounds: Bounds,
        target: &mut dyn RenderTarget,
        seed: u64,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = Xorshift64::new(seed);
        let sampling = Sampling {
            density: config.density,
            alpha_threshold: config.alpha_threshold,
            glyph_ratio: config.glyph_ratio,
        };
        let samples = source.samples(bounds, &sampling, target, &mut rng)?;
        let field = Self::assemble(&samples, config, bounds, rng);
        debug!(
            source = source.kind(),
            particles = field.len(),
            width = bounds.width,
            height = bounds.height,
            "field built"
        );
        Ok(field)
    }

    /// Builds a field from precomputed samples.
    pub fn from_samples(
        samples: &[Sample],
        config: &FieldConfig,
        bounds: Bounds,
        seed: u64,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::assemble(samples, config, bounds, Xorshift64::new(seed)))
    }

    fn assemble(
        samples: &[Sample],
        config: &FieldConfig,
        bounds: Bounds,
        mut rng: Xorshift64,
    ) -> Self {
        let particles = samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let color = config.coloring.resolve(
                    &config.palette,
                    i,
                    sample.color,
                    sample.glyph.is_some(),
                    &mut rng,
                );
                let radius = config.radius.pick(&mut rng);
                let start = config.scatter.place(sample.position, samples, bounds, &mut rng);
                Particle::new(sample.position, color, radius)
                    .with_glyph(sample.glyph)
                    .at(start)
            })
            .collect();
        Self {
            particles,
            mode: config.mode,
            bounds,
            dynamics: config.dynamics(),
            style: Style {
                glow: config.glow,
                glyph_size: config.glyph_size,
            },
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Sets the shared mode. Particles pick it up on the next tick.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "field mode changed");
            self.mode = mode;
        }
    }

    /// Updates every particle in sequence order.
    pub fn tick(&mut self, dt: f64, pointer: Pointer) {
        for particle in &mut self.particles {
            particle.update(dt, pointer, self.mode, &self.dynamics, &mut self.rng);
        }
    }

    /// Whether every particle is within `epsilon` of its target.
    pub fn converged(&self, epsilon: f64) -> bool {
        self.particles
            .iter()
            .all(|p| p.distance_to_target() < epsilon)
    }

    /// Mean distance between particles and their targets (0 when empty).
    pub fn mean_distance(&self) -> f64 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let total: f64 = self.particles.iter().map(Particle::distance_to_target).sum();
        total / self.particles.len() as f64
    }

    /// Color a particle is drawn with this frame, or `None` to skip it.
    fn shade(&self, particle: &Particle, pointer: Pointer) -> Option<Rgba> {
        let color = if self.style.glow {
            let radius = self.dynamics.pointer_radius;
            if !pointer.active || radius <= 0.0 {
                return None;
            }
            let d = particle.position.distance(pointer.position);
            if d >= radius {
                return None;
            }
            particle.color.fade(1.0 - d / radius)
        } else {
            particle.color
        };
        (color.a > 0).then_some(color)
    }

    /// Draws every visible particle: glyph particles as text, the rest as
    /// filled circles. Does not clear the surface first.
    pub fn render(
        &self,
        target: &mut dyn RenderTarget,
        pointer: Pointer,
    ) -> Result<(), RenderError> {
        let mut buf = [0u8; 4];
        for particle in &self.particles {
            let Some(color) = self.shade(particle, pointer) else {
                continue;
            };
            match particle.glyph {
                Some(glyph) => {
                    let style = TextStyle::new(self.style.glyph_size, color);
                    target.draw_text(glyph.encode_utf8(&mut buf), particle.position, style)?;
                }
                None => target.draw_circle(particle.position, particle.radius, color)?,
            }
        }
        Ok(())
    }
}
