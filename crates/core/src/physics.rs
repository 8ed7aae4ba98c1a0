//! Rigid-body physics as an injected capability.
//!
//! Effects that delegate motion to a physics library (falling text) talk to
//! it only through [`PhysicsWorld`]. Coordinates are surface pixels with y
//! pointing down; implementations convert to their own units.

use crate::render::Bounds;
use crate::vector::Vector2;

/// Pose of one body after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Center in surface pixels.
    pub position: Vector2,
    /// Rotation in radians.
    pub rotation: f64,
}

/// Initial description of a dynamic box body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySpec {
    pub center: Vector2,
    pub half_extents: Vector2,
    /// Pixels per second.
    pub velocity: Vector2,
    /// Radians per second.
    pub angular_velocity: f64,
}

/// Surface response shared by every body and wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f64,
    pub friction: f64,
    /// Share of velocity lost per 60 Hz frame.
    pub air_friction: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.8,
            friction: 0.2,
            air_friction: 0.01,
        }
    }
}

/// Everything a world needs at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldSetup<'a> {
    /// The walled-in area.
    pub bounds: Bounds,
    /// Multiple of Earth gravity, pointing down.
    pub gravity: f64,
    /// Wall slab thickness in pixels.
    pub wall_thickness: f64,
    pub material: Material,
    pub bodies: &'a [BodySpec],
}

/// A stepped rigid-body simulation.
pub trait PhysicsWorld {
    /// Creates a world enclosed by four walls around `setup.bounds` with one
    /// dynamic body per entry of `setup.bodies`.
    fn create(setup: &WorldSetup<'_>) -> Self
    where
        Self: Sized;

    /// Advances the simulation by `dt` seconds.
    fn advance(&mut self, dt: f64);

    /// Current pose of every dynamic body, in insertion order.
    fn bodies(&self) -> Vec<BodyState>;

    /// Applies an impulse to the body at `index`, expressed as the velocity
    /// change it causes in pixels per second. Out of range indices are
    /// ignored.
    fn apply_impulse(&mut self, index: usize, impulse: Vector2);
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;

    /// Bodies that fall at constant speed; records specs and impulses.
    #[derive(Debug, Default)]
    pub struct DriftWorld {
        pub specs: Vec<BodySpec>,
        pub states: Vec<BodyState>,
        pub impulses: Vec<(usize, Vector2)>,
        pub elapsed: f64,
    }

    impl PhysicsWorld for DriftWorld {
        fn create(setup: &WorldSetup<'_>) -> Self {
            Self {
                specs: setup.bodies.to_vec(),
                states: setup
                    .bodies
                    .iter()
                    .map(|b| BodyState {
                        position: b.center,
                        rotation: 0.0,
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn advance(&mut self, dt: f64) {
            self.elapsed += dt;
            for s in &mut self.states {
                s.position.y += 100.0 * dt;
            }
        }

        fn bodies(&self) -> Vec<BodyState> {
            self.states.clone()
        }

        fn apply_impulse(&mut self, index: usize, impulse: Vector2) {
            if index < self.states.len() {
                self.impulses.push((index, impulse));
            }
        }
    }
}
