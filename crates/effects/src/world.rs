//! [`PhysicsWorld`] backed by rapier2d.
//!
//! The world works in meters with y pointing down, matching surface pixel
//! coordinates scaled by [`PIXELS_PER_METER`]. Four static walls enclose the
//! surface so bodies can never leave it.

use std::fmt;

use rapier2d::prelude::*;
use tracing::debug;

use particle_fx_core::particle::FRAME_SECONDS;
use particle_fx_core::physics::{BodySpec, BodyState, Material, PhysicsWorld, WorldSetup};
use particle_fx_core::render::Bounds;
use particle_fx_core::vector::Vector2;

pub const PIXELS_PER_METER: f64 = 100.0;

const EARTH_GRAVITY: f64 = 9.81;
const MAX_SUBSTEPS: usize = 8;

fn meters(px: f64) -> Real {
    (px / PIXELS_PER_METER) as Real
}

fn to_rapier(v: Vector2) -> Vector<Real> {
    vector![meters(v.x), meters(v.y)]
}

fn to_pixels(v: &Vector<Real>) -> Vector2 {
    Vector2::new(v.x as f64, v.y as f64) * PIXELS_PER_METER
}

pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    handles: Vec<RigidBodyHandle>,
}

impl RapierWorld {
    /// Walls `bounds` in with `wall_thickness` pixel slabs and adds one
    /// dynamic box per spec. `gravity` scales Earth gravity.
    pub fn new(
        bounds: Bounds,
        gravity: f64,
        wall_thickness: f64,
        material: Material,
        specs: &[BodySpec],
    ) -> Self {
        let mut rigid_body_set = RigidBodySet::new();
        let mut collider_set = ColliderSet::new();
        let restitution = material.restitution as Real;
        let friction = material.friction as Real;

        let (w, h, t) = (bounds.width, bounds.height, wall_thickness);
        let horizontal = Vector2::new(w / 2.0 + t, t / 2.0);
        let vertical = Vector2::new(t / 2.0, h / 2.0 + t);
        let walls = [
            (Vector2::new(w / 2.0, h + t / 2.0), horizontal),
            (Vector2::new(w / 2.0, -t / 2.0), horizontal),
            (Vector2::new(-t / 2.0, h / 2.0), vertical),
            (Vector2::new(w + t / 2.0, h / 2.0), vertical),
        ];
        for (center, half) in walls {
            let wall = ColliderBuilder::cuboid(meters(half.x), meters(half.y))
                .translation(to_rapier(center))
                .restitution(restitution)
                .friction(friction)
                .build();
            collider_set.insert(wall);
        }

        // per-frame velocity loss as a continuous damping rate
        let damping = -(1.0 - material.air_friction).ln() / FRAME_SECONDS;
        let handles = specs
            .iter()
            .map(|spec| {
                let body = RigidBodyBuilder::dynamic()
                    .translation(to_rapier(spec.center))
                    .linvel(to_rapier(spec.velocity))
                    .angvel(spec.angular_velocity as Real)
                    .linear_damping(damping as Real)
                    .ccd_enabled(true)
                    .build();
                let handle = rigid_body_set.insert(body);
                let collider = ColliderBuilder::cuboid(
                    meters(spec.half_extents.x),
                    meters(spec.half_extents.y),
                )
                .restitution(restitution)
                .friction(friction)
                .build();
                collider_set.insert_with_parent(collider, handle, &mut rigid_body_set);
                handle
            })
            .collect();

        debug!(bodies = specs.len(), gravity, "physics world created");
        Self {
            gravity: vector![0.0, (gravity * EARTH_GRAVITY) as Real],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set,
            collider_set,
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            handles,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

impl PhysicsWorld for RapierWorld {
    fn create(setup: &WorldSetup<'_>) -> Self {
        Self::new(
            setup.bounds,
            setup.gravity,
            setup.wall_thickness,
            setup.material,
            setup.bodies,
        )
    }

    /// Steps in slices of at most one 60 Hz frame so long frames stay stable.
    fn advance(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let substeps = ((dt / FRAME_SECONDS).ceil() as usize).clamp(1, MAX_SUBSTEPS);
        self.integration_parameters.dt = (dt / substeps as f64) as Real;
        for _ in 0..substeps {
            self.step();
        }
    }

    fn bodies(&self) -> Vec<BodyState> {
        self.handles
            .iter()
            .filter_map(|handle| self.rigid_body_set.get(*handle))
            .map(|rb| BodyState {
                position: to_pixels(rb.translation()),
                rotation: rb.rotation().angle() as f64,
            })
            .collect()
    }

    fn apply_impulse(&mut self, index: usize, impulse: Vector2) {
        let Some(rb) = self
            .handles
            .get(index)
            .and_then(|handle| self.rigid_body_set.get_mut(*handle))
        else {
            return;
        };
        let mass = rb.mass();
        rb.apply_impulse(to_rapier(impulse) * mass, true);
    }
}

impl fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapierWorld")
            .field("bodies", &self.handles.len())
            .field("gravity", &self.gravity.y)
            .finish()
    }
}
