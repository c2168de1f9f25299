use log::info;
use rapier2d::prelude::*;

use super::{PhysicsError, Simulation};

/// Default gravity in world units per second squared
const DEFAULT_GRAVITY: Real = -9.81;

/// Physics world that manages all physics simulation
pub struct PhysicsWorld {
    /// Gravity vector (default: -9.81 m/s² in y-axis)
    gravity: Vector<Real>,

    /// Integration parameters; `dt` is overwritten on every step
    integration_parameters: IntegrationParameters,

    /// Physics pipeline handles collision detection and solving
    physics_pipeline: PhysicsPipeline,

    /// Island manager for sleeping bodies
    island_manager: IslandManager,

    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,

    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver for fast-moving objects
    ccd_solver: CCDSolver,

    /// Query pipeline for raycasts and shape casts
    query_pipeline: QueryPipeline,

    /// Rigid body set
    rigid_body_set: RigidBodySet,

    /// Collider set
    collider_set: ColliderSet,
}

impl PhysicsWorld {
    /// Create a new physics world with default settings
    pub fn new() -> Self {
        Self::with_gravity(vector![0.0, DEFAULT_GRAVITY])
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
        }
    }

    /// Add a rigid body with one attached collider
    pub fn add_body(&mut self, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Number of rigid bodies in the world
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Iterate over all colliders together with their parent body, if any
    pub fn colliders(&self) -> impl Iterator<Item = (&Collider, Option<&RigidBody>)> {
        self.collider_set.iter().map(move |(_, collider)| {
            let parent = collider
                .parent()
                .and_then(|handle| self.rigid_body_set.get(handle));
            (collider, parent)
        })
    }

    fn check_finite(&self) -> Result<(), PhysicsError> {
        for (handle, body) in self.rigid_body_set.iter() {
            let translation = body.translation();
            if !translation.x.is_finite()
                || !translation.y.is_finite()
                || !body.rotation().angle().is_finite()
            {
                let (index, _) = handle.into_raw_parts();
                return Err(PhysicsError::Diverged { body: index });
            }
        }
        Ok(())
    }
}

impl Simulation for PhysicsWorld {
    fn init(&mut self) {
        info!(
            "Physics world initialized with gravity ({}, {})",
            self.gravity.x, self.gravity.y
        );
    }

    fn step(&mut self, dt: f64) -> Result<(), PhysicsError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        self.integration_parameters.dt = dt as Real;

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

        self.check_finite()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
