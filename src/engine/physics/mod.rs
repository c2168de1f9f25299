// Physics system using rapier2d

mod world;

pub use world::PhysicsWorld;

// Re-export commonly used rapier types for convenience
pub use rapier2d::prelude::{Collider, RigidBody};

/// Physics stepping errors
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("Invalid physics timestep: {0}")]
    InvalidTimestep(f64),

    #[error("Rigid body {body} diverged to a non-finite state")]
    Diverged { body: u32 },
}

/// A world that can be advanced in fixed increments of simulated time
pub trait Simulation {
    /// Prepare the world for stepping
    fn init(&mut self);

    /// Advance the world by exactly `dt` seconds
    fn step(&mut self, dt: f64) -> Result<(), PhysicsError>;
}
