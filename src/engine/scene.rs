// Scene aggregate: one physics world plus the active camera

use log::{debug, info};
use std::fmt;

use crate::engine::camera::{Camera, SharedCamera};
use crate::engine::physics::{Collider, PhysicsError, PhysicsWorld, RigidBody, Simulation};

/// Scene lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("Scene updated before init")]
    NotInitialized,

    #[error("Scene initialized twice")]
    AlreadyInitialized,

    #[error("Physics step failed: {0}")]
    Physics(#[from] PhysicsError),
}

/// Worlds that accept new rigid bodies
pub trait BodySink {
    fn add_body(&mut self, body: RigidBody, collider: Collider);
}

impl BodySink for PhysicsWorld {
    fn add_body(&mut self, body: RigidBody, collider: Collider) {
        PhysicsWorld::add_body(self, body, collider);
    }
}

/// Typed scene components, dispatched when attached
pub enum Component {
    /// A camera; the main camera replaces the scene's active camera
    Camera { camera: Camera, main: bool },
    /// A rigid body with one collider
    Body { body: RigidBody, collider: Collider },
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Camera { camera, main } => f
                .debug_struct("Camera")
                .field("camera", camera)
                .field("main", main)
                .finish(),
            Component::Body { body, collider } => f
                .debug_struct("Body")
                .field("body_type", &body.body_type())
                .field("translation", body.translation())
                .field("shape", &collider.shape().shape_type())
                .finish(),
        }
    }
}

/// A level: exclusively owns its physics world and references the active camera
pub struct Scene<W = PhysicsWorld> {
    world: Option<W>,
    camera: SharedCamera,
}

impl<W> Scene<W> {
    /// Create an uninitialized scene viewed through `camera`
    pub fn new(camera: SharedCamera) -> Self {
        Self {
            world: None,
            camera,
        }
    }

    /// The active camera
    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    /// The physics world, once initialized
    pub fn world(&self) -> Option<&W> {
        self.world.as_ref()
    }

    /// Mutable access to the physics world, once initialized
    #[allow(dead_code)]
    pub fn world_mut(&mut self) -> Option<&mut W> {
        self.world.as_mut()
    }
}

impl<W: Simulation + Default> Scene<W> {
    /// Construct and initialize the physics world.
    ///
    /// Must be called exactly once, before any `update`.
    pub fn init(&mut self) -> Result<(), SceneError> {
        if self.world.is_some() {
            return Err(SceneError::AlreadyInitialized);
        }
        let mut world = W::default();
        world.init();
        self.world = Some(world);
        info!("Scene initialized");
        Ok(())
    }
}

impl<W: Simulation> Scene<W> {
    /// Advance the physics world by exactly `dt` seconds
    pub fn update(&mut self, dt: f64) -> Result<(), SceneError> {
        let world = self.world.as_mut().ok_or(SceneError::NotInitialized)?;
        world.step(dt)?;
        Ok(())
    }
}

impl<W: Simulation + BodySink> Scene<W> {
    /// Register a component with the scene
    pub fn attach(&mut self, component: Component) -> Result<(), SceneError> {
        debug!("Attaching {:?}", component);
        match component {
            Component::Camera { camera, main } => {
                if main {
                    let mut active = self.camera.borrow_mut();
                    let screen_size = active.screen_size();
                    *active = camera;
                    active.resize(screen_size.x, screen_size.y);
                    info!("Main camera set at {:?}", active.position);
                } else {
                    debug!("Ignoring secondary camera at {:?}", camera.position);
                }
            }
            Component::Body { body, collider } => {
                let world = self.world.as_mut().ok_or(SceneError::NotInitialized)?;
                world.add_body(body, collider);
            }
        }
        Ok(())
    }
}
