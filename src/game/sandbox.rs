// Sandbox level: a walled floor, a box pyramid and a handful of falling shapes

use glam::DVec2;
use log::info;
use rapier2d::prelude::*;

use crate::engine::camera::Camera;
use crate::engine::scene::{BodySink, Component, Scene, SceneError};
use crate::engine::physics::Simulation;

/// Rows in the box pyramid
const PYRAMID_ROWS: usize = 6;

/// Half extent of each pyramid box
const BOX_HALF: Real = 0.5;

/// Populate an initialized scene with the sandbox bodies and its main camera
pub fn populate<W: Simulation + BodySink>(
    scene: &mut Scene<W>,
    scale: DVec2,
) -> Result<(), SceneError> {
    let components = build_components(scale);
    let count = components.len();
    for component in components {
        scene.attach(component)?;
    }
    info!("Sandbox populated with {} components", count);
    Ok(())
}

fn build_components(scale: DVec2) -> Vec<Component> {
    let mut components = vec![Component::Camera {
        camera: Camera::new(DVec2::ZERO, DVec2::new(0.0, 2.0), scale, 0.0),
        main: true,
    }];

    // Floor and walls
    components.push(fixed(ColliderBuilder::cuboid(12.0, 0.5), 0.0, -8.0));
    components.push(fixed(ColliderBuilder::cuboid(0.5, 8.0), -12.5, 0.0));
    components.push(fixed(ColliderBuilder::cuboid(0.5, 8.0), 12.5, 0.0));

    // Box pyramid
    for row in 0..PYRAMID_ROWS {
        let count = PYRAMID_ROWS - row;
        let y = -7.5 + BOX_HALF + row as Real * BOX_HALF * 2.0;
        let start_x = -(count as Real - 1.0) * BOX_HALF;
        for i in 0..count {
            let x = start_x + i as Real * BOX_HALF * 2.0;
            components.push(dynamic(ColliderBuilder::cuboid(BOX_HALF, BOX_HALF), x, y));
        }
    }

    // Falling shapes
    components.push(dynamic(ColliderBuilder::ball(0.75).restitution(0.6), -6.0, 6.0));
    components.push(dynamic(ColliderBuilder::ball(0.4).restitution(0.8), 5.5, 7.0));
    components.push(dynamic(ColliderBuilder::capsule_y(0.6, 0.3), 7.5, 4.0));
    let triangle = [point![-0.8, -0.5], point![0.8, -0.5], point![0.0, 0.9]];
    if let Some(hull) = ColliderBuilder::convex_hull(&triangle) {
        components.push(dynamic(hull, -8.0, 3.0));
    }

    components
}

fn fixed(collider: ColliderBuilder, x: Real, y: Real) -> Component {
    Component::Body {
        body: RigidBodyBuilder::fixed().translation(vector![x, y]).build(),
        collider: collider.build(),
    }
}

fn dynamic(collider: ColliderBuilder, x: Real, y: Real) -> Component {
    Component::Body {
        body: RigidBodyBuilder::dynamic().translation(vector![x, y]).build(),
        collider: collider.friction(0.7).build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::PhysicsWorld;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_populate_adds_bodies_and_sets_camera() {
        let camera = Rc::new(RefCell::new(Camera::new(
            DVec2::new(800.0, 600.0),
            DVec2::ZERO,
            DVec2::ONE,
            0.0,
        )));
        let mut scene: Scene<PhysicsWorld> = Scene::new(camera.clone());
        scene.init().unwrap();

        populate(&mut scene, DVec2::new(24.0, 24.0)).unwrap();

        let pyramid = PYRAMID_ROWS * (PYRAMID_ROWS + 1) / 2;
        assert_eq!(scene.world().unwrap().body_count(), 3 + pyramid + 4);
        assert_eq!(camera.borrow().scale, DVec2::new(24.0, 24.0));
        assert_eq!(camera.borrow().screen_size(), DVec2::new(800.0, 600.0));
    }

    #[test]
    fn test_sandbox_settles_without_diverging() {
        let camera = Rc::new(RefCell::new(Camera::default()));
        let mut scene: Scene<PhysicsWorld> = Scene::new(camera);
        scene.init().unwrap();
        populate(&mut scene, DVec2::new(32.0, 32.0)).unwrap();

        for _ in 0..90 {
            scene.update(1.0 / 30.0).unwrap();
        }
    }
}
