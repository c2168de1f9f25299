use anyhow::Result;
use log::{info, warn};
use std::cell::RefCell;
use std::rc::Rc;

mod common;
mod engine;
mod game;

use engine::config::EngineConfig;
use engine::console::Console;
use engine::game_loop::GameLoop;
use engine::physics::PhysicsWorld;
use engine::scene::Scene;
use engine::window::GameWindow;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Starting steadyframe...");

    let config = EngineConfig::from_env()?;

    // Create window and GPU context before anything depends on the screen size
    let mut window = GameWindow::new(&config)?;

    let camera = Rc::new(RefCell::new(config.initial_camera()));
    let size = window.size();
    camera.borrow_mut().resize(size.x, size.y);

    let mut scene: Scene<PhysicsWorld> = Scene::new(camera.clone());
    scene.init()?;
    game::sandbox::populate(&mut scene, config.camera_scale)?;
    if let Some(world) = scene.world() {
        info!("Scene holds {} rigid bodies", world.body_count());
    }

    let mut console = match Console::spawn_stdin() {
        Ok(console) => Some(console),
        Err(err) => {
            warn!("Console unavailable: {}", err);
            None
        }
    };

    let mut game_loop = GameLoop::new(&config);
    game_loop.run(&mut scene, console.as_mut(), &mut window)?;

    info!("Shutdown complete");
    Ok(())
}
