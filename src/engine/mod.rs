// Engine modules: camera, scene, main loop, console, physics, renderer, window

pub mod camera;
pub mod config;
pub mod console;
pub mod game_loop;
pub mod physics;
pub mod renderer;
pub mod scene;
pub mod window;
