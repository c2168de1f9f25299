// Game content built on top of the engine

pub mod sandbox;
