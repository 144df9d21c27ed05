pub mod math;
pub mod particle;
pub mod bounding;
pub mod object;
pub mod body;
pub mod params;
pub mod engine;
pub mod forces;
pub mod integrator;
pub mod collision;
pub mod world;
pub mod scenario;
