pub mod states;
pub mod params;
pub mod forces;
pub mod integrator;
pub mod emitter;
pub mod octree;
pub mod collision;
pub mod meshes;
pub mod fluids;
pub mod simulator;
pub mod scenario;
