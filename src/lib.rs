pub mod simulation;
pub mod geometry;
pub mod configuration;
pub mod benchmark;

pub use simulation::states::{NVec3, Particle, SizedParticle, AgentParticle, FluidParticle, PointMass};
pub use simulation::params::Parameters;
pub use simulation::forces::{Field, FieldSet, Gravity, PointGravity, Electric, Magnetic, compute_forces};
pub use simulation::integrator::{Solver, integrate};
pub use simulation::emitter::{Emitter, EmitSource};
pub use simulation::octree::{Octree, OctreeSettings};
pub use simulation::meshes::{Mesh, LooseMesh};
pub use simulation::fluids::{Fluid, SphKernels};
pub use simulation::simulator::Simulator;
pub use simulation::scenario::{Scenario, build_simulator};

pub use geometry::{Geometry, Plane, Sphere, Triangle, Rectangle, Object};

pub use configuration::config::{ScenarioConfig, SimulatorConfig, EmittersConfig, EmitterConfig, SourceConfig, ParticlesConfig, AgentConfig, GeometryConfig, RunConfig};
pub use configuration::error::ConfigError;

pub use benchmark::benchmark::{bench_octree, bench_step};
