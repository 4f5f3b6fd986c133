//! Configuration types for loading particle scenes from YAML.
//!
//! A scenario file is a thin, `serde`-deserializable description of a scene:
//!
//! - [`SimulatorConfig`] – time step, solver, drag, collisions, gravity, seed
//! - [`EmittersConfig`]  – how free and sized particles are (re)initialised
//! - [`ParticlesConfig`] – how many particles of each kind, explicit agents
//! - [`GeometryConfig`]  – fixed obstacles, one tagged entry each
//! - [`RunConfig`]       – how many steps the driver runs and on how many threads
//!
//! # YAML format
//!
//! ```yaml
//! simulator:
//!   dt: 0.01
//!   solver: "verlet"          # "euler", "euler_semi" or "verlet"
//!   viscous_drag: 0.0
//!   particle_collisions: true
//!   gravity: [0.0, -9.81, 0.0]
//!   seed: 42
//!
//! emitters:
//!   free:
//!     source: { type: "rect", origin: [-1.0, 5.0, -1.0], u: [1.0, 0.0, 0.0], v: [0.0, 0.0, 1.0], width: 2.0, height: 2.0 }
//!     lifetime: 5.0
//!   sized:
//!     source: { type: "point", at: [0.0, 3.0, 0.0] }
//!     velocity: [1.0, 0.0, 0.0]
//!     radius: 0.2
//!
//! particles:
//!   free: 100
//!   sized: 4
//!   agents:
//!     - pos: [2.0, 0.5, 0.0]
//!       target: [-2.0, 0.5, 0.0]
//!       radius: 0.25
//!       max_speed: 1.0
//!       max_force: 2.0
//!
//! geometry:
//!   - type: "plane"
//!     normal: [0.0, 1.0, 0.0]
//!     point: [0.0, 0.0, 0.0]
//!   - type: "sphere"
//!     center: [0.0, 1.0, 0.0]
//!     radius: 0.5
//!
//! run:
//!   steps: 500
//!   threads: 1
//! ```
//!
//! Missing optional fields take the simulator's defaults. The scenario
//! builder maps this configuration onto a runtime `Simulator`.

use serde::Deserialize;

use crate::simulation::integrator::Solver;

/// Global simulator settings
#[derive(Deserialize, Debug, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_dt")]
    pub dt: f64, // time step, seconds
    #[serde(default = "default_solver")]
    pub solver: Solver, // integration scheme
    #[serde(default = "default_drag")]
    pub viscous_drag: f64, // velocity-proportional drag coefficient
    #[serde(default)]
    pub particle_collisions: bool, // resolve particle-particle collisions
    #[serde(default)]
    pub gravity: Option<[f64; 3]>, // uniform gravity, none if absent
    #[serde(default)]
    pub seed: u64, // seed of the emitters' random sources
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            solver: default_solver(),
            viscous_drag: default_drag(),
            particle_collisions: false,
            gravity: None,
            seed: 0,
        }
    }
}

fn default_dt() -> f64 {
    0.01
}

fn default_solver() -> Solver {
    Solver::EulerSemi
}

fn default_drag() -> f64 {
    0.05
}

/// Where an emitter places its particles
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum SourceConfig {
    #[serde(rename = "point")]
    Point { at: [f64; 3] },

    #[serde(rename = "rect")] // uniform over origin + [0,width] u + [0,height] v
    Rect {
        origin: [f64; 3],
        u: [f64; 3],
        v: [f64; 3],
        width: f64,
        height: f64,
    },

    #[serde(rename = "hose")] // velocity through a disc at `length` along `axis`
    Hose {
        origin: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        length: f64,
    },
}

/// Particle attributes assigned on emission; absent values keep the defaults
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EmitterConfig {
    pub source: Option<SourceConfig>,
    pub velocity: Option<[f64; 3]>,
    pub mass: Option<f64>,
    pub charge: Option<f64>,
    pub bouncing: Option<f64>,
    pub friction: Option<f64>,
    pub lifetime: Option<f64>,
    pub starttime: Option<f64>,
    pub fixed: Option<bool>,
    pub radius: Option<f64>, // sized particles only
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EmittersConfig {
    #[serde(default)]
    pub free: EmitterConfig,
    #[serde(default)]
    pub sized: EmitterConfig,
}

/// Initial state of one agent
#[derive(Deserialize, Debug, Clone)]
pub struct AgentConfig {
    pub pos: [f64; 3],
    #[serde(default)]
    pub vel: [f64; 3],
    pub target: [f64; 3],
    #[serde(default = "default_agent_radius")]
    pub radius: f64,
    #[serde(default = "default_agent_mass")]
    pub mass: f64,
    pub max_speed: f64,
    pub max_force: f64,
}

fn default_agent_radius() -> f64 {
    1.0
}

fn default_agent_mass() -> f64 {
    1.0
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ParticlesConfig {
    #[serde(default)]
    pub free: usize, // emitted by the free emitter
    #[serde(default)]
    pub sized: usize, // emitted by the sized emitter
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// One fixed obstacle
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum GeometryConfig {
    #[serde(rename = "plane")]
    Plane { normal: [f64; 3], point: [f64; 3] },

    #[serde(rename = "sphere")]
    Sphere { center: [f64; 3], radius: f64 },

    #[serde(rename = "triangle")]
    Triangle { vertices: [[f64; 3]; 3] },

    #[serde(rename = "rectangle")] // four coplanar vertices
    Rectangle { vertices: [[f64; 3]; 4] },

    #[serde(rename = "object")] // triangle soup with its own octree
    Object {
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[usize; 3]>,
        #[serde(default)]
        lod: Option<usize>,
    },
}

impl GeometryConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryConfig::Plane { .. } => "plane",
            GeometryConfig::Sphere { .. } => "sphere",
            GeometryConfig::Triangle { .. } => "triangle",
            GeometryConfig::Rectangle { .. } => "rectangle",
            GeometryConfig::Object { .. } => "object",
        }
    }
}

/// How the command-line driver runs the scene
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_threads")]
    pub threads: usize, // workers of the fluid stage, 1 = sequential
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            threads: default_threads(),
        }
    }
}

fn default_steps() -> usize {
    100
}

fn default_threads() -> usize {
    1
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub emitters: EmittersConfig,
    #[serde(default)]
    pub particles: ParticlesConfig,
    #[serde(default)]
    pub geometry: Vec<GeometryConfig>,
    #[serde(default)]
    pub run: RunConfig,
}
