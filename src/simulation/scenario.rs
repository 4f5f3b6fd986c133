//! Build a ready-to-run simulator from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing), validates it and produces a
//! [`Scenario`]: a `Simulator` holding the emitters, particles, geometry
//! and gravity of the scene, plus the run settings of the driver.

use tracing::debug;

use crate::configuration::config::{EmitterConfig, GeometryConfig, ScenarioConfig, SourceConfig};
use crate::configuration::error::ConfigError;
use crate::geometry::{Geometry, Object, Plane, Rectangle, Sphere, Triangle};
use crate::simulation::emitter::{EmitSource, Emitter};
use crate::simulation::octree::OctreeSettings;
use crate::simulation::params::Parameters;
use crate::simulation::simulator::Simulator;
use crate::simulation::states::{AgentParticle, NVec3};

/// A scene ready to be stepped
pub struct Scenario {
    pub simulator: Simulator,
    pub steps: usize, // steps the driver runs
    pub threads: usize, // workers of the fluid stage
}

impl Scenario {
    pub fn build_scenario(cfg: &ScenarioConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            simulator: build_simulator(cfg)?,
            steps: cfg.run.steps,
            threads: cfg.run.threads.max(1),
        })
    }
}

fn vec3(a: &[f64; 3]) -> NVec3 {
    NVec3::new(a[0], a[1], a[2])
}

/// Validate `cfg` and build the simulator it describes
pub fn build_simulator(cfg: &ScenarioConfig) -> Result<Simulator, ConfigError> {
    let s_cfg = &cfg.simulator;
    if !(s_cfg.dt >= 0.0) || !s_cfg.dt.is_finite() {
        return Err(ConfigError::InvalidTimeStep { dt: s_cfg.dt });
    }
    if !(s_cfg.viscous_drag >= 0.0) || !s_cfg.viscous_drag.is_finite() {
        return Err(ConfigError::NegativeDrag { drag: s_cfg.viscous_drag });
    }

    let parameters = Parameters {
        dt: s_cfg.dt,
        solver: s_cfg.solver,
        visc_drag: s_cfg.viscous_drag,
        particle_collisions: s_cfg.particle_collisions,
    };
    let mut sim = Simulator::with_parameters(parameters);

    // emitters get distinct streams from the same seed
    let free = build_emitter("free", &cfg.emitters.free, s_cfg.seed)?;
    let sized = build_emitter("sized", &cfg.emitters.sized, s_cfg.seed.wrapping_add(1))?;
    sim.set_free_emitter(free);
    sim.set_sized_emitter(sized);

    for (index, g_cfg) in cfg.geometry.iter().enumerate() {
        let g = build_geometry(index, g_cfg)?;
        if g.is_degenerate() {
            return Err(ConfigError::DegenerateGeometry { index, kind: g_cfg.kind() });
        }
        sim.add_geometry(g);
    }

    if let Some(g) = &s_cfg.gravity {
        sim.add_gravity_acceleration(vec3(g));
    }

    sim.add_free_particles(cfg.particles.free);
    sim.add_sized_particles(cfg.particles.sized);
    for (index, a_cfg) in cfg.particles.agents.iter().enumerate() {
        if !(a_cfg.mass > 0.0) {
            return Err(ConfigError::InvalidAgent { index, reason: format!("mass {} must be positive", a_cfg.mass) });
        }
        if !(a_cfg.radius >= 0.0) || !(a_cfg.max_speed >= 0.0) || !(a_cfg.max_force >= 0.0) {
            return Err(ConfigError::InvalidAgent {
                index,
                reason: "radius, max_speed and max_force must be non-negative".to_string(),
            });
        }
        let mut agent = AgentParticle::new(vec3(&a_cfg.pos), a_cfg.radius, vec3(&a_cfg.target), a_cfg.max_speed, a_cfg.max_force);
        agent.particle.cur_vel = vec3(&a_cfg.vel);
        agent.particle.mass = a_cfg.mass;
        sim.add_agent_particle(agent);
    }

    debug!(
        free = sim.free_particles().len(),
        sized = sim.sized_particles().len(),
        agents = sim.agent_particles().len(),
        geometry = sim.geometry().len(),
        "built simulator"
    );
    Ok(sim)
}

fn build_emitter(which: &'static str, cfg: &EmitterConfig, seed: u64) -> Result<Emitter, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEmitter { which, reason };

    let source = match &cfg.source {
        None => EmitSource::Point(NVec3::zeros()),
        Some(SourceConfig::Point { at }) => EmitSource::Point(vec3(at)),
        Some(SourceConfig::Rect { origin, u, v, width, height }) => EmitSource::Rect {
            origin: vec3(origin),
            u: vec3(u),
            v: vec3(v),
            width: *width,
            height: *height,
        },
        Some(SourceConfig::Hose { origin, axis, radius, length }) => {
            let axis = vec3(axis)
                .try_normalize(1e-12)
                .ok_or_else(|| invalid("hose axis must be non-zero".to_string()))?;
            EmitSource::Hose { origin: vec3(origin), axis, radius: *radius, length: *length }
        }
    };

    let mut e = Emitter::new(source).with_seed(seed);
    if let Some(v) = &cfg.velocity {
        e.velocity = vec3(v);
    }
    if let Some(m) = cfg.mass {
        if !(m > 0.0) {
            return Err(invalid(format!("mass {} must be positive", m)));
        }
        e.mass = m;
    }
    if let Some(r) = cfg.radius {
        if !(r >= 0.0) {
            return Err(invalid(format!("radius {} must be non-negative", r)));
        }
        e.radius = r;
    }
    e.charge = cfg.charge.unwrap_or(e.charge);
    e.bouncing = cfg.bouncing.unwrap_or(e.bouncing);
    e.friction = cfg.friction.unwrap_or(e.friction);
    e.lifetime = cfg.lifetime.unwrap_or(e.lifetime);
    e.starttime = cfg.starttime.unwrap_or(e.starttime);
    e.fixed = cfg.fixed.unwrap_or(e.fixed);
    Ok(e)
}

fn build_geometry(index: usize, cfg: &GeometryConfig) -> Result<Geometry, ConfigError> {
    let g: Geometry = match cfg {
        GeometryConfig::Plane { normal, point } => Plane::new(vec3(normal), vec3(point)).into(),
        GeometryConfig::Sphere { center, radius } => Sphere::new(vec3(center), *radius).into(),
        GeometryConfig::Triangle { vertices: [a, b, c] } => Triangle::new(vec3(a), vec3(b), vec3(c)).into(),
        GeometryConfig::Rectangle { vertices: [a, b, c, d] } => {
            Rectangle::new(vec3(a), vec3(b), vec3(c), vec3(d)).into()
        }
        GeometryConfig::Object { vertices, triangles, lod } => {
            let count = vertices.len();
            if let Some(&vertex) = triangles.iter().flatten().find(|&&v| v >= count) {
                return Err(ConfigError::InvalidObject { index, vertex, count });
            }
            let vertices: Vec<NVec3> = vertices.iter().map(vec3).collect();
            let mut settings = OctreeSettings::default();
            if let Some(lod) = lod {
                settings.lod = (*lod).max(1);
            }
            Object::new(&vertices, triangles, settings)
                .ok_or(ConfigError::InvalidObject { index, vertex: count, count })?
                .into()
        }
    };
    Ok(g)
}
