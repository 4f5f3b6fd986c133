//! Core state types for the particle simulation.
//!
//! Defines the particle kinds handled by the simulator:
//! - `Particle`       point mass (free particles, mesh particles)
//! - `SizedParticle`  point mass with a radius
//! - `AgentParticle`  sized particle steered toward a target
//! - `FluidParticle`  point mass carrying SPH density and pressure
//!
//! All kinds expose their shared state through [`PointMass`], so the
//! integrate-then-collide routine is written once for every kind.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f64>;

/// State shared by every particle kind
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub prev_pos: NVec3, // previous position (verlet)
    pub cur_pos: NVec3, // position
    pub cur_vel: NVec3, // velocity
    pub force: NVec3, // accumulated force
    pub mass: f64,
    pub charge: f64,
    pub bouncing: f64, // restitution against geometry
    pub friction: f64, // tangential damping against geometry
    pub lifetime: f64, // seconds left before re-emission
    pub starttime: f64, // seconds left before the particle becomes active
    pub fixed: bool, // never integrated or corrected
    pub index: usize, // position in the owning collection
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            prev_pos: NVec3::zeros(),
            cur_pos: NVec3::zeros(),
            cur_vel: NVec3::zeros(),
            force: NVec3::zeros(),
            mass: 1.0,
            charge: 0.0,
            bouncing: 1.0,
            friction: 0.0,
            lifetime: 10.0,
            starttime: 0.0,
            fixed: false,
            index: 0,
        }
    }
}

impl Particle {
    /// Particle at rest at `pos`
    pub fn at(pos: NVec3) -> Self {
        Self {
            prev_pos: pos,
            cur_pos: pos,
            ..Self::default()
        }
    }

    /// Copy the current position into the previous position
    pub fn save_position(&mut self) {
        self.prev_pos = self.cur_pos;
    }

    pub fn reduce_lifetime(&mut self, dt: f64) {
        self.lifetime -= dt;
    }

    pub fn reduce_starttime(&mut self, dt: f64) {
        self.starttime -= dt;
    }

    /// Make `prev_pos` consistent with the current velocity, so that a
    /// Verlet step reproduces `cur_vel`
    pub fn sync_previous(&mut self, dt: f64) {
        self.prev_pos = self.cur_pos - self.cur_vel * dt;
    }
}

/// Particle with a radius, taking part in particle-particle collisions
#[derive(Debug, Clone, PartialEq)]
pub struct SizedParticle {
    pub particle: Particle,
    pub radius: f64,
}

impl Default for SizedParticle {
    fn default() -> Self {
        Self {
            particle: Particle::default(),
            radius: 1.0,
        }
    }
}

impl SizedParticle {
    pub fn new(pos: NVec3, radius: f64) -> Self {
        Self {
            particle: Particle::at(pos),
            radius,
        }
    }
}

/// Sized particle driven by a seek behaviour instead of force fields
#[derive(Debug, Clone, PartialEq)]
pub struct AgentParticle {
    pub particle: Particle,
    pub radius: f64,
    pub target: NVec3, // point the agent seeks
    pub max_speed: f64,
    pub max_force: f64,
}

impl Default for AgentParticle {
    fn default() -> Self {
        Self {
            particle: Particle::default(),
            radius: 1.0,
            target: NVec3::zeros(),
            max_speed: 1.0,
            max_force: 1.0,
        }
    }
}

impl AgentParticle {
    pub fn new(pos: NVec3, radius: f64, target: NVec3, max_speed: f64, max_force: f64) -> Self {
        Self {
            particle: Particle::at(pos),
            radius,
            target,
            max_speed,
            max_force,
        }
    }
}

/// Particle of an SPH fluid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FluidParticle {
    pub particle: Particle,
    pub density: f64,
    pub pressure: f64,
}

/// Capability shared by all particle kinds: access to the point-mass state
/// and, for kinds that have one, the radius.
pub trait PointMass {
    fn state(&self) -> &Particle;
    fn state_mut(&mut self) -> &mut Particle;

    /// Radius of the particle, `None` for point particles
    fn radius(&self) -> Option<f64> {
        None
    }

    /// Set the radius; ignored by point particles
    fn set_radius(&mut self, _r: f64) {}
}

impl PointMass for Particle {
    fn state(&self) -> &Particle {
        self
    }
    fn state_mut(&mut self) -> &mut Particle {
        self
    }
}

impl PointMass for SizedParticle {
    fn state(&self) -> &Particle {
        &self.particle
    }
    fn state_mut(&mut self) -> &mut Particle {
        &mut self.particle
    }
    fn radius(&self) -> Option<f64> {
        Some(self.radius)
    }
    fn set_radius(&mut self, r: f64) {
        self.radius = r;
    }
}

impl PointMass for AgentParticle {
    fn state(&self) -> &Particle {
        &self.particle
    }
    fn state_mut(&mut self) -> &mut Particle {
        &mut self.particle
    }
    fn radius(&self) -> Option<f64> {
        Some(self.radius)
    }
    fn set_radius(&mut self, r: f64) {
        self.radius = r;
    }
}

impl PointMass for FluidParticle {
    fn state(&self) -> &Particle {
        &self.particle
    }
    fn state_mut(&mut self) -> &mut Particle {
        &mut self.particle
    }
}
