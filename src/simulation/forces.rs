//! Force contributors for the particle simulator
//!
//! Defines the [`Field`] trait, the ordered [`FieldSet`] the simulator
//! accumulates per particle, and the concrete fields: uniform gravity,
//! point gravity, a point charge and a uniform magnetic field.

use crate::simulation::states::{NVec3, Particle};

/// Gravitational constant used by [`PointGravity`]
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674e-11;

/// Coulomb constant used by [`Electric`]
pub const COULOMB_CONSTANT: f64 = 8.987_551_792_3e9;

/// Below this distance the point fields contribute nothing
const MIN_DISTANCE: f64 = 1e-9;

/// Trait for force sources acting on a single particle
pub trait Field {
    fn force(&self, p: &Particle) -> NVec3;
}

/// Ordered collection of force fields
/// Contributions are summed in insertion order
pub struct FieldSet {
    terms: Vec<Box<dyn Field + Send + Sync>>,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSet {
    /// Create an empty field set
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Add a field, builder style
    pub fn with(mut self, term: impl Field + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    pub fn push(&mut self, term: Box<dyn Field + Send + Sync>) {
        self.terms.push(term);
    }

    /// Remove the `i`-th field, keeping the order of the rest
    pub fn remove(&mut self, i: usize) -> Option<Box<dyn Field + Send + Sync>> {
        if i < self.terms.len() {
            Some(self.terms.remove(i))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of the contributions of every field on `p`
    pub fn accumulate(&self, p: &Particle) -> NVec3 {
        let mut total = NVec3::zeros();
        for term in &self.terms {
            total += term.force(p);
        }
        total
    }
}

/// Add the field contributions and the viscous drag `-visc_drag * v` to `p.force`
pub fn compute_forces(fields: &FieldSet, visc_drag: f64, p: &mut Particle) {
    let f = fields.accumulate(p);
    p.force += f;
    p.force -= visc_drag * p.cur_vel;
}

/// Uniform gravitational acceleration, `F = m g`
#[derive(Debug, Clone)]
pub struct Gravity {
    pub g: NVec3,
}

impl Field for Gravity {
    fn force(&self, p: &Particle) -> NVec3 {
        p.mass * self.g
    }
}

/// Newtonian attraction toward a fixed point mass
#[derive(Debug, Clone)]
pub struct PointGravity {
    pub pos: NVec3,
    pub mass: f64, // attracting mass, in kg
}

impl Field for PointGravity {
    fn force(&self, p: &Particle) -> NVec3 {
        let r = self.pos - p.cur_pos;
        let d = r.norm();
        if d < MIN_DISTANCE {
            return NVec3::zeros();
        }
        // unit direction toward the attractor
        (p.mass * self.mass * GRAVITATIONAL_CONSTANT) * (r / d)
    }
}

/// Coulomb force exerted by a fixed point charge
#[derive(Debug, Clone)]
pub struct Electric {
    pub pos: NVec3,
    pub charge: f64,
}

impl Field for Electric {
    fn force(&self, p: &Particle) -> NVec3 {
        let r = p.cur_pos - self.pos;
        let d2 = r.norm_squared();
        if d2 < MIN_DISTANCE * MIN_DISTANCE {
            return NVec3::zeros();
        }
        let d = d2.sqrt();
        // like charges repel: force points away from the source
        (COULOMB_CONSTANT * p.charge * self.charge / d2) * (r / d)
    }
}

/// Uniform magnetic field, Lorentz force `F = q (v x B)`
#[derive(Debug, Clone)]
pub struct Magnetic {
    pub b: NVec3,
}

impl Field for Magnetic {
    fn force(&self, p: &Particle) -> NVec3 {
        p.charge * p.cur_vel.cross(&self.b)
    }
}
