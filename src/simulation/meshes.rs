//! Interface to deformable meshes
//!
//! A mesh owns a set of particles linked by internal forces. The simulator
//! only needs to reach the particles and to ask the mesh for its internal
//! forces once per step; the force model itself lives with the mesh.

use crate::simulation::states::Particle;

pub trait Mesh: Send {
    fn particles(&self) -> &[Particle];
    fn particles_mut(&mut self) -> &mut [Particle];

    /// Add the mesh's internal forces to `force` of its particles
    fn update_forces(&mut self);

    fn len(&self) -> usize {
        self.particles().len()
    }

    fn is_empty(&self) -> bool {
        self.particles().is_empty()
    }
}

/// Particles that share no internal forces, e.g. a cloud of debris driven
/// only by the simulator's fields
#[derive(Debug, Clone, Default)]
pub struct LooseMesh {
    pub particles: Vec<Particle>,
}

impl LooseMesh {
    pub fn new(particles: Vec<Particle>) -> Self {
        let mut particles = particles;
        for (i, p) in particles.iter_mut().enumerate() {
            p.index = i;
        }
        Self { particles }
    }
}

impl Mesh for LooseMesh {
    fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    fn update_forces(&mut self) {}
}
