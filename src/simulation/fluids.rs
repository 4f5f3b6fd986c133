//! Smoothed-particle hydrodynamics fluid
//!
//! A [`Fluid`] owns its particles and computes their pressure and viscosity
//! forces. The smoothing kernels are supplied by the caller through
//! [`SphKernels`]; neighbours are found with an octree radius query rebuilt
//! on every force update.

use rayon::prelude::*;
use tracing::warn;

use crate::simulation::octree::{Octree, OctreeSettings};
use crate::simulation::states::{FluidParticle, NVec3};

/// Speed of sound in the fluid, m/s
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Densities at or below this make a neighbour contribute nothing
const MIN_DENSITY: f64 = 1e-12;

/// Smoothing kernels of an SPH fluid. Distances are passed squared.
pub trait SphKernels: Send + Sync {
    /// Kernel used to estimate density
    fn density(&self, d2: f64) -> f64;

    /// Gradient of the pressure kernel for the vector `r_ij` from particle i to j
    fn pressure(&self, r_ij: &NVec3, d2: f64) -> NVec3;

    /// Laplacian of the viscosity kernel
    fn viscosity(&self, d2: f64) -> f64;
}

/// Neighbour `j` of a particle and their squared distance
type Neighbour = (usize, f64);

pub struct Fluid {
    particles: Vec<FluidParticle>,
    volume: f64,
    rest_density: f64,
    viscosity: f64,
    radius: f64, // neighbourhood (smoothing) radius
    kernels: Box<dyn SphKernels>,
    settings: OctreeSettings,
}

impl Fluid {
    /// `n` particles sharing `density * volume` equally. All particles start
    /// at the origin; place them through [`Fluid::particles_mut`].
    ///
    /// A density or volume that is not positive gives a fluid without
    /// particles, since their mass would be zero.
    pub fn new(
        n: usize,
        volume: f64,
        density: f64,
        viscosity: f64,
        radius: f64,
        kernels: impl SphKernels + 'static,
    ) -> Self {
        let n = if density > 0.0 && volume > 0.0 && (density * volume).is_finite() {
            n
        } else {
            warn!(density, volume, "fluid needs a positive density and volume, no particles created");
            0
        };
        let mass = if n > 0 { density * volume / n as f64 } else { 0.0 };
        let particles = (0..n)
            .map(|i| {
                let mut p = FluidParticle::default();
                p.particle.index = i;
                p.particle.mass = mass;
                p
            })
            .collect();

        Self {
            particles,
            volume,
            rest_density: density,
            viscosity,
            radius,
            kernels: Box::new(kernels),
            settings: OctreeSettings::default(),
        }
    }

    pub fn with_partition_settings(mut self, settings: OctreeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn density(&self) -> f64 {
        self.rest_density
    }

    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn particles(&self) -> &[FluidParticle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [FluidParticle] {
        &mut self.particles
    }

    /// Octree over the current particle positions
    fn partition(&self) -> Octree {
        let positions: Vec<NVec3> = self.particles.iter().map(|p| p.particle.cur_pos).collect();
        Octree::from_points(&positions, self.settings)
    }

    /// Particles within `radius` of particle `i`, excluding `i` itself
    fn neighbours(&self, tree: &Octree, i: usize) -> Vec<Neighbour> {
        let pi = self.particles[i].particle.cur_pos;
        let r2 = self.radius * self.radius;
        tree.radius_query(&pi, self.radius)
            .into_iter()
            .filter(|&j| j != i)
            .map(|j| (j, (self.particles[j].particle.cur_pos - pi).norm_squared()))
            .filter(|&(_, d2)| d2 <= r2)
            .collect()
    }

    /// `(density, pressure)` of particle `i`
    fn density_pressure(&self, i: usize, neighs: &[Neighbour]) -> (f64, f64) {
        let mut rho: f64 = neighs
            .iter()
            .map(|&(j, d2)| self.particles[j].particle.mass * self.kernels.density(d2))
            .sum();
        rho += self.particles[i].particle.mass * self.kernels.density(0.0);
        let pressure = SPEED_OF_SOUND * SPEED_OF_SOUND * (rho - self.rest_density);
        (rho, pressure)
    }

    /// Pressure plus viscosity force on particle `i`
    fn sph_force(&self, i: usize, neighs: &[Neighbour]) -> NVec3 {
        let pi = &self.particles[i];
        if pi.density <= MIN_DENSITY {
            return NVec3::zeros();
        }
        let mut press_acc = NVec3::zeros();
        let mut visc_acc = NVec3::zeros();

        for &(j, d2) in neighs {
            let pj = &self.particles[j];
            if pj.density <= MIN_DENSITY {
                continue;
            }
            let mj = pj.particle.mass;
            let r_ij = pj.particle.cur_pos - pi.particle.cur_pos;

            let pij = -mj * (pi.pressure / (pi.density * pi.density) + pj.pressure / (pj.density * pj.density));
            press_acc += self.kernels.pressure(&r_ij, d2) * pij;

            let vij = mj * self.kernels.viscosity(d2) / (pi.density * pj.density);
            visc_acc += (pj.particle.cur_vel - pi.particle.cur_vel) * vij;
        }

        (press_acc + visc_acc * self.viscosity) * pi.particle.mass
    }

    /// Recompute density, pressure and the SPH force of every particle.
    /// The force replaces whatever `force` held.
    pub fn update_forces(&mut self) {
        if self.particles.is_empty() {
            return;
        }
        let tree = self.partition();
        let neighs: Vec<Vec<Neighbour>> = (0..self.len()).map(|i| self.neighbours(&tree, i)).collect();

        let dp: Vec<(f64, f64)> = (0..self.len()).map(|i| self.density_pressure(i, &neighs[i])).collect();
        for (p, (rho, pressure)) in self.particles.iter_mut().zip(dp) {
            p.density = rho;
            p.pressure = pressure;
        }

        let forces: Vec<NVec3> = (0..self.len()).map(|i| self.sph_force(i, &neighs[i])).collect();
        for (p, f) in self.particles.iter_mut().zip(forces) {
            p.particle.force = f;
        }
    }

    /// Same as [`Fluid::update_forces`] with every per-particle stage run on
    /// the current rayon pool. Each stage reads the previous stage's values
    /// and writes one slot per particle.
    pub fn update_forces_parallel(&mut self) {
        if self.particles.is_empty() {
            return;
        }
        let tree = self.partition();
        let neighs: Vec<Vec<Neighbour>> = (0..self.len())
            .into_par_iter()
            .map(|i| self.neighbours(&tree, i))
            .collect();

        let dp: Vec<(f64, f64)> = (0..self.len())
            .into_par_iter()
            .map(|i| self.density_pressure(i, &neighs[i]))
            .collect();
        self.particles.par_iter_mut().zip(dp).for_each(|(p, (rho, pressure))| {
            p.density = rho;
            p.pressure = pressure;
        });

        let forces: Vec<NVec3> = (0..self.len())
            .into_par_iter()
            .map(|i| self.sph_force(i, &neighs[i]))
            .collect();
        self.particles.par_iter_mut().zip(forces).for_each(|(p, f)| {
            p.particle.force = f;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl SphKernels for Flat {
        fn density(&self, _d2: f64) -> f64 {
            1.0
        }
        fn pressure(&self, r_ij: &NVec3, _d2: f64) -> NVec3 {
            *r_ij
        }
        fn viscosity(&self, _d2: f64) -> f64 {
            0.0
        }
    }

    #[test]
    fn mass_is_shared_equally() {
        let f = Fluid::new(4, 2.0, 1000.0, 0.1, 0.5, Flat);
        assert!(f.particles().iter().all(|p| (p.particle.mass - 500.0).abs() < 1e-9));
        assert_eq!(f.particles()[3].particle.index, 3);
    }

    #[test]
    fn isolated_particle_only_counts_itself() {
        let mut f = Fluid::new(2, 1.0, 1.0, 0.0, 0.5, Flat);
        f.particles_mut()[1].particle.cur_pos = NVec3::new(10.0, 0.0, 0.0);
        f.update_forces();
        let p = &f.particles()[0];
        assert!((p.density - 0.5).abs() < 1e-12, "density {}", p.density);
        assert_eq!(p.particle.force, NVec3::zeros());
    }
}
